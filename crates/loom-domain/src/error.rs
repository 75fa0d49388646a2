//! Domain error types

use loom_generator::GenerationError;
use loom_runtime::ApplyError;
use loom_types::{ComponentUri, DeployableId, StateError, ZoneId};
use thiserror::Error;

/// Domain errors. A failed deploy or undeploy always states whether the
/// system was restored to its original state or left degraded.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("No gateway registered for {0}")]
    UnroutableZone(ZoneId),

    #[error("Unknown deployable: {0}")]
    UnknownDeployable(DeployableId),

    #[error("Component is already deployed: {0}")]
    AlreadyDeployed(ComponentUri),

    #[error("Component URI already present in the domain: {0}")]
    DuplicateUri(ComponentUri),

    #[error("Deployment failed in {zone}; every applied change was rolled back")]
    RolledBack {
        zone: ZoneId,
        #[source]
        source: ApplyError,
    },

    #[error("Deployment failed in {zone}; rollback incomplete, runtime degraded")]
    Degraded {
        zone: ZoneId,
        #[source]
        source: ApplyError,
    },
}

impl DomainError {
    /// Whether the cluster was restored to its pre-operation state
    pub fn original_state_restored(&self) -> bool {
        !matches!(self, DomainError::Degraded { .. })
    }
}
