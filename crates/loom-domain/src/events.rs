//! Domain lifecycle events
//!
//! A unified broadcast stream of deployment activity for observers such as
//! consoles and operational tooling.

use loom_types::{ComponentUri, DeployableId, DeploymentId, ZoneId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEventEnvelope {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// The actual event
    pub event: DomainEvent,
}

impl DomainEventEnvelope {
    pub fn new(event: DomainEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            event,
        }
    }
}

/// Domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A composite was admitted into the logical model
    Included { component: ComponentUri },

    /// A change set was applied to every affected zone
    DeploymentCompleted {
        deployment: DeploymentId,
        zones: Vec<ZoneId>,
    },

    /// A change set failed and every applied command was compensated
    DeploymentRolledBack {
        deployment: DeploymentId,
        zone: ZoneId,
    },

    /// A change set failed and compensation was incomplete
    DeploymentDegraded {
        deployment: DeploymentId,
        zone: ZoneId,
    },

    /// A deployable was stopped, disposed, and pruned from the model
    Undeployed { deployable: DeployableId },
}
