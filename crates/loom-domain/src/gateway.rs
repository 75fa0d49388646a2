//! Zone gateways
//!
//! A gateway ships a deployment unit into one zone and replays it there.
//! The local gateway applies through this runtime's executor registry;
//! remote transports implement the same trait.

use async_trait::async_trait;
use loom_runtime::{
    ApplyError, CommandExecutorRegistry, CompensationFailure, DeploymentApplier,
};
use loom_types::{Command, ZoneId};
use std::sync::Arc;

/// Applies deployment units inside one zone
#[async_trait]
pub trait ZoneGateway: Send + Sync {
    /// Replay a unit's commands in order, rolling back on failure
    async fn apply(&self, zone: &ZoneId, commands: &[Command]) -> Result<(), ApplyError>;

    /// Compensate an already-applied unit in reverse order, returning any
    /// compensation failures. Used when a peer zone fails after this zone
    /// applied successfully.
    async fn roll_back(&self, zone: &ZoneId, applied: &[Command]) -> Vec<CompensationFailure>;
}

/// Gateway for the zone hosted by this runtime
pub struct LocalZoneGateway {
    applier: DeploymentApplier,
}

impl LocalZoneGateway {
    pub fn new(registry: Arc<CommandExecutorRegistry>) -> Self {
        Self {
            applier: DeploymentApplier::new(registry),
        }
    }
}

#[async_trait]
impl ZoneGateway for LocalZoneGateway {
    async fn apply(&self, zone: &ZoneId, commands: &[Command]) -> Result<(), ApplyError> {
        self.applier.apply(zone, commands).await
    }

    async fn roll_back(&self, _zone: &ZoneId, applied: &[Command]) -> Vec<CompensationFailure> {
        self.applier.compensate(applied).await
    }
}
