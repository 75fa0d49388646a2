//! Ordered command application with compensation
//!
//! Commands within one deployment unit execute sequentially on one task to
//! preserve generation ordering. Different zones may apply their units
//! concurrently; there is no ordering between zones.

use crate::error::ExecutionError;
use crate::executor::CommandExecutorRegistry;
use loom_types::{Command, CommandKind, ZoneId};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, instrument, warn};

/// One compensating command that failed during rollback
#[derive(Debug)]
pub struct CompensationFailure {
    /// Index of the original command whose compensation failed
    pub index: usize,
    /// Kind of the compensating command that failed
    pub kind: CommandKind,
    pub error: ExecutionError,
}

/// Outcome of a failed apply. The two variants make the end state of the
/// zone explicit: either every applied command was compensated and the zone
/// is back in its original state, or compensation itself failed and the zone
/// is degraded.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Command {index} ({kind}) failed in {zone}; applied commands were rolled back")]
    RolledBack {
        zone: ZoneId,
        index: usize,
        kind: CommandKind,
        #[source]
        source: ExecutionError,
    },

    #[error(
        "Command {index} ({kind}) failed in {zone}; {} compensation(s) also failed, zone degraded",
        .compensation_failures.len()
    )]
    Degraded {
        zone: ZoneId,
        index: usize,
        kind: CommandKind,
        #[source]
        source: ExecutionError,
        compensation_failures: Vec<CompensationFailure>,
    },
}

impl ApplyError {
    /// Whether the zone was restored to its original observable state
    pub fn original_state_restored(&self) -> bool {
        matches!(self, ApplyError::RolledBack { .. })
    }
}

/// Applies a deployment unit's commands in order, compensating on failure
pub struct DeploymentApplier {
    registry: Arc<CommandExecutorRegistry>,
}

impl DeploymentApplier {
    pub fn new(registry: Arc<CommandExecutorRegistry>) -> Self {
        Self { registry }
    }

    /// Execute `commands` in list order. If command `k` fails, the
    /// compensating commands for commands `k-1..0` run in reverse order and
    /// the original failure is surfaced; compensation failures are reported
    /// alongside it, never swallowed.
    #[instrument(skip(self, commands), fields(zone = %zone, count = commands.len()))]
    pub async fn apply(&self, zone: &ZoneId, commands: &[Command]) -> Result<(), ApplyError> {
        for (index, command) in commands.iter().enumerate() {
            if let Err(source) = self.registry.execute(command).await {
                warn!(
                    zone = %zone,
                    index,
                    kind = %command.kind(),
                    error = %source,
                    "Command failed, compensating applied prefix"
                );
                let compensation_failures = self.compensate(&commands[..index]).await;
                return if compensation_failures.is_empty() {
                    Err(ApplyError::RolledBack {
                        zone: zone.clone(),
                        index,
                        kind: command.kind(),
                        source,
                    })
                } else {
                    Err(ApplyError::Degraded {
                        zone: zone.clone(),
                        index,
                        kind: command.kind(),
                        source,
                        compensation_failures,
                    })
                };
            }
        }
        Ok(())
    }

    /// Run the compensating command of every command in `applied`, in
    /// reverse order. A failed compensation is recorded and the remaining
    /// compensations still run, restoring as much state as possible.
    pub async fn compensate(&self, applied: &[Command]) -> Vec<CompensationFailure> {
        let mut failures = Vec::new();
        for (index, command) in applied.iter().enumerate().rev() {
            let compensating = command.compensating();
            if let Err(err) = self.registry.execute(&compensating).await {
                error!(
                    index,
                    kind = %compensating.kind(),
                    error = %err,
                    "Compensating command failed"
                );
                failures.push(CompensationFailure {
                    index,
                    kind: compensating.kind(),
                    error: err,
                });
            }
        }
        failures
    }
}
