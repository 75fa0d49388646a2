//! Command executor registry
//!
//! Maps each command kind to exactly one registered executor. Registration
//! happens once per executor at startup; the dispatch path is read-mostly
//! and lock-free.

use crate::error::ExecutionError;
use async_trait::async_trait;
use dashmap::DashMap;
use loom_types::{Command, CommandKind};
use std::sync::Arc;
use tracing::debug;

/// Executes commands of one kind.
///
/// This is the extension point artifact-specific deployment logic (bindings,
/// resources, wires) implements and registers. Execution may block on I/O;
/// callers must not hold locks across it.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &Command) -> Result<(), ExecutionError>;
}

/// Registry dispatching commands to the executor for their kind
#[derive(Default)]
pub struct CommandExecutorRegistry {
    executors: DashMap<CommandKind, Arc<dyn CommandExecutor>>,
}

impl CommandExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the executor for a command kind. Re-registering a kind
    /// overwrites the previous mapping.
    pub fn register(&self, kind: CommandKind, executor: Arc<dyn CommandExecutor>) {
        debug!(kind = %kind, "Registering command executor");
        self.executors.insert(kind, executor);
    }

    /// Dispatch a command to its registered executor, synchronously from the
    /// caller's point of view.
    pub async fn execute(&self, command: &Command) -> Result<(), ExecutionError> {
        let kind = command.kind();
        let executor = self
            .executors
            .get(&kind)
            .map(|entry| entry.value().clone())
            .ok_or(ExecutionError::NoExecutor(kind))?;
        executor.execute(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_types::{ContributionUri, ZoneId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExecutor {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CommandExecutor for CountingExecutor {
        async fn execute(&self, _command: &Command) -> Result<(), ExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn provision() -> Command {
        Command::ProvisionContribution {
            zone: ZoneId::new("zone1"),
            uri: ContributionUri::new("contribution://app"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_by_kind() {
        let registry = CommandExecutorRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.register(
            CommandKind::ProvisionContribution,
            Arc::new(CountingExecutor {
                calls: calls.clone(),
            }),
        );

        registry.execute(&provision()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_executor_is_an_error() {
        let registry = CommandExecutorRegistry::new();
        assert!(matches!(
            registry.execute(&provision()).await,
            Err(ExecutionError::NoExecutor(CommandKind::ProvisionContribution))
        ));
    }

    #[tokio::test]
    async fn test_reregistration_overwrites() {
        let registry = CommandExecutorRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        registry.register(
            CommandKind::ProvisionContribution,
            Arc::new(CountingExecutor {
                calls: first.clone(),
            }),
        );
        registry.register(
            CommandKind::ProvisionContribution,
            Arc::new(CountingExecutor {
                calls: second.clone(),
            }),
        );

        registry.execute(&provision()).await.unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
