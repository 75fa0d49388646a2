//! Runtime error types

use loom_types::{CommandKind, ComponentUri, Scope};
use thiserror::Error;

/// Scope container errors
#[derive(Debug, Error)]
pub enum ScopeError {
    /// The component exists but its instance is not active. For domain-scoped
    /// components this is raised immediately when the container has not been
    /// activated by leader election; callers never block or see a stale
    /// instance.
    #[error("Component instance not active: {0}")]
    NotActive(ComponentUri),

    #[error("Component not registered: {0}")]
    UnknownComponent(ComponentUri),

    #[error("No container registered for scope {0:?}")]
    NoContainer(Scope),

    #[error("Component {uri} failed: {reason}")]
    Component { uri: ComponentUri, reason: String },
}

/// Command execution errors
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("No executor registered for command kind {0}")]
    NoExecutor(CommandKind),

    #[error("Executor received unexpected command kind {0}")]
    UnexpectedCommand(CommandKind),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error("Component build failed: {0}")]
    Build(String),

    #[error("Wire operation failed: {0}")]
    Wire(String),

    #[error("Contribution processing failed: {0}")]
    Contribution(String),
}
