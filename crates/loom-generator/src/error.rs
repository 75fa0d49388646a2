//! Generation error types

use loom_types::{ComponentUri, ContributionUri};
use thiserror::Error;

/// Generation errors. Any of these fails the whole pass; partial command
/// lists are discarded, never applied.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Unresolved contribution: {0}")]
    UnresolvedContribution(ContributionUri),

    #[error("New component {child} cannot be owned by marked composite {parent}")]
    InvalidStateCombination {
        parent: ComponentUri,
        child: ComponentUri,
    },
}

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, GenerationError>;
