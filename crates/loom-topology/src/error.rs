//! Topology error types

use thiserror::Error;

/// Topology errors
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    #[error("Membership service unavailable: {0}")]
    Unavailable(String),
}
