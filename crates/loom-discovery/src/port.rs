//! Port allocation for transport endpoints
//!
//! Transports obtain ports here and carry them as opaque values inside
//! [`loom_types::SocketAddress`]. The default allocator hands out ports from
//! a single configured range, tracked per protocol.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Port allocation errors
#[derive(Debug, Error)]
pub enum PortError {
    #[error("Port range exhausted for protocol {0}")]
    Exhausted(String),

    #[error("Port {port} is not available for protocol {protocol}")]
    Unavailable { protocol: String, port: u16 },

    #[error("Port {port} is outside the configured range {start}..={end}")]
    OutOfRange { port: u16, start: u16, end: u16 },
}

/// Inclusive port range configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            start: 10_000,
            end: 10_499,
        }
    }
}

/// Allocates, reserves, and releases transport ports
pub trait PortAllocator: Send + Sync {
    /// Allocate the next free port for a protocol
    fn allocate(&self, protocol: &str) -> Result<u16, PortError>;

    /// Reserve a specific port for a protocol
    fn reserve(&self, protocol: &str, port: u16) -> Result<(), PortError>;

    /// Release a previously allocated or reserved port
    fn release(&self, protocol: &str, port: u16);
}

/// Default allocator handing out ports from one configured range
pub struct RangePortAllocator {
    range: PortRange,
    allocated: DashMap<String, BTreeSet<u16>>,
}

impl RangePortAllocator {
    pub fn new(range: PortRange) -> Self {
        Self {
            range,
            allocated: DashMap::new(),
        }
    }
}

impl Default for RangePortAllocator {
    fn default() -> Self {
        Self::new(PortRange::default())
    }
}

impl PortAllocator for RangePortAllocator {
    fn allocate(&self, protocol: &str) -> Result<u16, PortError> {
        let mut taken = self.allocated.entry(protocol.to_string()).or_default();
        for port in self.range.start..=self.range.end {
            if taken.insert(port) {
                return Ok(port);
            }
        }
        Err(PortError::Exhausted(protocol.to_string()))
    }

    fn reserve(&self, protocol: &str, port: u16) -> Result<(), PortError> {
        if port < self.range.start || port > self.range.end {
            return Err(PortError::OutOfRange {
                port,
                start: self.range.start,
                end: self.range.end,
            });
        }
        let mut taken = self.allocated.entry(protocol.to_string()).or_default();
        if !taken.insert(port) {
            return Err(PortError::Unavailable {
                protocol: protocol.to_string(),
                port,
            });
        }
        Ok(())
    }

    fn release(&self, protocol: &str, port: u16) {
        if let Some(mut taken) = self.allocated.get_mut(protocol) {
            taken.remove(&port);
        }
    }
}
