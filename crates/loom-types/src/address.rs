//! Socket addresses and address announcements
//!
//! A [`SocketAddress`] identifies a bound network endpoint. It is owned by
//! the runtime that bound it and is published, never mutated, after creation.

use crate::ids::{EndpointId, RuntimeName, ZoneId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A bound physical endpoint published by one runtime.
///
/// Value equality is by (runtime, protocol, host, port): the zone is carried
/// for diagnostics but two announcements for the same bound socket compare
/// equal regardless of zone labelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketAddress {
    pub runtime: RuntimeName,
    pub zone: ZoneId,
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl SocketAddress {
    pub fn new(
        runtime: RuntimeName,
        zone: ZoneId,
        protocol: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            runtime,
            zone,
            protocol: protocol.into(),
            host: host.into(),
            port,
        }
    }
}

impl PartialEq for SocketAddress {
    fn eq(&self, other: &Self) -> bool {
        self.runtime == other.runtime
            && self.protocol == other.protocol
            && self.host == other.host
            && self.port == other.port
    }
}

impl Eq for SocketAddress {}

impl Hash for SocketAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.runtime.hash(state);
        self.protocol.hash(state);
        self.host.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{} ({})",
            self.protocol, self.host, self.port, self.runtime
        )
    }
}

/// Whether an announcement activates or removes an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnouncementKind {
    Activated,
    Removed,
}

/// The unit of propagation in the address directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressAnnouncement {
    pub kind: AnnouncementKind,
    pub endpoint: EndpointId,
    pub address: SocketAddress,
}

impl AddressAnnouncement {
    pub fn activated(endpoint: EndpointId, address: SocketAddress) -> Self {
        Self {
            kind: AnnouncementKind::Activated,
            endpoint,
            address,
        }
    }

    pub fn removed(endpoint: EndpointId, address: SocketAddress) -> Self {
        Self {
            kind: AnnouncementKind::Removed,
            endpoint,
            address,
        }
    }
}
