//! Loom Topology - cluster membership and leadership abstraction
//!
//! The production membership service (gossip, consensus, whatever the host
//! runtime provides) is an external collaborator. This crate defines the
//! narrow interface the orchestration core consumes, plus an in-memory
//! implementation that tests and single-process runtimes can drive directly.
//!
//! Listeners are composed explicitly: a consumer registers a listener object
//! with the service, it is never itself cast to a listener type.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod memory;
pub mod service;

pub use error::TopologyError;
pub use memory::InMemoryTopology;
pub use service::{
    AnnouncementListener, LeaderElected, LeadershipListener, MembershipListener, TopologyService,
};
