//! Loom Types - Core types for deployment orchestration
//!
//! Loom is the deployment orchestration core of a distributed component
//! runtime. It computes, executes, and compensates the changes required to
//! bring a cluster of runtime zones to a desired logical topology.
//!
//! ## Architectural Boundaries
//!
//! - **Loom** owns: diff/planning, command execution and compensation,
//!   scoped instance lifecycle, endpoint address discovery
//! - **External collaborators** own: manifest loading, artifact packaging,
//!   binding transports, cluster membership, persistence
//!
//! ## Key Concepts
//!
//! - **LogicalComponent**: a node in the composite tree with a lifecycle state
//! - **Command**: an atomic, serializable unit of work targeted at one zone
//! - **Deployment**: the per-zone ordered command lists for one change set
//! - **SocketAddress**: a bound physical endpoint published by one runtime

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod address;
pub mod command;
pub mod component;
pub mod deployment;
pub mod ids;

// Re-export main types
pub use address::{AddressAnnouncement, AnnouncementKind, SocketAddress};
pub use command::{Command, CommandKind, ComponentSnapshot, ConnectionCommand, Wire};
pub use component::{LifecycleState, LogicalComponent, Scope, StateError};
pub use deployment::{Deployment, DeploymentPlan, DeploymentUnit, GenerationMode};
pub use ids::{
    ComponentUri, ContributionUri, DeployableId, DeploymentId, EndpointId, RuntimeName, ZoneId,
};
