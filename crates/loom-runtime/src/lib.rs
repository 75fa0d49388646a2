//! Loom Runtime - command execution and scoped instance lifecycle
//!
//! A zone runtime replays deployment command lists through the
//! [`CommandExecutorRegistry`], which dispatches each command to the executor
//! registered for its kind. The [`DeploymentApplier`] preserves ordering and
//! rolls applied commands back with compensating commands when a later
//! command fails. Executors that start or stop component instances delegate
//! to the scope containers.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod applier;
pub mod error;
pub mod executor;
pub mod executors;
pub mod scope;

pub use applier::{ApplyError, CompensationFailure, DeploymentApplier};
pub use error::{ExecutionError, ScopeError};
pub use executor::{CommandExecutor, CommandExecutorRegistry};
pub use executors::{
    register_core_executors, ComponentBuilder, ContributionProcessor, WireAttacher,
};
pub use scope::{
    CompositeScopeContainer, DomainScopeContainer, InstanceState, ScopeContainer, ScopeRegistry,
    ScopedComponent, StatelessScopeContainer,
};
