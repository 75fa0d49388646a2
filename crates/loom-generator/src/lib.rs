//! Loom Generator - deployment planning
//!
//! Diffs the logical model against its previous state, by lifecycle state,
//! into ordered per-zone command lists. Generation is pure computation: it
//! never touches runtime state, and a failed pass produces nothing.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod collator;
pub mod error;
pub mod generator;

pub use collator::{
    Contribution, ContributionCollator, ContributionResolver, InMemoryContributionResolver,
    BOOT_CONTRIBUTION, HOST_CONTRIBUTION,
};
pub use error::{GenerationError, Result};
pub use generator::DeploymentGenerator;
