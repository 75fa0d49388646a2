//! Loom Domain - the outward-facing deployment API
//!
//! [`Domain`] owns the logical model and triggers generation + execution
//! cycles: `deploy` returns once the change set has been fully applied to
//! every zone or rolled back, and the error always states whether the
//! system was left in its original state or degraded.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod domain;
pub mod error;
pub mod events;
pub mod gateway;

pub use domain::{Domain, DomainConfig};
pub use error::DomainError;
pub use events::{DomainEvent, DomainEventEnvelope};
pub use gateway::{LocalZoneGateway, ZoneGateway};
