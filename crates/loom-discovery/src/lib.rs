//! Loom Discovery - distributed endpoint address directory
//!
//! Maintains, per logical endpoint, the set of currently active physical
//! socket addresses across the cluster, and notifies subscribers of changes.
//! Listener callbacks always receive the full current set, never a delta.
//!
//! Delivery guarantee: [`AddressCache::publish`] delivers synchronously —
//! every current subscriber's `on_update` completes before `publish`
//! returns.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod cache;
pub mod monitor;
pub mod port;

pub use cache::{AddressCache, AddressListener};
pub use monitor::AddressMonitor;
pub use port::{PortAllocator, PortError, PortRange, RangePortAllocator};
