//! Address cache
//!
//! Entries are kept per endpoint in a concurrent map, so publishing to one
//! endpoint never blocks subscribers of another. Delivery is synchronous:
//! every current subscriber's `on_update` completes before `publish`
//! returns.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::FutureExt;
use loom_types::{AddressAnnouncement, AnnouncementKind, EndpointId, RuntimeName, SocketAddress};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// Callback contract transports implement to react to endpoint changes.
///
/// The addresses argument is the full current set for the endpoint.
#[async_trait]
pub trait AddressListener: Send + Sync {
    async fn on_update(&self, endpoint: &EndpointId, addresses: &[SocketAddress]);
}

#[derive(Default)]
struct EndpointEntry {
    addresses: Vec<SocketAddress>,
    listeners: HashMap<String, Arc<dyn AddressListener>>,
}

/// Tracks the active socket addresses of each logical endpoint
#[derive(Default)]
pub struct AddressCache {
    entries: DashMap<EndpointId, EndpointEntry>,
}

impl AddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current known-active set; empty if the endpoint has no active
    /// bindings.
    pub fn active_addresses(&self, endpoint: &EndpointId) -> Vec<SocketAddress> {
        self.entries
            .get(endpoint)
            .map(|entry| entry.addresses.clone())
            .unwrap_or_default()
    }

    /// Announce an address activation or removal. Activation de-duplicates
    /// by address equality. Every current subscriber is notified with the
    /// full updated set before this returns.
    pub async fn publish(&self, announcement: &AddressAnnouncement) {
        let (addresses, listeners) = {
            let mut entry = self.entries.entry(announcement.endpoint.clone()).or_default();
            match announcement.kind {
                AnnouncementKind::Activated => {
                    if !entry.addresses.contains(&announcement.address) {
                        entry.addresses.push(announcement.address.clone());
                    }
                }
                AnnouncementKind::Removed => {
                    entry.addresses.retain(|a| a != &announcement.address);
                }
            }
            (
                entry.addresses.clone(),
                entry.listeners.values().cloned().collect::<Vec<_>>(),
            )
        };
        debug!(
            endpoint = %announcement.endpoint,
            active = addresses.len(),
            "Address announcement applied"
        );
        notify(&announcement.endpoint, &listeners, &addresses).await;
    }

    /// Subscribe a listener under a caller-supplied id. The same logical
    /// listener may subscribe to any number of endpoints.
    pub fn subscribe(
        &self,
        endpoint: &EndpointId,
        listener_id: impl Into<String>,
        listener: Arc<dyn AddressListener>,
    ) {
        self.entries
            .entry(endpoint.clone())
            .or_default()
            .listeners
            .insert(listener_id.into(), listener);
    }

    /// Remove a listener registration. Unsubscribing an unknown id is a
    /// no-op.
    pub fn unsubscribe(&self, endpoint: &EndpointId, listener_id: &str) {
        if let Some(mut entry) = self.entries.get_mut(endpoint) {
            entry.listeners.remove(listener_id);
        }
    }

    /// Drop every address owned by a runtime, notifying subscribers of each
    /// endpoint whose set shrank. Used when a cluster member leaves without
    /// announcing removals.
    pub async fn evict_runtime(&self, runtime: &RuntimeName) {
        let endpoints: Vec<EndpointId> =
            self.entries.iter().map(|entry| entry.key().clone()).collect();
        for endpoint in endpoints {
            let changed = {
                let Some(mut entry) = self.entries.get_mut(&endpoint) else {
                    continue;
                };
                let before = entry.addresses.len();
                entry.addresses.retain(|a| &a.runtime != runtime);
                if entry.addresses.len() == before {
                    None
                } else {
                    Some((
                        entry.addresses.clone(),
                        entry.listeners.values().cloned().collect::<Vec<_>>(),
                    ))
                }
            };
            if let Some((addresses, listeners)) = changed {
                warn!(
                    endpoint = %endpoint,
                    runtime = %runtime,
                    "Evicting addresses of departed runtime"
                );
                notify(&endpoint, &listeners, &addresses).await;
            }
        }
    }
}

/// Deliver the full set to each listener, isolating per-listener failures so
/// one faulty listener cannot block delivery to the rest.
async fn notify(
    endpoint: &EndpointId,
    listeners: &[Arc<dyn AddressListener>],
    addresses: &[SocketAddress],
) {
    for listener in listeners {
        let delivery = AssertUnwindSafe(listener.on_update(endpoint, addresses)).catch_unwind();
        if delivery.await.is_err() {
            warn!(endpoint = %endpoint, "Address listener panicked during delivery");
        }
    }
}
