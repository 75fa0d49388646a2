//! Address monitor: topology bridge for the address cache
//!
//! Republishes announcements arriving from other runtimes into the local
//! cache, broadcasts local announcements to the cluster, and evicts a
//! runtime's addresses when the membership service reports it gone.

use crate::cache::AddressCache;
use async_trait::async_trait;
use loom_topology::{AnnouncementListener, MembershipListener, TopologyError, TopologyService};
use loom_types::{AddressAnnouncement, RuntimeName};
use std::sync::Arc;
use tracing::{debug, info};

/// Connects the local [`AddressCache`] to the cluster topology
pub struct AddressMonitor {
    cache: Arc<AddressCache>,
    topology: Arc<dyn TopologyService>,
}

impl AddressMonitor {
    /// Create the monitor and register its topology listeners
    pub fn new(cache: Arc<AddressCache>, topology: Arc<dyn TopologyService>) -> Arc<Self> {
        let monitor = Arc::new(Self {
            cache: cache.clone(),
            topology: topology.clone(),
        });
        topology.register_announcement_listener(Arc::new(RemoteAnnouncements {
            cache: cache.clone(),
        }));
        topology.register_membership_listener(Arc::new(DepartureEviction { cache }));
        monitor
    }

    /// Publish a locally originated announcement and propagate it to the
    /// rest of the cluster.
    pub async fn announce(&self, announcement: AddressAnnouncement) -> Result<(), TopologyError> {
        self.cache.publish(&announcement).await;
        self.topology.broadcast(announcement).await
    }
}

/// Applies announcements from other runtimes to the local cache
struct RemoteAnnouncements {
    cache: Arc<AddressCache>,
}

#[async_trait]
impl AnnouncementListener for RemoteAnnouncements {
    async fn on_announcement(&self, announcement: &AddressAnnouncement) {
        debug!(endpoint = %announcement.endpoint, "Applying remote address announcement");
        self.cache.publish(announcement).await;
    }
}

/// Evicts a departed runtime's addresses without waiting for REMOVED events
struct DepartureEviction {
    cache: Arc<AddressCache>,
}

#[async_trait]
impl MembershipListener for DepartureEviction {
    async fn on_member_joined(&self, runtime: &RuntimeName) {
        debug!(runtime = %runtime, "Cluster member joined");
    }

    async fn on_member_left(&self, runtime: &RuntimeName) {
        info!(runtime = %runtime, "Cluster member left; evicting its addresses");
        self.cache.evict_runtime(runtime).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_topology::InMemoryTopology;
    use loom_types::{EndpointId, SocketAddress, ZoneId};

    fn address(runtime: &str, port: u16) -> SocketAddress {
        SocketAddress::new(
            RuntimeName::new(runtime),
            ZoneId::new("zone1"),
            "tcp",
            "10.0.0.1",
            port,
        )
    }

    fn endpoint() -> EndpointId {
        EndpointId::new("orders")
    }

    fn harness() -> (Arc<AddressCache>, Arc<InMemoryTopology>, Arc<AddressMonitor>) {
        let cache = Arc::new(AddressCache::new());
        let topology = Arc::new(InMemoryTopology::clustered(
            RuntimeName::new("node1"),
            ZoneId::new("zone1"),
        ));
        let monitor = AddressMonitor::new(cache.clone(), topology.clone());
        (cache, topology, monitor)
    }

    #[tokio::test]
    async fn test_local_announcement_published_and_broadcast() {
        let (cache, topology, monitor) = harness();
        let announcement = AddressAnnouncement::activated(endpoint(), address("node1", 8080));

        monitor.announce(announcement.clone()).await.unwrap();

        assert_eq!(cache.active_addresses(&endpoint()).len(), 1);
        assert_eq!(topology.broadcasts().await, vec![announcement]);
    }

    #[tokio::test]
    async fn test_remote_announcement_reaches_local_cache() {
        let (cache, topology, _monitor) = harness();
        topology
            .deliver(&AddressAnnouncement::activated(
                endpoint(),
                address("node2", 9000),
            ))
            .await;

        assert_eq!(
            cache.active_addresses(&endpoint()),
            vec![address("node2", 9000)]
        );
    }

    #[tokio::test]
    async fn test_departed_member_addresses_evicted() {
        let (cache, topology, _monitor) = harness();
        topology
            .deliver(&AddressAnnouncement::activated(
                endpoint(),
                address("node2", 9000),
            ))
            .await;
        topology
            .deliver(&AddressAnnouncement::activated(
                endpoint(),
                address("node3", 9000),
            ))
            .await;

        topology.member_left(&RuntimeName::new("node2")).await;

        assert_eq!(
            cache.active_addresses(&endpoint()),
            vec![address("node3", 9000)]
        );
    }
}
