//! Topology service trait and listener contracts

use crate::error::TopologyError;
use async_trait::async_trait;
use loom_types::{AddressAnnouncement, RuntimeName, ZoneId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Notification that a zone has elected a new leader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderElected {
    pub zone: ZoneId,
    pub leader: RuntimeName,
}

/// Receives leader-election notifications for the local zone
#[async_trait]
pub trait LeadershipListener: Send + Sync {
    async fn on_leader_elected(&self, event: &LeaderElected);
}

/// Receives cluster join/leave notifications
#[async_trait]
pub trait MembershipListener: Send + Sync {
    async fn on_member_joined(&self, runtime: &RuntimeName);

    async fn on_member_left(&self, runtime: &RuntimeName);
}

/// Receives address announcements propagated from other runtimes
#[async_trait]
pub trait AnnouncementListener: Send + Sync {
    async fn on_announcement(&self, announcement: &AddressAnnouncement);
}

/// Narrow view of the cluster membership service consumed by the
/// orchestration core.
#[async_trait]
pub trait TopologyService: Send + Sync {
    /// Name of the local runtime node
    fn runtime_name(&self) -> &RuntimeName;

    /// Zone the local runtime belongs to
    fn zone(&self) -> &ZoneId;

    /// Whether this runtime participates in a cluster.
    ///
    /// Single-runtime deployments report false and are always their own
    /// leader.
    fn is_clustered(&self) -> bool;

    /// Current leader of the local zone, if one has been elected
    async fn zone_leader(&self) -> Option<RuntimeName>;

    /// Whether the local runtime currently leads its zone
    async fn is_zone_leader(&self) -> bool {
        self.zone_leader().await.as_ref() == Some(self.runtime_name())
    }

    fn register_leadership_listener(&self, listener: Arc<dyn LeadershipListener>);

    fn register_membership_listener(&self, listener: Arc<dyn MembershipListener>);

    fn register_announcement_listener(&self, listener: Arc<dyn AnnouncementListener>);

    /// Propagate an address announcement to the rest of the cluster
    async fn broadcast(&self, announcement: AddressAnnouncement) -> Result<(), TopologyError>;
}
