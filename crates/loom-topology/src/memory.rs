//! In-memory topology implementation
//!
//! Suitable for single-process runtimes and tests. Leadership, membership,
//! and announcement delivery are driven manually through the `elect`,
//! `member_joined`/`member_left`, and `deliver` methods; broadcasts are
//! recorded for inspection instead of leaving the process.

use crate::error::TopologyError;
use crate::service::{
    AnnouncementListener, LeaderElected, LeadershipListener, MembershipListener, TopologyService,
};
use async_trait::async_trait;
use dashmap::DashMap;
use loom_types::{AddressAnnouncement, RuntimeName, ZoneId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// In-memory topology service
pub struct InMemoryTopology {
    runtime: RuntimeName,
    zone: ZoneId,
    clustered: bool,
    leader: RwLock<Option<RuntimeName>>,
    leadership_listeners: DashMap<u64, Arc<dyn LeadershipListener>>,
    membership_listeners: DashMap<u64, Arc<dyn MembershipListener>>,
    announcement_listeners: DashMap<u64, Arc<dyn AnnouncementListener>>,
    broadcasts: Mutex<Vec<AddressAnnouncement>>,
    next_listener_id: AtomicU64,
}

impl InMemoryTopology {
    /// A runtime participating in a cluster with no leader elected yet
    pub fn clustered(runtime: RuntimeName, zone: ZoneId) -> Self {
        Self::with_mode(runtime, zone, true)
    }

    /// A single-runtime deployment; always its own leader
    pub fn standalone(runtime: RuntimeName, zone: ZoneId) -> Self {
        Self::with_mode(runtime, zone, false)
    }

    fn with_mode(runtime: RuntimeName, zone: ZoneId, clustered: bool) -> Self {
        Self {
            runtime,
            zone,
            clustered,
            leader: RwLock::new(None),
            leadership_listeners: DashMap::new(),
            membership_listeners: DashMap::new(),
            announcement_listeners: DashMap::new(),
            broadcasts: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_listener_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Elect a zone leader and notify every leadership listener
    pub async fn elect(&self, leader: RuntimeName) {
        *self.leader.write().await = Some(leader.clone());
        let event = LeaderElected {
            zone: self.zone.clone(),
            leader,
        };
        let listeners: Vec<_> = self
            .leadership_listeners
            .iter()
            .map(|l| l.value().clone())
            .collect();
        for listener in listeners {
            listener.on_leader_elected(&event).await;
        }
    }

    /// Announce a runtime joining the cluster
    pub async fn member_joined(&self, runtime: &RuntimeName) {
        let listeners: Vec<_> = self
            .membership_listeners
            .iter()
            .map(|l| l.value().clone())
            .collect();
        for listener in listeners {
            listener.on_member_joined(runtime).await;
        }
    }

    /// Announce a runtime leaving the cluster
    pub async fn member_left(&self, runtime: &RuntimeName) {
        let listeners: Vec<_> = self
            .membership_listeners
            .iter()
            .map(|l| l.value().clone())
            .collect();
        for listener in listeners {
            listener.on_member_left(runtime).await;
        }
    }

    /// Deliver a remote address announcement to local listeners
    pub async fn deliver(&self, announcement: &AddressAnnouncement) {
        let listeners: Vec<_> = self
            .announcement_listeners
            .iter()
            .map(|l| l.value().clone())
            .collect();
        for listener in listeners {
            listener.on_announcement(announcement).await;
        }
    }

    /// Announcements broadcast by the local runtime, in order
    pub async fn broadcasts(&self) -> Vec<AddressAnnouncement> {
        self.broadcasts.lock().await.clone()
    }
}

#[async_trait]
impl TopologyService for InMemoryTopology {
    fn runtime_name(&self) -> &RuntimeName {
        &self.runtime
    }

    fn zone(&self) -> &ZoneId {
        &self.zone
    }

    fn is_clustered(&self) -> bool {
        self.clustered
    }

    async fn zone_leader(&self) -> Option<RuntimeName> {
        if !self.clustered {
            return Some(self.runtime.clone());
        }
        self.leader.read().await.clone()
    }

    fn register_leadership_listener(&self, listener: Arc<dyn LeadershipListener>) {
        self.leadership_listeners.insert(self.next_id(), listener);
    }

    fn register_membership_listener(&self, listener: Arc<dyn MembershipListener>) {
        self.membership_listeners.insert(self.next_id(), listener);
    }

    fn register_announcement_listener(&self, listener: Arc<dyn AnnouncementListener>) {
        self.announcement_listeners.insert(self.next_id(), listener);
    }

    async fn broadcast(&self, announcement: AddressAnnouncement) -> Result<(), TopologyError> {
        debug!(endpoint = %announcement.endpoint, "Recording broadcast");
        self.broadcasts.lock().await.push(announcement);
        Ok(())
    }
}
