//! Domain scope container
//!
//! Domain-scoped components have at most one active instance cluster-wide,
//! hosted by the current zone leader. A non-leader runtime records context
//! starts in a pending list instead of starting them; when the topology
//! service elects this runtime, the pending list is drained and every
//! deferred context starts. The new leader never replays historical
//! deployment commands: its pending list already holds what needs
//! activation.

use crate::error::ScopeError;
use crate::scope::{InstanceState, ScopeContainer, ScopedComponent};
use async_trait::async_trait;
use dashmap::DashMap;
use loom_topology::{LeaderElected, LeadershipListener, TopologyService};
use loom_types::{ComponentUri, DeployableId, Scope};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// State shared between deployment-command delivery and leader-election
/// notification. One lock guards all of it; pending membership means
/// "not yet started", and the election drain holds the lock end to end so a
/// concurrent `start_context` is neither lost nor started twice.
#[derive(Default)]
struct DomainState {
    pending: Vec<DeployableId>,
    // deployable -> component uris in start order
    active: HashMap<DeployableId, Vec<ComponentUri>>,
    instance_states: HashMap<ComponentUri, InstanceState>,
    activated: bool,
}

/// Domain scope container. Built without a topology service it behaves like
/// a single-runtime deployment and activates immediately.
pub struct DomainScopeContainer {
    components: DashMap<ComponentUri, Arc<dyn ScopedComponent>>,
    topology: Option<Arc<dyn TopologyService>>,
    state: Mutex<DomainState>,
}

impl DomainScopeContainer {
    /// Create the container and subscribe it to leadership events through a
    /// listener adapter.
    pub fn new(topology: Option<Arc<dyn TopologyService>>) -> Arc<Self> {
        let container = Arc::new(Self {
            components: DashMap::new(),
            topology,
            state: Mutex::new(DomainState::default()),
        });
        if let Some(topology) = &container.topology {
            topology.register_leadership_listener(Arc::new(DomainActivationListener {
                container: container.clone(),
            }));
        }
        container
    }

    async fn defer_starts(&self) -> bool {
        match &self.topology {
            Some(topology) => topology.is_clustered() && !topology.is_zone_leader().await,
            None => false,
        }
    }

    async fn start_locked(
        &self,
        state: &mut DomainState,
        deployable: &DeployableId,
    ) -> Result<(), ScopeError> {
        if state.active.contains_key(deployable) {
            return Ok(());
        }
        let mut components: Vec<_> = self
            .components
            .iter()
            .filter(|entry| entry.value().deployable() == deployable)
            .map(|entry| entry.value().clone())
            .collect();
        components.sort_by(|a, b| a.uri().cmp(b.uri()));

        let mut started = Vec::new();
        for component in components {
            if !component.eager_init() {
                continue;
            }
            if let Err(err) = component.start().await {
                self.stop_instances(state, &started).await;
                return Err(err);
            }
            state
                .instance_states
                .insert(component.uri().clone(), InstanceState::Active);
            started.push(component.uri().clone());
        }
        state.active.insert(deployable.clone(), started);
        Ok(())
    }

    async fn stop_instances(&self, state: &mut DomainState, order: &[ComponentUri]) {
        for uri in order.iter().rev() {
            let Some(component) = self.components.get(uri).map(|e| e.value().clone()) else {
                continue;
            };
            if let Err(err) = component.stop().await {
                warn!(uri = %uri, error = %err, "Instance stop failed during context stop");
            }
            state.instance_states.insert(uri.clone(), InstanceState::Stopped);
        }
    }

    async fn handle_leader_elected(&self, event: &LeaderElected) {
        let Some(topology) = &self.topology else {
            return;
        };
        if &event.leader != topology.runtime_name() || &event.zone != topology.zone() {
            debug!(leader = %event.leader, "Ignoring leader election for another runtime");
            return;
        }
        info!(zone = %event.zone, "Elected zone leader; activating deferred domain contexts");
        // Hold the lock for the whole drain.
        let mut state = self.state.lock().await;
        let pending = std::mem::take(&mut state.pending);
        for deployable in pending {
            if let Err(err) = self.start_locked(&mut state, &deployable).await {
                error!(
                    deployable = %deployable,
                    error = %err,
                    "Failed to activate deferred domain context"
                );
            }
        }
        state.activated = true;
    }
}

#[async_trait]
impl ScopeContainer for DomainScopeContainer {
    fn scope(&self) -> Scope {
        Scope::Domain
    }

    fn register(&self, component: Arc<dyn ScopedComponent>) {
        self.components.insert(component.uri().clone(), component);
    }

    fn unregister(&self, uri: &ComponentUri) {
        self.components.remove(uri);
    }

    async fn start_context(&self, deployable: &DeployableId) -> Result<(), ScopeError> {
        let defer = self.defer_starts().await;
        let mut state = self.state.lock().await;
        if defer && !state.activated {
            if !state.pending.contains(deployable) {
                debug!(deployable = %deployable, "Deferring domain context until leadership");
                state.pending.push(deployable.clone());
            }
            return Ok(());
        }
        state.activated = true;
        self.start_locked(&mut state, deployable).await
    }

    /// Unconditional: a local stop clears pending and active state no matter
    /// who leads the zone.
    async fn stop_context(&self, deployable: &DeployableId) -> Result<(), ScopeError> {
        let mut state = self.state.lock().await;
        state.pending.retain(|pending| pending != deployable);
        if let Some(order) = state.active.remove(deployable) {
            self.stop_instances(&mut state, &order).await;
        }
        Ok(())
    }

    async fn stop_all_contexts(&self) {
        let mut state = self.state.lock().await;
        state.pending.clear();
        let contexts: Vec<_> = state.active.drain().collect();
        for (_, order) in contexts {
            self.stop_instances(&mut state, &order).await;
        }
        state.activated = false;
    }

    async fn get_instance(
        &self,
        uri: &ComponentUri,
    ) -> Result<Arc<dyn ScopedComponent>, ScopeError> {
        let component = self
            .components
            .get(uri)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ScopeError::UnknownComponent(uri.clone()))?;

        let mut state = self.state.lock().await;
        if self.topology.is_some() && !state.activated {
            return Err(ScopeError::NotActive(uri.clone()));
        }
        if state.instance_states.get(uri) == Some(&InstanceState::Active) {
            return Ok(component);
        }
        if !state.active.contains_key(component.deployable()) {
            return Err(ScopeError::NotActive(uri.clone()));
        }
        component.start().await?;
        state
            .instance_states
            .insert(uri.clone(), InstanceState::Active);
        if let Some(order) = state.active.get_mut(component.deployable()) {
            order.push(uri.clone());
        }
        Ok(component)
    }

    async fn release_instance(&self, uri: &ComponentUri) -> Result<(), ScopeError> {
        let component = self
            .components
            .get(uri)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ScopeError::UnknownComponent(uri.clone()))?;
        let mut state = self.state.lock().await;
        if state.instance_states.get(uri) != Some(&InstanceState::Active) {
            return Ok(());
        }
        component.stop().await?;
        state
            .instance_states
            .insert(uri.clone(), InstanceState::Stopped);
        if let Some(order) = state.active.get_mut(component.deployable()) {
            order.retain(|u| u != uri);
        }
        Ok(())
    }
}

/// Subscribes the domain container to leadership events. The container is
/// composed with the event source through this adapter; it is never itself
/// treated as a listener.
struct DomainActivationListener {
    container: Arc<DomainScopeContainer>,
}

#[async_trait]
impl LeadershipListener for DomainActivationListener {
    async fn on_leader_elected(&self, event: &LeaderElected) {
        self.container.handle_leader_elected(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::testing::CountingComponent;
    use loom_topology::InMemoryTopology;
    use loom_types::{RuntimeName, ZoneId};

    fn clustered_topology() -> Arc<InMemoryTopology> {
        Arc::new(InMemoryTopology::clustered(
            RuntimeName::new("node1"),
            ZoneId::new("zone1"),
        ))
    }

    #[tokio::test]
    async fn test_non_leader_defers_until_elected() {
        let topology = clustered_topology();
        let container = DomainScopeContainer::new(Some(topology.clone()));
        let component = CountingComponent::new("domain://singleton", "app");
        container.register(component.clone());

        let deployable = DeployableId::new("app");
        container.start_context(&deployable).await.unwrap();
        assert_eq!(component.start_count(), 0);
        assert!(matches!(
            container.get_instance(component.uri()).await,
            Err(ScopeError::NotActive(_))
        ));

        // A second start before the election must not duplicate the context.
        container.start_context(&deployable).await.unwrap();

        topology.elect(RuntimeName::new("node1")).await;
        assert_eq!(component.start_count(), 1);
        assert!(container.get_instance(component.uri()).await.is_ok());
    }

    #[tokio::test]
    async fn test_election_of_other_runtime_is_ignored() {
        let topology = clustered_topology();
        let container = DomainScopeContainer::new(Some(topology.clone()));
        let component = CountingComponent::new("domain://singleton", "app");
        container.register(component.clone());

        container
            .start_context(&DeployableId::new("app"))
            .await
            .unwrap();
        topology.elect(RuntimeName::new("node2")).await;
        assert_eq!(component.start_count(), 0);
        assert!(matches!(
            container.get_instance(component.uri()).await,
            Err(ScopeError::NotActive(_))
        ));
    }

    #[tokio::test]
    async fn test_leader_starts_immediately() {
        let topology = clustered_topology();
        topology.elect(RuntimeName::new("node1")).await;
        let container = DomainScopeContainer::new(Some(topology));
        let component = CountingComponent::new("domain://singleton", "app");
        container.register(component.clone());

        container
            .start_context(&DeployableId::new("app"))
            .await
            .unwrap();
        assert_eq!(component.start_count(), 1);
    }

    #[tokio::test]
    async fn test_standalone_runtime_starts_immediately() {
        let container = DomainScopeContainer::new(None);
        let component = CountingComponent::new("domain://singleton", "app");
        container.register(component.clone());

        container
            .start_context(&DeployableId::new("app"))
            .await
            .unwrap();
        assert_eq!(component.start_count(), 1);
        assert!(container.get_instance(component.uri()).await.is_ok());
    }

    #[tokio::test]
    async fn test_stop_clears_pending_regardless_of_leadership() {
        let topology = clustered_topology();
        let container = DomainScopeContainer::new(Some(topology.clone()));
        let component = CountingComponent::new("domain://singleton", "app");
        container.register(component.clone());

        let deployable = DeployableId::new("app");
        container.start_context(&deployable).await.unwrap();
        container.stop_context(&deployable).await.unwrap();

        // The deferred context was cancelled before the election landed.
        topology.elect(RuntimeName::new("node1")).await;
        assert_eq!(component.start_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_context_idempotent_on_leader() {
        let container = DomainScopeContainer::new(None);
        let component = CountingComponent::new("domain://singleton", "app");
        container.register(component.clone());

        let deployable = DeployableId::new("app");
        container.start_context(&deployable).await.unwrap();
        container.stop_context(&deployable).await.unwrap();
        container.stop_context(&deployable).await.unwrap();
        assert_eq!(component.stop_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_all_deactivates() {
        let topology = clustered_topology();
        let container = DomainScopeContainer::new(Some(topology.clone()));
        let component = CountingComponent::new("domain://singleton", "app");
        container.register(component.clone());

        topology.elect(RuntimeName::new("node1")).await;
        container
            .start_context(&DeployableId::new("app"))
            .await
            .unwrap();
        container.stop_all_contexts().await;

        assert_eq!(component.stop_count(), 1);
        assert!(matches!(
            container.get_instance(component.uri()).await,
            Err(ScopeError::NotActive(_))
        ));
    }
}
