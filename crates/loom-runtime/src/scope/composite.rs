//! Composite scope container

use crate::error::ScopeError;
use crate::scope::{InstanceState, ScopeContainer, ScopedComponent};
use async_trait::async_trait;
use dashmap::DashMap;
use loom_types::{ComponentUri, DeployableId, Scope};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Composite scope: one instance group per deployable. Starting a context
/// instantiates and starts the deployable's eager components; stopping it
/// stops and releases them in reverse start order.
#[derive(Default)]
pub struct CompositeScopeContainer {
    components: DashMap<ComponentUri, Arc<dyn ScopedComponent>>,
    instance_states: DashMap<ComponentUri, InstanceState>,
    // deployable -> component uris in start order
    active: Mutex<HashMap<DeployableId, Vec<ComponentUri>>>,
}

impl CompositeScopeContainer {
    pub fn new() -> Self {
        Self::default()
    }

    fn components_of(&self, deployable: &DeployableId) -> Vec<Arc<dyn ScopedComponent>> {
        let mut components: Vec<_> = self
            .components
            .iter()
            .filter(|entry| entry.value().deployable() == deployable)
            .map(|entry| entry.value().clone())
            .collect();
        components.sort_by(|a, b| a.uri().cmp(b.uri()));
        components
    }

    async fn stop_instances(&self, order: &[ComponentUri]) {
        for uri in order.iter().rev() {
            let Some(component) = self.components.get(uri).map(|e| e.value().clone()) else {
                continue;
            };
            if let Err(err) = component.stop().await {
                warn!(uri = %uri, error = %err, "Instance stop failed during context stop");
            }
            self.instance_states.insert(uri.clone(), InstanceState::Stopped);
        }
    }
}

#[async_trait]
impl ScopeContainer for CompositeScopeContainer {
    fn scope(&self) -> Scope {
        Scope::Composite
    }

    fn register(&self, component: Arc<dyn ScopedComponent>) {
        self.instance_states
            .insert(component.uri().clone(), InstanceState::Uninstantiated);
        self.components.insert(component.uri().clone(), component);
    }

    fn unregister(&self, uri: &ComponentUri) {
        self.components.remove(uri);
        self.instance_states.remove(uri);
    }

    async fn start_context(&self, deployable: &DeployableId) -> Result<(), ScopeError> {
        let mut active = self.active.lock().await;
        if active.contains_key(deployable) {
            return Ok(());
        }
        let mut started = Vec::new();
        for component in self.components_of(deployable) {
            if !component.eager_init() {
                continue;
            }
            if let Err(err) = component.start().await {
                // Unwind the partially started context before surfacing.
                self.stop_instances(&started).await;
                return Err(err);
            }
            self.instance_states
                .insert(component.uri().clone(), InstanceState::Active);
            started.push(component.uri().clone());
        }
        active.insert(deployable.clone(), started);
        Ok(())
    }

    async fn stop_context(&self, deployable: &DeployableId) -> Result<(), ScopeError> {
        let mut active = self.active.lock().await;
        if let Some(order) = active.remove(deployable) {
            self.stop_instances(&order).await;
        }
        Ok(())
    }

    async fn stop_all_contexts(&self) {
        let mut active = self.active.lock().await;
        let contexts: Vec<_> = active.drain().collect();
        for (_, order) in contexts {
            self.stop_instances(&order).await;
        }
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

        if self.instance_states.get(uri).map(|s| *s.value()) == Some(InstanceState::Active) {
            return Ok(component);
        }

        // Lazy components start on first use once their context is active.
        let mut active = self.active.lock().await;
        let Some(order) = active.get_mut(component.deployable()) else {
            return Err(ScopeError::NotActive(uri.clone()));
        };
        component.start().await?;
        self.instance_states.insert(uri.clone(), InstanceState::Active);
        order.push(uri.clone());
        Ok(component)
    }

    async fn release_instance(&self, uri: &ComponentUri) -> Result<(), ScopeError> {
        let component = self
            .components
            .get(uri)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ScopeError::UnknownComponent(uri.clone()))?;
        if self.instance_states.get(uri).map(|s| *s.value()) != Some(InstanceState::Active) {
            return Ok(());
        }
        component.stop().await?;
        self.instance_states.insert(uri.clone(), InstanceState::Stopped);
        let mut active = self.active.lock().await;
        if let Some(order) = active.get_mut(component.deployable()) {
            order.retain(|u| u != uri);
        }
        Ok(())
    }
}
