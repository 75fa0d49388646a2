//! Stateless scope container

use crate::error::ScopeError;
use crate::scope::{ScopeContainer, ScopedComponent};
use async_trait::async_trait;
use dashmap::DashMap;
use loom_types::{ComponentUri, DeployableId, Scope};
use std::sync::Arc;

/// Stateless scope: no shared instance. Every `get_instance` creates and
/// starts a fresh instance; `release_instance` stops it immediately. Context
/// start/stop carries no semantics here.
#[derive(Default)]
pub struct StatelessScopeContainer {
    components: DashMap<ComponentUri, Arc<dyn ScopedComponent>>,
}

impl StatelessScopeContainer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScopeContainer for StatelessScopeContainer {
    fn scope(&self) -> Scope {
        Scope::Stateless
    }

    fn register(&self, component: Arc<dyn ScopedComponent>) {
        self.components.insert(component.uri().clone(), component);
    }

    fn unregister(&self, uri: &ComponentUri) {
        self.components.remove(uri);
    }

    async fn start_context(&self, _deployable: &DeployableId) -> Result<(), ScopeError> {
        Ok(())
    }

    async fn stop_context(&self, _deployable: &DeployableId) -> Result<(), ScopeError> {
        Ok(())
    }

    async fn stop_all_contexts(&self) {}

    async fn get_instance(
        &self,
        uri: &ComponentUri,
    ) -> Result<Arc<dyn ScopedComponent>, ScopeError> {
        let component = self
            .components
            .get(uri)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ScopeError::UnknownComponent(uri.clone()))?;
        component.start().await?;
        Ok(component)
    }

    async fn release_instance(&self, uri: &ComponentUri) -> Result<(), ScopeError> {
        let component = self
            .components
            .get(uri)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ScopeError::UnknownComponent(uri.clone()))?;
        component.stop().await
    }
}
