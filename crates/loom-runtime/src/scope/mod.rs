//! Scope containers: per-scope component instance lifecycle
//!
//! A scope container owns the create/start/stop lifecycle of the component
//! instances registered with it, grouped into per-deployable contexts. One
//! container exists per [`Scope`]; executors route to it through the
//! [`ScopeRegistry`].

pub mod composite;
pub mod domain;
pub mod stateless;

use crate::error::ScopeError;
use async_trait::async_trait;
use dashmap::DashMap;
use loom_types::{ComponentUri, DeployableId, Scope};
use std::sync::Arc;

pub use composite::CompositeScopeContainer;
pub use domain::DomainScopeContainer;
pub use stateless::StatelessScopeContainer;

/// Creation state of a managed instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Registered but never started
    Uninstantiated,
    /// Started and usable
    Active,
    /// Stopped after having been active
    Stopped,
}

/// A component instance holder bound to exactly one scope container.
///
/// Implementations are produced by the external component builder; the
/// container only drives start/stop and tracks creation state.
#[async_trait]
pub trait ScopedComponent: Send + Sync {
    fn uri(&self) -> &ComponentUri;

    fn deployable(&self) -> &DeployableId;

    /// Whether the instance starts when its context starts, as opposed to on
    /// first use
    fn eager_init(&self) -> bool {
        true
    }

    async fn start(&self) -> Result<(), ScopeError>;

    async fn stop(&self) -> Result<(), ScopeError>;
}

/// Owns instance lifecycle for one scope
#[async_trait]
pub trait ScopeContainer: Send + Sync {
    fn scope(&self) -> Scope;

    /// Register a component with this container. Registration alone creates
    /// no instance.
    fn register(&self, component: Arc<dyn ScopedComponent>);

    fn unregister(&self, uri: &ComponentUri);

    /// Activate the instance group of a deployable. Idempotent: starting an
    /// already-started context is a no-op.
    async fn start_context(&self, deployable: &DeployableId) -> Result<(), ScopeError>;

    /// Deactivate the instance group of a deployable. Idempotent: stopping a
    /// stopped context is a no-op, not an error.
    async fn stop_context(&self, deployable: &DeployableId) -> Result<(), ScopeError>;

    /// Unconditionally stop every active context, e.g. on local shutdown
    async fn stop_all_contexts(&self);

    /// Hand out the active instance for a component, or fail with
    /// [`ScopeError::NotActive`] without blocking.
    async fn get_instance(
        &self,
        uri: &ComponentUri,
    ) -> Result<Arc<dyn ScopedComponent>, ScopeError>;

    /// Return an instance obtained from [`Self::get_instance`]
    async fn release_instance(&self, uri: &ComponentUri) -> Result<(), ScopeError>;
}

/// Routes each scope to its registered container
#[derive(Default)]
pub struct ScopeRegistry {
    containers: DashMap<Scope, Arc<dyn ScopeContainer>>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, container: Arc<dyn ScopeContainer>) {
        self.containers.insert(container.scope(), container);
    }

    pub fn container_for(&self, scope: Scope) -> Result<Arc<dyn ScopeContainer>, ScopeError> {
        self.containers
            .get(&scope)
            .map(|entry| entry.value().clone())
            .ok_or(ScopeError::NoContainer(scope))
    }

    /// Stop every context in every container, e.g. on runtime shutdown
    pub async fn stop_all(&self) {
        let containers: Vec<_> = self
            .containers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for container in containers {
            container.stop_all_contexts().await;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared scoped-component fake for container tests

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts starts and stops; optionally refuses to start.
    pub struct CountingComponent {
        uri: ComponentUri,
        deployable: DeployableId,
        eager: bool,
        fail_start: bool,
        pub starts: AtomicUsize,
        pub stops: AtomicUsize,
    }

    impl CountingComponent {
        pub fn new(uri: &str, deployable: &str) -> Arc<Self> {
            Arc::new(Self {
                uri: ComponentUri::new(uri),
                deployable: DeployableId::new(deployable),
                eager: true,
                fail_start: false,
                starts: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
            })
        }

        pub fn lazy(uri: &str, deployable: &str) -> Arc<Self> {
            Arc::new(Self {
                eager: false,
                ..Self::template(uri, deployable)
            })
        }

        pub fn failing(uri: &str, deployable: &str) -> Arc<Self> {
            Arc::new(Self {
                fail_start: true,
                ..Self::template(uri, deployable)
            })
        }

        fn template(uri: &str, deployable: &str) -> Self {
            Self {
                uri: ComponentUri::new(uri),
                deployable: DeployableId::new(deployable),
                eager: true,
                fail_start: false,
                starts: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
            }
        }

        pub fn start_count(&self) -> usize {
            self.starts.load(Ordering::SeqCst)
        }

        pub fn stop_count(&self) -> usize {
            self.stops.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScopedComponent for CountingComponent {
        fn uri(&self) -> &ComponentUri {
            &self.uri
        }

        fn deployable(&self) -> &DeployableId {
            &self.deployable
        }

        fn eager_init(&self) -> bool {
            self.eager
        }

        async fn start(&self) -> Result<(), ScopeError> {
            if self.fail_start {
                return Err(ScopeError::Component {
                    uri: self.uri.clone(),
                    reason: "start refused".into(),
                });
            }
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> Result<(), ScopeError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
