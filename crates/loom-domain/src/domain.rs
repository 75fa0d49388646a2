//! Domain facade
//!
//! The domain owns the logical model and drives generation + execution
//! cycles. Zones apply their units concurrently; when any zone fails, zones
//! that already applied are compensated so the caller always learns whether
//! the cluster is back in its original state or degraded.

use crate::error::DomainError;
use crate::events::{DomainEvent, DomainEventEnvelope};
use crate::gateway::ZoneGateway;
use dashmap::DashMap;
use loom_generator::DeploymentGenerator;
use loom_runtime::ApplyError;
use loom_types::{
    ComponentUri, Deployment, DeploymentId, DeploymentUnit, DeployableId, GenerationMode,
    LifecycleState, LogicalComponent, ZoneId,
};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Domain configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DomainConfig {
    /// Capacity of the domain event broadcast channel
    pub event_channel_capacity: usize,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 4096,
        }
    }
}

/// The outward-facing deployment API.
///
/// `deploy` and `undeploy` return synchronously after the change set has
/// been fully applied or rolled back.
pub struct Domain {
    model: RwLock<LogicalComponent>,
    // FULL-mode recovery snapshot, refreshed at each quiescent point
    snapshot: RwLock<Deployment>,
    generator: DeploymentGenerator,
    gateways: DashMap<ZoneId, Arc<dyn ZoneGateway>>,
    event_tx: broadcast::Sender<DomainEventEnvelope>,
}

impl Domain {
    pub fn new(root: ComponentUri, generator: DeploymentGenerator, config: DomainConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);
        Self {
            model: RwLock::new(LogicalComponent::domain_root(root)),
            snapshot: RwLock::new(Deployment::new()),
            generator,
            gateways: DashMap::new(),
            event_tx,
        }
    }

    /// Route a zone's deployment units through a gateway
    pub fn register_zone(&self, zone: ZoneId, gateway: Arc<dyn ZoneGateway>) {
        self.gateways.insert(zone, gateway);
    }

    /// Subscribe to the domain event stream
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEventEnvelope> {
        self.event_tx.subscribe()
    }

    /// Current lifecycle state of a component, if present in the model
    pub async fn component_state(&self, uri: &ComponentUri) -> Option<LifecycleState> {
        self.model.read().await.find(uri).map(|c| c.state())
    }

    /// Admit a NEW subtree into the logical model. The subtree deploys on
    /// the next [`Domain::deploy`] call.
    pub async fn include(&self, component: LogicalComponent) -> Result<(), DomainError> {
        let mut model = self.model.write().await;
        for node in component.pre_order() {
            if node.state() != LifecycleState::New {
                return Err(DomainError::AlreadyDeployed(node.uri().clone()));
            }
            if model.find(node.uri()).is_some() {
                return Err(DomainError::DuplicateUri(node.uri().clone()));
            }
        }
        let uri = component.uri().clone();
        info!(uri = %uri, "Including composite in domain");
        model.add_child(component);
        drop(model);
        self.emit(DomainEvent::Included { component: uri });
        Ok(())
    }

    /// Generate and apply the incremental change set for every NEW
    /// component, committing their states on success.
    #[instrument(skip(self))]
    pub async fn deploy(&self) -> Result<DeploymentId, DomainError> {
        let plan = {
            let model = self.model.read().await;
            self.generator.plan(&model)?
        };
        let id = plan.incremental.id.clone();
        if plan.incremental.is_empty() {
            debug!("Nothing to deploy");
            return Ok(id);
        }
        let zones: Vec<ZoneId> = plan.incremental.zones().cloned().collect();

        if let Err(err) = self.ship(&plan.incremental).await {
            self.emit_failure(&id, &err);
            return Err(err);
        }

        self.model.write().await.mark_provisioned();
        // The full view was generated in the same pass, so after the state
        // commit it is exactly the recovery snapshot for the new state.
        *self.snapshot.write().await = plan.full;

        info!(deployment = %id, zones = zones.len(), "Deployment applied");
        self.emit(DomainEvent::DeploymentCompleted {
            deployment: id.clone(),
            zones,
        });
        Ok(id)
    }

    /// Stop, dispose, and prune every component of a deployable
    #[instrument(skip(self), fields(deployable = %deployable))]
    pub async fn undeploy(&self, deployable: &DeployableId) -> Result<(), DomainError> {
        {
            let mut model = self.model.write().await;
            let marked = model.mark_deployable(deployable)?;
            if marked == 0 {
                return Err(DomainError::UnknownDeployable(deployable.clone()));
            }
        }

        let deployment = {
            let model = self.model.read().await;
            self.generator.generate(&model, GenerationMode::Undeploy)
        };
        let deployment = match deployment {
            Ok(deployment) => deployment,
            Err(err) => {
                self.model.write().await.restore_marked();
                return Err(err.into());
            }
        };

        if let Err(err) = self.ship(&deployment).await {
            self.model.write().await.restore_marked();
            self.emit_failure(&deployment.id, &err);
            return Err(err);
        }

        {
            let mut model = self.model.write().await;
            model.collect_marked();
            *self.snapshot.write().await = self.generator.generate(&model, GenerationMode::Full)?;
        }

        info!("Deployable undeployed");
        self.emit(DomainEvent::Undeployed {
            deployable: deployable.clone(),
        });
        Ok(())
    }

    /// The full command list bringing a new or recovering member of `zone`
    /// up to the current state.
    pub async fn full_deployment_for(&self, zone: &ZoneId) -> DeploymentUnit {
        self.snapshot
            .read()
            .await
            .unit_for(zone)
            .cloned()
            .unwrap_or_default()
    }

    /// Apply a deployment to all its zones concurrently, compensating every
    /// successful zone if any zone fails.
    async fn ship(&self, deployment: &Deployment) -> Result<(), DomainError> {
        let mut routed = Vec::new();
        for (zone, unit) in deployment.iter() {
            if unit.is_empty() {
                continue;
            }
            let gateway = self
                .gateways
                .get(zone)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| DomainError::UnroutableZone(zone.clone()))?;
            routed.push((zone.clone(), gateway, unit));
        }

        let results = futures::future::join_all(routed.iter().map(
            |(zone, gateway, unit)| async move {
                (zone.clone(), gateway.apply(zone, unit.commands()).await)
            },
        ))
        .await;

        let mut failure: Option<(ZoneId, ApplyError)> = None;
        let mut succeeded = Vec::new();
        for (zone, result) in results {
            match result {
                Ok(()) => succeeded.push(zone),
                Err(err) => {
                    if failure.is_some() {
                        error!(zone = %zone, error = %err, "Additional zone failed in the same deployment");
                    } else {
                        failure = Some((zone, err));
                    }
                }
            }
        }
        let Some((zone, source)) = failure else {
            return Ok(());
        };

        warn!(zone = %zone, "Zone failed; compensating peer zones");
        let mut degraded = !source.original_state_restored();
        for (peer, gateway, unit) in &routed {
            if !succeeded.contains(peer) {
                continue;
            }
            let failures = gateway.roll_back(peer, unit.commands()).await;
            if !failures.is_empty() {
                error!(
                    zone = %peer,
                    failures = failures.len(),
                    "Compensation failed while unwinding peer zone"
                );
                degraded = true;
            }
        }

        if degraded {
            Err(DomainError::Degraded { zone, source })
        } else {
            Err(DomainError::RolledBack { zone, source })
        }
    }

    fn emit_failure(&self, deployment: &DeploymentId, err: &DomainError) {
        match err {
            DomainError::RolledBack { zone, .. } => self.emit(DomainEvent::DeploymentRolledBack {
                deployment: deployment.clone(),
                zone: zone.clone(),
            }),
            DomainError::Degraded { zone, .. } => self.emit(DomainEvent::DeploymentDegraded {
                deployment: deployment.clone(),
                zone: zone.clone(),
            }),
            _ => {}
        }
    }

    fn emit(&self, event: DomainEvent) {
        // Nobody listening is fine.
        let _ = self.event_tx.send(DomainEventEnvelope::new(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::LocalZoneGateway;
    use async_trait::async_trait;
    use loom_generator::InMemoryContributionResolver;
    use loom_runtime::{
        register_core_executors, CommandExecutorRegistry, CompensationFailure, ComponentBuilder,
        ContributionProcessor, DomainScopeContainer, ExecutionError, ScopeError, ScopeRegistry,
        ScopedComponent, StatelessScopeContainer, WireAttacher,
    };
    use loom_runtime::CompositeScopeContainer;
    use loom_types::{
        Command, CommandKind, ComponentSnapshot, ContributionUri, Scope, Wire,
    };
    use tokio::sync::Mutex;

    struct RecordingGateway {
        applied: Mutex<Vec<(ZoneId, Vec<CommandKind>)>>,
        rolled_back: Mutex<Vec<ZoneId>>,
        fail_zone: Mutex<Option<ZoneId>>,
    }

    impl RecordingGateway {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                applied: Mutex::new(Vec::new()),
                rolled_back: Mutex::new(Vec::new()),
                fail_zone: Mutex::new(None),
            })
        }

        async fn fail_in(&self, zone: &str) {
            *self.fail_zone.lock().await = Some(ZoneId::new(zone));
        }
    }

    #[async_trait]
    impl ZoneGateway for RecordingGateway {
        async fn apply(&self, zone: &ZoneId, commands: &[Command]) -> Result<(), ApplyError> {
            if self.fail_zone.lock().await.as_ref() == Some(zone) {
                return Err(ApplyError::RolledBack {
                    zone: zone.clone(),
                    index: 0,
                    kind: commands[0].kind(),
                    source: ExecutionError::Build("injected failure".into()),
                });
            }
            self.applied
                .lock()
                .await
                .push((zone.clone(), commands.iter().map(Command::kind).collect()));
            Ok(())
        }

        async fn roll_back(
            &self,
            zone: &ZoneId,
            _applied: &[Command],
        ) -> Vec<CompensationFailure> {
            self.rolled_back.lock().await.push(zone.clone());
            Vec::new()
        }
    }

    fn domain() -> Domain {
        Domain::new(
            ComponentUri::new("domain://"),
            DeploymentGenerator::new(Arc::new(InMemoryContributionResolver::new())),
            DomainConfig::default(),
        )
    }

    fn component(uri: &str, zone: &str, deployable: &str) -> LogicalComponent {
        LogicalComponent::new(
            ComponentUri::new(uri),
            ZoneId::new(zone),
            DeployableId::new(deployable),
            Scope::Composite,
        )
    }

    #[tokio::test]
    async fn test_deploy_commits_states_and_snapshot() {
        let domain = domain();
        let gateway = RecordingGateway::new();
        domain.register_zone(ZoneId::new("zone1"), gateway.clone());
        let mut events = domain.subscribe();

        domain
            .include(component("domain://cart", "zone1", "app"))
            .await
            .unwrap();
        domain.deploy().await.unwrap();

        let applied = gateway.applied.lock().await;
        assert_eq!(applied.len(), 1);
        assert_eq!(
            applied[0].1,
            vec![CommandKind::Build, CommandKind::StartComponent]
        );

        assert_eq!(
            domain
                .component_state(&ComponentUri::new("domain://cart"))
                .await,
            Some(LifecycleState::Provisioned)
        );

        // Recovery snapshot covers the committed state.
        let unit = domain.full_deployment_for(&ZoneId::new("zone1")).await;
        assert_eq!(
            unit.commands().iter().map(Command::kind).collect::<Vec<_>>(),
            vec![CommandKind::Build, CommandKind::StartComponent]
        );

        assert!(matches!(
            events.recv().await.unwrap().event,
            DomainEvent::Included { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap().event,
            DomainEvent::DeploymentCompleted { .. }
        ));
    }

    #[tokio::test]
    async fn test_redeploy_is_incremental() {
        let domain = domain();
        let gateway = RecordingGateway::new();
        domain.register_zone(ZoneId::new("zone1"), gateway.clone());

        domain
            .include(component("domain://cart", "zone1", "app"))
            .await
            .unwrap();
        domain.deploy().await.unwrap();
        domain.deploy().await.unwrap();

        // The second deploy found nothing NEW and shipped nothing.
        assert_eq!(gateway.applied.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_zone_failure_rolls_back_peer_zones() {
        let domain = domain();
        let gateway = RecordingGateway::new();
        gateway.fail_in("zone2").await;
        domain.register_zone(ZoneId::new("zone1"), gateway.clone());
        domain.register_zone(ZoneId::new("zone2"), gateway.clone());

        domain
            .include(component("domain://cart", "zone1", "app"))
            .await
            .unwrap();
        domain
            .include(component("domain://billing", "zone2", "app"))
            .await
            .unwrap();

        let err = domain.deploy().await.unwrap_err();
        assert!(err.original_state_restored());
        assert!(matches!(err, DomainError::RolledBack { ref zone, .. } if zone.as_str() == "zone2"));

        // zone1 applied and was compensated.
        assert_eq!(
            gateway.rolled_back.lock().await.clone(),
            vec![ZoneId::new("zone1")]
        );
        // Nothing was committed.
        assert_eq!(
            domain
                .component_state(&ComponentUri::new("domain://cart"))
                .await,
            Some(LifecycleState::New)
        );
        assert!(domain
            .full_deployment_for(&ZoneId::new("zone1"))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_unroutable_zone_fails_before_any_apply() {
        let domain = domain();
        let gateway = RecordingGateway::new();
        domain.register_zone(ZoneId::new("zone1"), gateway.clone());

        domain
            .include(component("domain://cart", "zone1", "app"))
            .await
            .unwrap();
        domain
            .include(component("domain://billing", "zone2", "app"))
            .await
            .unwrap();

        let err = domain.deploy().await.unwrap_err();
        assert!(matches!(err, DomainError::UnroutableZone(ref zone) if zone.as_str() == "zone2"));
        assert!(gateway.applied.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_undeploy_prunes_model() {
        let domain = domain();
        let gateway = RecordingGateway::new();
        domain.register_zone(ZoneId::new("zone1"), gateway.clone());

        domain
            .include(component("domain://cart", "zone1", "app"))
            .await
            .unwrap();
        domain.deploy().await.unwrap();
        domain.undeploy(&DeployableId::new("app")).await.unwrap();

        let applied = gateway.applied.lock().await;
        assert_eq!(
            applied[1].1,
            vec![CommandKind::StopComponent, CommandKind::Dispose]
        );
        assert_eq!(
            domain
                .component_state(&ComponentUri::new("domain://cart"))
                .await,
            None
        );
        assert!(domain
            .full_deployment_for(&ZoneId::new("zone1"))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_undeploy_unknown_deployable() {
        let domain = domain();
        assert!(matches!(
            domain.undeploy(&DeployableId::new("ghost")).await,
            Err(DomainError::UnknownDeployable(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_undeploy_restores_marks() {
        let domain = domain();
        let gateway = RecordingGateway::new();
        domain.register_zone(ZoneId::new("zone1"), gateway.clone());

        domain
            .include(component("domain://cart", "zone1", "app"))
            .await
            .unwrap();
        domain.deploy().await.unwrap();

        gateway.fail_in("zone1").await;
        let err = domain.undeploy(&DeployableId::new("app")).await.unwrap_err();
        assert!(err.original_state_restored());
        assert_eq!(
            domain
                .component_state(&ComponentUri::new("domain://cart"))
                .await,
            Some(LifecycleState::Provisioned)
        );
    }

    #[tokio::test]
    async fn test_include_rejects_duplicates_and_deployed_states() {
        let domain = domain();
        domain
            .include(component("domain://cart", "zone1", "app"))
            .await
            .unwrap();
        assert!(matches!(
            domain
                .include(component("domain://cart", "zone1", "app"))
                .await,
            Err(DomainError::DuplicateUri(_))
        ));

        let mut provisioned = component("domain://other", "zone1", "app");
        provisioned.provision().unwrap();
        assert!(matches!(
            domain.include(provisioned).await,
            Err(DomainError::AlreadyDeployed(_))
        ));
    }

    // End-to-end through the real runtime: registry, executors, and scope
    // containers behind a local gateway.

    struct InstanceFixture {
        uri: ComponentUri,
        deployable: DeployableId,
    }

    #[async_trait]
    impl ScopedComponent for InstanceFixture {
        fn uri(&self) -> &ComponentUri {
            &self.uri
        }

        fn deployable(&self) -> &DeployableId {
            &self.deployable
        }

        async fn start(&self) -> Result<(), ScopeError> {
            Ok(())
        }

        async fn stop(&self) -> Result<(), ScopeError> {
            Ok(())
        }
    }

    struct FixtureBuilder;

    #[async_trait]
    impl ComponentBuilder for FixtureBuilder {
        async fn build(
            &self,
            component: &ComponentSnapshot,
        ) -> Result<Arc<dyn ScopedComponent>, ExecutionError> {
            Ok(Arc::new(InstanceFixture {
                uri: component.uri.clone(),
                deployable: component.deployable.clone(),
            }))
        }

        async fn dispose(&self, _component: &ComponentSnapshot) -> Result<(), ExecutionError> {
            Ok(())
        }
    }

    struct NoopAttacher;

    #[async_trait]
    impl WireAttacher for NoopAttacher {
        async fn attach(&self, _wire: &Wire) -> Result<(), ExecutionError> {
            Ok(())
        }

        async fn detach(&self, _wire: &Wire) -> Result<(), ExecutionError> {
            Ok(())
        }
    }

    struct NoopProcessor;

    #[async_trait]
    impl ContributionProcessor for NoopProcessor {
        async fn provision(&self, _uri: &ContributionUri) -> Result<(), ExecutionError> {
            Ok(())
        }

        async fn unprovision(&self, _uri: &ContributionUri) -> Result<(), ExecutionError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_deploy_through_local_runtime() {
        let registry = Arc::new(CommandExecutorRegistry::new());
        let scopes = Arc::new(ScopeRegistry::new());
        scopes.register(Arc::new(StatelessScopeContainer::new()));
        scopes.register(Arc::new(CompositeScopeContainer::new()));
        scopes.register(DomainScopeContainer::new(None));
        register_core_executors(
            &registry,
            Arc::new(FixtureBuilder),
            Arc::new(NoopAttacher),
            Arc::new(NoopProcessor),
            scopes.clone(),
        );

        let domain = domain();
        domain.register_zone(
            ZoneId::new("zone1"),
            Arc::new(LocalZoneGateway::new(registry)),
        );

        domain
            .include(component("domain://cart", "zone1", "app"))
            .await
            .unwrap();
        domain.deploy().await.unwrap();

        let container = scopes.container_for(Scope::Composite).unwrap();
        let instance = container
            .get_instance(&ComponentUri::new("domain://cart"))
            .await
            .unwrap();
        assert_eq!(instance.deployable(), &DeployableId::new("app"));

        domain.undeploy(&DeployableId::new("app")).await.unwrap();
        assert!(matches!(
            container
                .get_instance(&ComponentUri::new("domain://cart"))
                .await,
            Err(ScopeError::UnknownComponent(_))
        ));
    }
}
