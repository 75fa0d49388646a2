//! Built-in executors for the core command set
//!
//! Artifact-specific concerns (classloading, transport wiring) stay behind
//! the collaborator traits; these executors translate commands into
//! collaborator and scope container calls.

use crate::error::ExecutionError;
use crate::executor::{CommandExecutor, CommandExecutorRegistry};
use crate::scope::{ScopeRegistry, ScopedComponent};
use async_trait::async_trait;
use loom_types::{Command, CommandKind, ComponentSnapshot, ContributionUri, Wire};
use std::sync::Arc;

/// Builds runtime component instances from physical snapshots.
///
/// Implemented by the external introspection/builder layer.
#[async_trait]
pub trait ComponentBuilder: Send + Sync {
    async fn build(
        &self,
        component: &ComponentSnapshot,
    ) -> Result<Arc<dyn ScopedComponent>, ExecutionError>;

    async fn dispose(&self, component: &ComponentSnapshot) -> Result<(), ExecutionError>;
}

/// Attaches and detaches wires between deployed components.
///
/// Implemented by binding-specific transports.
#[async_trait]
pub trait WireAttacher: Send + Sync {
    async fn attach(&self, wire: &Wire) -> Result<(), ExecutionError>;

    async fn detach(&self, wire: &Wire) -> Result<(), ExecutionError>;
}

/// Provisions contribution artifacts into the local runtime.
///
/// Implemented by the external contribution store.
#[async_trait]
pub trait ContributionProcessor: Send + Sync {
    async fn provision(&self, uri: &ContributionUri) -> Result<(), ExecutionError>;

    async fn unprovision(&self, uri: &ContributionUri) -> Result<(), ExecutionError>;
}

/// Builds the component and registers it with its scope container
pub struct BuildComponentExecutor {
    builder: Arc<dyn ComponentBuilder>,
    scopes: Arc<ScopeRegistry>,
}

#[async_trait]
impl CommandExecutor for BuildComponentExecutor {
    async fn execute(&self, command: &Command) -> Result<(), ExecutionError> {
        let Command::Build { component } = command else {
            return Err(ExecutionError::UnexpectedCommand(command.kind()));
        };
        let instance = self.builder.build(component).await?;
        self.scopes.container_for(component.scope)?.register(instance);
        Ok(())
    }
}

/// Unregisters the component and releases its resources
pub struct DisposeComponentExecutor {
    builder: Arc<dyn ComponentBuilder>,
    scopes: Arc<ScopeRegistry>,
}

#[async_trait]
impl CommandExecutor for DisposeComponentExecutor {
    async fn execute(&self, command: &Command) -> Result<(), ExecutionError> {
        let Command::Dispose { component } = command else {
            return Err(ExecutionError::UnexpectedCommand(command.kind()));
        };
        self.scopes
            .container_for(component.scope)?
            .unregister(&component.uri);
        self.builder.dispose(component).await
    }
}

/// Activates the component's context through its scope container
pub struct StartComponentExecutor {
    scopes: Arc<ScopeRegistry>,
}

#[async_trait]
impl CommandExecutor for StartComponentExecutor {
    async fn execute(&self, command: &Command) -> Result<(), ExecutionError> {
        let Command::StartComponent { component } = command else {
            return Err(ExecutionError::UnexpectedCommand(command.kind()));
        };
        self.scopes
            .container_for(component.scope)?
            .start_context(&component.deployable)
            .await?;
        Ok(())
    }
}

/// Deactivates the component's context through its scope container
pub struct StopComponentExecutor {
    scopes: Arc<ScopeRegistry>,
}

#[async_trait]
impl CommandExecutor for StopComponentExecutor {
    async fn execute(&self, command: &Command) -> Result<(), ExecutionError> {
        let Command::StopComponent { component } = command else {
            return Err(ExecutionError::UnexpectedCommand(command.kind()));
        };
        self.scopes
            .container_for(component.scope)?
            .stop_context(&component.deployable)
            .await?;
        Ok(())
    }
}

/// Applies an attach/detach bundle. Detach legs run before attach legs so a
/// reconfiguration never holds duplicate bindings, even transiently.
pub struct ConnectionExecutor {
    attacher: Arc<dyn WireAttacher>,
}

#[async_trait]
impl CommandExecutor for ConnectionExecutor {
    async fn execute(&self, command: &Command) -> Result<(), ExecutionError> {
        let Command::Connect(connection) = command else {
            return Err(ExecutionError::UnexpectedCommand(command.kind()));
        };
        for wire in &connection.detach {
            self.attacher.detach(wire).await?;
        }
        for wire in &connection.attach {
            self.attacher.attach(wire).await?;
        }
        Ok(())
    }
}

/// Handles both provision and unprovision contribution commands
pub struct ContributionExecutor {
    processor: Arc<dyn ContributionProcessor>,
}

#[async_trait]
impl CommandExecutor for ContributionExecutor {
    async fn execute(&self, command: &Command) -> Result<(), ExecutionError> {
        match command {
            Command::ProvisionContribution { uri, .. } => self.processor.provision(uri).await,
            Command::UnprovisionContribution { uri, .. } => self.processor.unprovision(uri).await,
            other => Err(ExecutionError::UnexpectedCommand(other.kind())),
        }
    }
}

/// Register the built-in executor for every core command kind
pub fn register_core_executors(
    registry: &CommandExecutorRegistry,
    builder: Arc<dyn ComponentBuilder>,
    attacher: Arc<dyn WireAttacher>,
    processor: Arc<dyn ContributionProcessor>,
    scopes: Arc<ScopeRegistry>,
) {
    registry.register(
        CommandKind::Build,
        Arc::new(BuildComponentExecutor {
            builder: builder.clone(),
            scopes: scopes.clone(),
        }),
    );
    registry.register(
        CommandKind::Dispose,
        Arc::new(DisposeComponentExecutor {
            builder,
            scopes: scopes.clone(),
        }),
    );
    registry.register(
        CommandKind::StartComponent,
        Arc::new(StartComponentExecutor {
            scopes: scopes.clone(),
        }),
    );
    registry.register(
        CommandKind::StopComponent,
        Arc::new(StopComponentExecutor { scopes }),
    );
    registry.register(
        CommandKind::Connect,
        Arc::new(ConnectionExecutor { attacher }),
    );
    let contributions = Arc::new(ContributionExecutor { processor });
    registry.register(CommandKind::ProvisionContribution, contributions.clone());
    registry.register(CommandKind::UnprovisionContribution, contributions);
}
