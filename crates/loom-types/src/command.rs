//! Serializable deployment commands and their compensation
//!
//! Commands are the unit of work shipped to a zone. Every command can produce
//! a compensating command that, executed immediately after the original,
//! restores the prior observable state. Connection bundles reverse both the
//! sub-command direction (attach <-> detach) and the sub-command order when
//! compensating.

use crate::component::Scope;
use crate::ids::{ComponentUri, ContributionUri, DeployableId, ZoneId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical view of a component carried by build/start/stop/dispose commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    pub uri: ComponentUri,
    pub deployable: DeployableId,
    pub zone: ZoneId,
    pub scope: Scope,
}

/// A single wire between a source and a target component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    pub source: ComponentUri,
    pub target: ComponentUri,
}

/// Ordered attach/detach bundle for one reconfiguration.
///
/// Detach legs always execute before attach legs so a reconfiguration never
/// holds duplicate bindings, even transiently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionCommand {
    pub zone: ZoneId,
    pub attach: Vec<Wire>,
    pub detach: Vec<Wire>,
}

impl ConnectionCommand {
    pub fn attach_only(zone: ZoneId, attach: Vec<Wire>) -> Self {
        Self {
            zone,
            attach,
            detach: Vec::new(),
        }
    }

    pub fn detach_only(zone: ZoneId, detach: Vec<Wire>) -> Self {
        Self {
            zone,
            attach: Vec::new(),
            detach,
        }
    }

    /// The inverse bundle: attach and detach legs swap AND each list is
    /// reversed, so undoing replays the bundle's effects backwards.
    pub fn compensating(&self) -> ConnectionCommand {
        ConnectionCommand {
            zone: self.zone.clone(),
            attach: self.detach.iter().rev().cloned().collect(),
            detach: self.attach.iter().rev().cloned().collect(),
        }
    }
}

/// Dispatch tag identifying a command's concrete kind.
///
/// Executors are registered against kinds; dispatch never inspects the
/// runtime type of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    ProvisionContribution,
    UnprovisionContribution,
    Build,
    Dispose,
    Connect,
    StartComponent,
    StopComponent,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::ProvisionContribution => "provision-contribution",
            CommandKind::UnprovisionContribution => "unprovision-contribution",
            CommandKind::Build => "build",
            CommandKind::Dispose => "dispose",
            CommandKind::Connect => "connect",
            CommandKind::StartComponent => "start-component",
            CommandKind::StopComponent => "stop-component",
        };
        write!(f, "{}", name)
    }
}

/// An atomic, serializable unit of deployment work targeted at one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Make a contribution's artifacts available in the zone
    ProvisionContribution {
        zone: ZoneId,
        uri: ContributionUri,
    },

    /// Remove a contribution's artifacts from the zone
    UnprovisionContribution {
        zone: ZoneId,
        uri: ContributionUri,
    },

    /// Construct the runtime component and register it with its scope container
    Build { component: ComponentSnapshot },

    /// Unregister the runtime component and release its resources
    Dispose { component: ComponentSnapshot },

    /// Apply an attach/detach wire bundle
    Connect(ConnectionCommand),

    /// Activate the component's context through its scope container
    StartComponent { component: ComponentSnapshot },

    /// Deactivate the component's context through its scope container
    StopComponent { component: ComponentSnapshot },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::ProvisionContribution { .. } => CommandKind::ProvisionContribution,
            Command::UnprovisionContribution { .. } => CommandKind::UnprovisionContribution,
            Command::Build { .. } => CommandKind::Build,
            Command::Dispose { .. } => CommandKind::Dispose,
            Command::Connect(_) => CommandKind::Connect,
            Command::StartComponent { .. } => CommandKind::StartComponent,
            Command::StopComponent { .. } => CommandKind::StopComponent,
        }
    }

    pub fn zone(&self) -> &ZoneId {
        match self {
            Command::ProvisionContribution { zone, .. } => zone,
            Command::UnprovisionContribution { zone, .. } => zone,
            Command::Build { component } => &component.zone,
            Command::Dispose { component } => &component.zone,
            Command::Connect(connection) => &connection.zone,
            Command::StartComponent { component } => &component.zone,
            Command::StopComponent { component } => &component.zone,
        }
    }

    /// The command that undoes this one when executed immediately after it
    pub fn compensating(&self) -> Command {
        match self {
            Command::ProvisionContribution { zone, uri } => Command::UnprovisionContribution {
                zone: zone.clone(),
                uri: uri.clone(),
            },
            Command::UnprovisionContribution { zone, uri } => Command::ProvisionContribution {
                zone: zone.clone(),
                uri: uri.clone(),
            },
            Command::Build { component } => Command::Dispose {
                component: component.clone(),
            },
            Command::Dispose { component } => Command::Build {
                component: component.clone(),
            },
            Command::Connect(connection) => Command::Connect(connection.compensating()),
            Command::StartComponent { component } => Command::StopComponent {
                component: component.clone(),
            },
            Command::StopComponent { component } => Command::StartComponent {
                component: component.clone(),
            },
        }
    }
}
