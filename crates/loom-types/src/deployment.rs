//! Deployments: per-zone ordered command lists
//!
//! A deployment carries either the incremental change set for the current
//! operation or the full change set needed to bring a fresh zone member up
//! to the current state. A [`DeploymentPlan`] holds both views, produced by
//! one generation pass, so they cannot drift apart.

use crate::command::Command;
use crate::ids::{DeploymentId, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a generation pass should select from the logical model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationMode {
    /// Only NEW components: the build/start path
    Incremental,
    /// Every component regardless of state: the zone-recovery snapshot
    Full,
    /// Only MARKED components: the stop/dispose path
    Undeploy,
}

/// Ordered command list for one zone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentUnit {
    commands: Vec<Command>,
}

impl DeploymentUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn extend(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.commands.extend(commands);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A change set as per-zone ordered command lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    units: BTreeMap<ZoneId, DeploymentUnit>,
}

impl Deployment {
    pub fn new() -> Self {
        Self {
            id: DeploymentId::generate(),
            created_at: chrono::Utc::now(),
            units: BTreeMap::new(),
        }
    }

    /// Append a command to its zone's unit, creating the unit on first use
    pub fn push(&mut self, command: Command) {
        self.units
            .entry(command.zone().clone())
            .or_default()
            .push(command);
    }

    pub fn unit_for(&self, zone: &ZoneId) -> Option<&DeploymentUnit> {
        self.units.get(zone)
    }

    pub fn zones(&self) -> impl Iterator<Item = &ZoneId> {
        self.units.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ZoneId, &DeploymentUnit)> {
        self.units.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.units.values().all(|u| u.is_empty())
    }
}

impl Default for Deployment {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental and full views of the same generation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentPlan {
    /// Change set for the current operation
    pub incremental: Deployment,
    /// Snapshot bringing an empty zone member to the same end state
    pub full: Deployment,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ContributionUri;

    fn provision(zone: &str, uri: &str) -> Command {
        Command::ProvisionContribution {
            zone: ZoneId::new(zone),
            uri: ContributionUri::new(uri),
        }
    }

    #[test]
    fn test_push_groups_by_zone_preserving_order() {
        let mut deployment = Deployment::new();
        deployment.push(provision("zone1", "contribution://a"));
        deployment.push(provision("zone2", "contribution://b"));
        deployment.push(provision("zone1", "contribution://c"));

        let unit = deployment.unit_for(&ZoneId::new("zone1")).unwrap();
        assert_eq!(unit.len(), 2);
        assert_eq!(
            unit.commands()[0],
            provision("zone1", "contribution://a")
        );
        assert_eq!(
            unit.commands()[1],
            provision("zone1", "contribution://c")
        );

        let zones: Vec<_> = deployment.zones().map(|z| z.as_str().to_string()).collect();
        assert_eq!(zones, vec!["zone1", "zone2"]);
    }

    #[test]
    fn test_empty_deployment() {
        let deployment = Deployment::new();
        assert!(deployment.is_empty());
        assert!(deployment.unit_for(&ZoneId::new("zone1")).is_none());
    }
}
