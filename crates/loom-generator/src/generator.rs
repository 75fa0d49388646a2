//! Deployment generation
//!
//! Walks the logical tree and emits, per zone, the ordered command list for
//! the requested mode:
//!
//! - INCREMENTAL: provisions, builds (parents first), attaches, starts
//! - UNDEPLOY: stops (children first), detaches, disposes, unprovisions
//! - FULL: every component regardless of state, in build/start direction,
//!   for zone-recovery snapshots

use crate::collator::{ContributionCollator, ContributionResolver};
use crate::error::{GenerationError, Result};
use loom_types::{
    Command, ComponentSnapshot, ConnectionCommand, Deployment, DeploymentPlan, GenerationMode,
    LifecycleState, LogicalComponent, Wire, ZoneId,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Produces per-zone command lists by diffing the logical model
pub struct DeploymentGenerator {
    collator: ContributionCollator,
}

impl DeploymentGenerator {
    pub fn new(resolver: Arc<dyn ContributionResolver>) -> Self {
        Self {
            collator: ContributionCollator::new(resolver),
        }
    }

    /// Generate the command lists for one mode.
    ///
    /// A failed pass returns the error and nothing else; no partial
    /// deployment escapes.
    pub fn generate(&self, root: &LogicalComponent, mode: GenerationMode) -> Result<Deployment> {
        validate_states(root)?;
        self.generate_validated(root, mode)
    }

    /// Generate the incremental and full views from one pass over the model
    pub fn plan(&self, root: &LogicalComponent) -> Result<DeploymentPlan> {
        validate_states(root)?;
        Ok(DeploymentPlan {
            incremental: self.generate_validated(root, GenerationMode::Incremental)?,
            full: self.generate_validated(root, GenerationMode::Full)?,
        })
    }

    fn generate_validated(
        &self,
        root: &LogicalComponent,
        mode: GenerationMode,
    ) -> Result<Deployment> {
        let selects = |c: &LogicalComponent| match mode {
            GenerationMode::Incremental => c.state() == LifecycleState::New,
            GenerationMode::Undeploy => c.state() == LifecycleState::Marked,
            GenerationMode::Full => true,
        };

        // Pre-order puts parents before children; zone buckets keep the
        // traversal order within each zone.
        let mut by_zone: BTreeMap<ZoneId, Vec<&LogicalComponent>> = BTreeMap::new();
        for component in root.pre_order() {
            if component.uri() == root.uri() || !selects(component) {
                continue;
            }
            by_zone
                .entry(component.zone().clone())
                .or_default()
                .push(component);
        }

        let mut deployment = Deployment::new();
        for (zone, selected) in &by_zone {
            debug!(zone = %zone, components = selected.len(), ?mode, "Generating zone command list");
            match mode {
                GenerationMode::Incremental | GenerationMode::Full => {
                    self.generate_deploy(&mut deployment, zone, selected)?;
                }
                GenerationMode::Undeploy => {
                    self.generate_undeploy(&mut deployment, zone, selected)?;
                }
            }
        }
        Ok(deployment)
    }

    fn generate_deploy(
        &self,
        deployment: &mut Deployment,
        zone: &ZoneId,
        selected: &[&LogicalComponent],
    ) -> Result<()> {
        for uri in self.collator.collate(selected)? {
            deployment.push(Command::ProvisionContribution {
                zone: zone.clone(),
                uri,
            });
        }
        for component in selected {
            deployment.push(Command::Build {
                component: snapshot(component),
            });
        }
        let wires = collect_wires(selected);
        if !wires.is_empty() {
            deployment.push(Command::Connect(ConnectionCommand::attach_only(
                zone.clone(),
                wires,
            )));
        }
        for component in selected {
            deployment.push(Command::StartComponent {
                component: snapshot(component),
            });
        }
        Ok(())
    }

    fn generate_undeploy(
        &self,
        deployment: &mut Deployment,
        zone: &ZoneId,
        selected: &[&LogicalComponent],
    ) -> Result<()> {
        // Children stop and dispose before their parents: a composite's
        // context cannot be stopped while children are still active.
        let reversed: Vec<&LogicalComponent> = selected.iter().rev().copied().collect();
        for component in &reversed {
            deployment.push(Command::StopComponent {
                component: snapshot(component),
            });
        }
        let mut wires = collect_wires(selected);
        if !wires.is_empty() {
            wires.reverse();
            deployment.push(Command::Connect(ConnectionCommand::detach_only(
                zone.clone(),
                wires,
            )));
        }
        for component in &reversed {
            deployment.push(Command::Dispose {
                component: snapshot(component),
            });
        }
        let mut contributions = self.collator.collate(selected)?;
        contributions.reverse();
        for uri in contributions {
            deployment.push(Command::UnprovisionContribution {
                zone: zone.clone(),
                uri,
            });
        }
        Ok(())
    }
}

fn snapshot(component: &LogicalComponent) -> ComponentSnapshot {
    ComponentSnapshot {
        uri: component.uri().clone(),
        deployable: component.deployable().clone(),
        zone: component.zone().clone(),
        scope: component.scope(),
    }
}

fn collect_wires(selected: &[&LogicalComponent]) -> Vec<Wire> {
    selected
        .iter()
        .flat_map(|component| {
            component.wire_targets().iter().map(|target| Wire {
                source: component.uri().clone(),
                target: target.clone(),
            })
        })
        .collect()
}

fn validate_states(component: &LogicalComponent) -> Result<()> {
    for child in component.children() {
        if component.state() == LifecycleState::Marked && child.state() == LifecycleState::New {
            return Err(GenerationError::InvalidStateCombination {
                parent: component.uri().clone(),
                child: child.uri().clone(),
            });
        }
        validate_states(child)?;
    }
    Ok(())
}
