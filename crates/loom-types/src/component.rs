//! Logical component tree and lifecycle states
//!
//! The logical model is a tree of components rooted at the domain composite.
//! An external model builder produces subtrees with states already set; the
//! generators diff the tree and the domain commits state transitions once a
//! change set has been applied.

use crate::ids::{ComponentUri, ContributionUri, DeployableId, ZoneId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a logical component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Present in the model but not yet deployed
    New,
    /// Deployed to its assigned zone
    Provisioned,
    /// Scheduled for undeployment
    Marked,
}

/// Instance lifecycle scope of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// No shared instance; a fresh instance per request
    Stateless,
    /// One instance group per deployable
    Composite,
    /// At most one active instance cluster-wide, hosted by the zone leader
    Domain,
}

/// Errors raised by illegal lifecycle transitions
#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid lifecycle transition for {uri}: {from:?} -> {to:?}")]
    InvalidTransition {
        uri: ComponentUri,
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("zone of {0} is fixed once provisioned; redeploy via mark first")]
    ZoneFixed(ComponentUri),
}

/// A node in the logical composite tree.
///
/// A component owning children is a composite; the domain root is a composite
/// with no parent. Ownership is strictly downward and identity is by URI, so
/// no parent back-pointers are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalComponent {
    uri: ComponentUri,
    zone: ZoneId,
    deployable: DeployableId,
    scope: Scope,
    state: LifecycleState,
    contribution: Option<ContributionUri>,
    wire_targets: Vec<ComponentUri>,
    children: Vec<LogicalComponent>,
}

impl LogicalComponent {
    /// Create a component in the NEW state with no children
    pub fn new(
        uri: ComponentUri,
        zone: ZoneId,
        deployable: DeployableId,
        scope: Scope,
    ) -> Self {
        Self {
            uri,
            zone,
            deployable,
            scope,
            state: LifecycleState::New,
            contribution: None,
            wire_targets: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create the distinguished domain root composite.
    ///
    /// The root itself is never deployed, so it is born PROVISIONED.
    pub fn domain_root(uri: ComponentUri) -> Self {
        Self {
            uri,
            zone: ZoneId::new("domain"),
            deployable: DeployableId::new("domain"),
            scope: Scope::Composite,
            state: LifecycleState::Provisioned,
            contribution: None,
            wire_targets: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set the contribution this component was introduced by
    pub fn with_contribution(mut self, contribution: ContributionUri) -> Self {
        self.contribution = Some(contribution);
        self
    }

    /// Add a wire from this component to a target component
    pub fn with_wire(mut self, target: ComponentUri) -> Self {
        self.wire_targets.push(target);
        self
    }

    pub fn uri(&self) -> &ComponentUri {
        &self.uri
    }

    pub fn zone(&self) -> &ZoneId {
        &self.zone
    }

    pub fn deployable(&self) -> &DeployableId {
        &self.deployable
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn contribution(&self) -> Option<&ContributionUri> {
        self.contribution.as_ref()
    }

    pub fn wire_targets(&self) -> &[ComponentUri] {
        &self.wire_targets
    }

    pub fn children(&self) -> &[LogicalComponent] {
        &self.children
    }

    pub fn is_composite(&self) -> bool {
        !self.children.is_empty()
    }

    /// Take exclusive ownership of a child component
    pub fn add_child(&mut self, child: LogicalComponent) {
        self.children.push(child);
    }

    /// Reassign the zone. Only legal before the component is provisioned.
    pub fn assign_zone(&mut self, zone: ZoneId) -> Result<(), StateError> {
        if self.state != LifecycleState::New {
            return Err(StateError::ZoneFixed(self.uri.clone()));
        }
        self.zone = zone;
        Ok(())
    }

    /// Transition NEW -> PROVISIONED
    pub fn provision(&mut self) -> Result<(), StateError> {
        match self.state {
            LifecycleState::New => {
                self.state = LifecycleState::Provisioned;
                Ok(())
            }
            from => Err(StateError::InvalidTransition {
                uri: self.uri.clone(),
                from,
                to: LifecycleState::Provisioned,
            }),
        }
    }

    /// Transition PROVISIONED -> MARKED. A NEW component can never be marked.
    pub fn mark(&mut self) -> Result<(), StateError> {
        match self.state {
            LifecycleState::Provisioned => {
                self.state = LifecycleState::Marked;
                Ok(())
            }
            from => Err(StateError::InvalidTransition {
                uri: self.uri.clone(),
                from,
                to: LifecycleState::Marked,
            }),
        }
    }

    /// Find a component in this subtree by URI
    pub fn find(&self, uri: &ComponentUri) -> Option<&LogicalComponent> {
        if &self.uri == uri {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(uri))
    }

    /// Find a component in this subtree by URI, mutably
    pub fn find_mut(&mut self, uri: &ComponentUri) -> Option<&mut LogicalComponent> {
        if &self.uri == uri {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(uri))
    }

    /// This subtree in pre-order: parents before children
    pub fn pre_order(&self) -> Vec<&LogicalComponent> {
        let mut out = Vec::new();
        self.collect_pre_order(&mut out);
        out
    }

    fn collect_pre_order<'a>(&'a self, out: &mut Vec<&'a LogicalComponent>) {
        out.push(self);
        for child in &self.children {
            child.collect_pre_order(out);
        }
    }

    /// This subtree in post-order: children before parents
    pub fn post_order(&self) -> Vec<&LogicalComponent> {
        let mut out = Vec::new();
        self.collect_post_order(&mut out);
        out
    }

    fn collect_post_order<'a>(&'a self, out: &mut Vec<&'a LogicalComponent>) {
        for child in &self.children {
            child.collect_post_order(out);
        }
        out.push(self);
    }

    /// Mark every PROVISIONED component of a deployable for undeployment.
    ///
    /// Returns how many components were marked. NEW components of the
    /// deployable are an error: they were never deployed.
    pub fn mark_deployable(&mut self, deployable: &DeployableId) -> Result<usize, StateError> {
        let mut marked = 0;
        self.mark_deployable_inner(deployable, &mut marked)?;
        Ok(marked)
    }

    fn mark_deployable_inner(
        &mut self,
        deployable: &DeployableId,
        marked: &mut usize,
    ) -> Result<(), StateError> {
        // Children first so a failure surfaces the deepest offender.
        for child in &mut self.children {
            child.mark_deployable_inner(deployable, marked)?;
        }
        if &self.deployable == deployable && self.state != LifecycleState::Marked {
            self.mark()?;
            *marked += 1;
        }
        Ok(())
    }

    /// Commit a successful deploy: every NEW component becomes PROVISIONED
    pub fn mark_provisioned(&mut self) {
        if self.state == LifecycleState::New {
            self.state = LifecycleState::Provisioned;
        }
        for child in &mut self.children {
            child.mark_provisioned();
        }
    }

    /// Revert a failed undeploy: every MARKED component becomes PROVISIONED again
    pub fn restore_marked(&mut self) {
        if self.state == LifecycleState::Marked {
            self.state = LifecycleState::Provisioned;
        }
        for child in &mut self.children {
            child.restore_marked();
        }
    }

    /// Commit a successful undeploy: prune every MARKED subtree.
    ///
    /// Returns how many components were removed. Children of a removed
    /// composite are destroyed with it.
    pub fn collect_marked(&mut self) -> usize {
        let mut removed = 0;
        self.children.retain(|child| {
            if child.state == LifecycleState::Marked {
                removed += child.pre_order().len();
                false
            } else {
                true
            }
        });
        for child in &mut self.children {
            removed += child.collect_marked();
        }
        removed
    }
}
