//! Contribution collation
//!
//! Computes the transitive closure of code contributions a zone needs before
//! its components can be built, following declared import edges only. The
//! host and boot contributions ship with every runtime and are never
//! collated.

use crate::error::{GenerationError, Result};
use loom_types::{ContributionUri, LogicalComponent};
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// URI of the host contribution implicitly present in every runtime
pub const HOST_CONTRIBUTION: &str = "contribution://runtime/host";

/// URI of the boot contribution implicitly present in every runtime
pub const BOOT_CONTRIBUTION: &str = "contribution://runtime/boot";

/// Resolved contribution metadata: the declared import edges only
#[derive(Debug, Clone)]
pub struct Contribution {
    pub uri: ContributionUri,
    pub imports: Vec<ContributionUri>,
}

impl Contribution {
    pub fn new(uri: ContributionUri) -> Self {
        Self {
            uri,
            imports: Vec::new(),
        }
    }

    pub fn with_import(mut self, import: ContributionUri) -> Self {
        self.imports.push(import);
        self
    }
}

/// Resolves contribution metadata for the collator.
///
/// Implemented by the external contribution store; an unresolvable URI fails
/// the whole generation pass.
pub trait ContributionResolver: Send + Sync {
    fn resolve(&self, uri: &ContributionUri) -> Option<Contribution>;
}

/// In-memory resolver for development and tests
#[derive(Default)]
pub struct InMemoryContributionResolver {
    contributions: HashMap<ContributionUri, Contribution>,
}

impl InMemoryContributionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, contribution: Contribution) {
        self.contributions
            .insert(contribution.uri.clone(), contribution);
    }
}

impl ContributionResolver for InMemoryContributionResolver {
    fn resolve(&self, uri: &ContributionUri) -> Option<Contribution> {
        self.contributions.get(uri).cloned()
    }
}

/// Computes the contribution closure for a set of affected components
pub struct ContributionCollator {
    resolver: Arc<dyn ContributionResolver>,
}

impl ContributionCollator {
    pub fn new(resolver: Arc<dyn ContributionResolver>) -> Self {
        Self { resolver }
    }

    /// Transitive closure of the contributions required by `components`,
    /// de-duplicated, in first-seen order. Host and boot never appear.
    pub fn collate(&self, components: &[&LogicalComponent]) -> Result<Vec<ContributionUri>> {
        let mut ordered = Vec::new();
        let mut visited = HashSet::new();
        for component in components {
            if let Some(uri) = component.contribution() {
                self.visit(uri, &mut visited, &mut ordered)?;
            }
        }
        Ok(ordered)
    }

    fn visit(
        &self,
        uri: &ContributionUri,
        visited: &mut HashSet<ContributionUri>,
        ordered: &mut Vec<ContributionUri>,
    ) -> Result<()> {
        if uri.as_str() == HOST_CONTRIBUTION || uri.as_str() == BOOT_CONTRIBUTION {
            return Ok(());
        }
        // Marking before descending keeps import cycles finite.
        if !visited.insert(uri.clone()) {
            return Ok(());
        }
        let contribution = self
            .resolver
            .resolve(uri)
            .ok_or_else(|| GenerationError::UnresolvedContribution(uri.clone()))?;
        ordered.push(contribution.uri.clone());
        for import in &contribution.imports {
            self.visit(import, visited, ordered)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_types::{ComponentUri, DeployableId, Scope, ZoneId};

    fn component_with(contribution: &str) -> LogicalComponent {
        LogicalComponent::new(
            ComponentUri::new(format!("domain://{contribution}")),
            ZoneId::new("zone1"),
            DeployableId::new("app"),
            Scope::Composite,
        )
        .with_contribution(ContributionUri::new(contribution))
    }

    fn collator(contributions: Vec<Contribution>) -> ContributionCollator {
        let mut resolver = InMemoryContributionResolver::new();
        for c in contributions {
            resolver.insert(c);
        }
        ContributionCollator::new(Arc::new(resolver))
    }

    #[test]
    fn test_transitive_imports_deduplicated() {
        let shared = ContributionUri::new("contribution://shared");
        let collator = collator(vec![
            Contribution::new(ContributionUri::new("contribution://a"))
                .with_import(shared.clone()),
            Contribution::new(ContributionUri::new("contribution://b"))
                .with_import(shared.clone()),
            Contribution::new(shared.clone()),
        ]);

        let a = component_with("contribution://a");
        let b = component_with("contribution://b");
        let closure = collator.collate(&[&a, &b]).unwrap();
        assert_eq!(
            closure,
            vec![
                ContributionUri::new("contribution://a"),
                shared,
                ContributionUri::new("contribution://b"),
            ]
        );
    }

    #[test]
    fn test_import_cycles_terminate() {
        let collator = collator(vec![
            Contribution::new(ContributionUri::new("contribution://a"))
                .with_import(ContributionUri::new("contribution://b")),
            Contribution::new(ContributionUri::new("contribution://b"))
                .with_import(ContributionUri::new("contribution://a")),
        ]);

        let a = component_with("contribution://a");
        let closure = collator.collate(&[&a]).unwrap();
        assert_eq!(closure.len(), 2);
    }

    #[test]
    fn test_host_and_boot_excluded() {
        let collator = collator(vec![Contribution::new(ContributionUri::new(
            "contribution://a",
        ))
        .with_import(ContributionUri::new(HOST_CONTRIBUTION))
        .with_import(ContributionUri::new(BOOT_CONTRIBUTION))]);

        let a = component_with("contribution://a");
        let closure = collator.collate(&[&a]).unwrap();
        assert_eq!(closure, vec![ContributionUri::new("contribution://a")]);
    }

    #[test]
    fn test_unresolvable_import_fails_fast() {
        let collator = collator(vec![Contribution::new(ContributionUri::new(
            "contribution://a",
        ))
        .with_import(ContributionUri::new("contribution://missing"))]);

        let a = component_with("contribution://a");
        assert!(matches!(
            collator.collate(&[&a]),
            Err(GenerationError::UnresolvedContribution(uri)) if uri.as_str() == "contribution://missing"
        ));
    }
}
