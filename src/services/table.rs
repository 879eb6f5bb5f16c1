//! # Service metadata table.
//!
//! Ordered, validated collection of [`ServiceSpec`]s. Declaration order is the
//! order the orchestrator sweeps in.
//!
//! ## Validation
//! ```text
//! validate()
//!   ├─► duplicate ids            → ConfigError::DuplicateService
//!   ├─► id in its own deps       → ConfigError::SelfDependency
//!   ├─► dependency not in table  → ConfigError::UnknownDependency
//!   └─► DFS with recursion stack → ConfigError::Cycle { path: [a, b, ..., a] }
//! ```
//! The first problem found (in declaration order) is reported.

use std::collections::{HashMap, HashSet};

use crate::error::ConfigError;
use crate::services::{descriptor::ServiceDescriptor, spec::ServiceSpec};

/// Validated table of service specs.
#[derive(Clone, Debug, Default)]
pub struct ServiceTable {
    specs: Vec<ServiceSpec>,
    index: HashMap<String, usize>,
}

impl ServiceTable {
    /// Builds a table in declaration order. Call [`validate`](Self::validate) before use.
    pub fn new(specs: Vec<ServiceSpec>) -> Self {
        let mut index = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            index.entry(spec.id().to_string()).or_insert(i);
        }
        Self { specs, index }
    }

    /// Checks ids, dependencies and acyclicity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::with_capacity(self.specs.len());
        for spec in &self.specs {
            if !seen.insert(spec.id()) {
                return Err(ConfigError::DuplicateService {
                    id: spec.id().to_string(),
                });
            }
        }
        for spec in &self.specs {
            self.check_dependencies(spec.descriptor())?;
        }
        match self.find_cycle() {
            Some(path) => Err(ConfigError::Cycle { path }),
            None => Ok(()),
        }
    }

    /// Adds a spec after startup.
    ///
    /// The dependencies must already be registered, so the new node cannot close a cycle.
    pub fn insert(&mut self, spec: ServiceSpec) -> Result<(), ConfigError> {
        if self.index.contains_key(spec.id()) {
            return Err(ConfigError::DuplicateService {
                id: spec.id().to_string(),
            });
        }
        self.check_dependencies(spec.descriptor())?;
        self.index.insert(spec.id().to_string(), self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    /// Looks up a spec by id.
    pub fn get(&self, id: &str) -> Option<&ServiceSpec> {
        self.index.get(id).and_then(|&i| self.specs.get(i))
    }

    /// Looks up a descriptor by id.
    pub fn descriptor(&self, id: &str) -> Option<&ServiceDescriptor> {
        self.get(id).map(ServiceSpec::descriptor)
    }

    /// True if `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Specs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ServiceSpec> {
        self.specs.iter()
    }

    /// Descriptors in declaration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.specs.iter().map(ServiceSpec::descriptor)
    }

    /// Ids in declaration order.
    pub fn ids(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    fn check_dependencies(&self, d: &ServiceDescriptor) -> Result<(), ConfigError> {
        for dep in &d.dependencies {
            if *dep == d.id {
                return Err(ConfigError::SelfDependency { id: d.id.clone() });
            }
            if !self.index.contains_key(dep) {
                return Err(ConfigError::UnknownDependency {
                    service: d.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        Ok(())
    }

    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();
        let mut path = Vec::new();

        for spec in &self.specs {
            if !visited.contains(spec.id()) {
                if let Some(cycle) = self.cycle_dfs(spec.id(), &mut visited, &mut stack, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn cycle_dfs<'a>(
        &'a self,
        node: &'a str,
        visited: &mut HashSet<&'a str>,
        stack: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        stack.insert(node);
        path.push(node);

        let deps = self
            .descriptor(node)
            .map(|d| d.dependencies.as_slice())
            .unwrap_or_default();
        for dep in deps {
            let dep = dep.as_str();
            if stack.contains(dep) {
                let start = path.iter().position(|n| *n == dep).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path.iter().skip(start).map(|n| (*n).to_string()).collect();
                cycle.push(dep.to_string());
                return Some(cycle);
            }
            if !visited.contains(dep) {
                if let Some(cycle) = self.cycle_dfs(dep, visited, stack, path) {
                    return Some(cycle);
                }
            }
        }

        stack.remove(node);
        path.pop();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InitError, ServiceFn};
    use tokio_util::sync::CancellationToken;

    fn spec(id: &str, deps: &[&str]) -> ServiceSpec {
        ServiceSpec::new(
            ServiceDescriptor::new(id).depends_on(deps.iter().copied()),
            ServiceFn::arc(id.to_string(), |_ctx: CancellationToken| async {
                Ok::<(), InitError>(())
            }),
        )
    }

    #[test]
    fn valid_diamond_passes() {
        let table = ServiceTable::new(vec![
            spec("a", &[]),
            spec("b", &["a"]),
            spec("c", &["a"]),
            spec("d", &["b", "c"]),
        ]);
        assert!(table.validate().is_ok());
        assert_eq!(table.ids(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn two_node_cycle_is_reported_with_path() {
        let table = ServiceTable::new(vec![spec("a", &["b"]), spec("b", &["a"])]);
        assert_eq!(
            table.validate(),
            Err(ConfigError::Cycle {
                path: vec!["a".into(), "b".into(), "a".into()]
            })
        );
    }

    #[test]
    fn cycle_behind_an_acyclic_prefix_only_lists_participants() {
        let table = ServiceTable::new(vec![
            spec("root", &["x"]),
            spec("x", &["y"]),
            spec("y", &["z"]),
            spec("z", &["x"]),
        ]);
        assert_eq!(
            table.validate(),
            Err(ConfigError::Cycle {
                path: vec!["x".into(), "y".into(), "z".into(), "x".into()]
            })
        );
    }

    #[test]
    fn self_dependency_is_rejected() {
        let table = ServiceTable::new(vec![spec("a", &["a"])]);
        assert_eq!(
            table.validate(),
            Err(ConfigError::SelfDependency { id: "a".into() })
        );
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let table = ServiceTable::new(vec![spec("a", &["ghost"])]);
        assert_eq!(
            table.validate(),
            Err(ConfigError::UnknownDependency {
                service: "a".into(),
                dependency: "ghost".into()
            })
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let table = ServiceTable::new(vec![spec("a", &[]), spec("a", &[])]);
        assert_eq!(
            table.validate(),
            Err(ConfigError::DuplicateService { id: "a".into() })
        );
    }

    #[test]
    fn late_insert_requires_known_dependencies() {
        let mut table = ServiceTable::new(vec![spec("a", &[])]);
        assert!(table.insert(spec("b", &["a"])).is_ok());
        assert!(matches!(
            table.insert(spec("c", &["missing"])),
            Err(ConfigError::UnknownDependency { .. })
        ));
        assert!(matches!(
            table.insert(spec("a", &[])),
            Err(ConfigError::DuplicateService { .. })
        ));
        assert_eq!(table.len(), 2);
    }
}
