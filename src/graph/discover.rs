//! Discovery of edge objects inside nested namespaces.
//!
//! A source package exports nodes through namespaces (modules, registries,
//! composer attributes). The scan walks every visible entry, collects
//! process- and step-kind nodes by name, and never revisits a namespace —
//! membership is tracked by identity, so cyclic or self-referential
//! namespace graphs terminate.

use std::collections::BTreeMap;
use std::sync::Arc;

use hashbrown::HashSet;
use tracing::debug;

use crate::{Error, Result};

use super::{LegacyNode, NodeKind};

// ============================================================================
// Namespaces
// ============================================================================

/// One entry visible inside a namespace.
#[derive(Clone)]
pub enum Export {
    Edge(Arc<dyn LegacyNode>),
    Namespace(Arc<Namespace>),
}

/// A named collection of exports, possibly nesting further namespaces.
#[derive(Clone, Default)]
pub struct Namespace {
    pub name: String,
    pub entries: BTreeMap<String, Export>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), entries: BTreeMap::new() }
    }

    pub fn with_edge(mut self, name: impl Into<String>, node: Arc<dyn LegacyNode>) -> Self {
        self.entries.insert(name.into(), Export::Edge(node));
        self
    }

    pub fn with_namespace(mut self, name: impl Into<String>, namespace: Arc<Namespace>) -> Self {
        self.entries.insert(name.into(), Export::Namespace(namespace));
        self
    }
}

// ============================================================================
// Scanning
// ============================================================================

/// Nodes discovered under a namespace root, split by kind.
#[derive(Clone, Default)]
pub struct ScanResult {
    pub processes: BTreeMap<String, Arc<dyn LegacyNode>>,
    pub steps: BTreeMap<String, Arc<dyn LegacyNode>>,
}

impl std::fmt::Debug for ScanResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanResult")
            .field("processes", &self.processes.keys().collect::<Vec<_>>())
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty() && self.steps.is_empty()
    }

    fn contains_name(&self, name: &str) -> Option<&Arc<dyn LegacyNode>> {
        self.processes.get(name).or_else(|| self.steps.get(name))
    }
}

/// Recursively discover every edge object reachable from `root`.
///
/// Aliasing policy: the same node reached under several names keeps the name
/// it was first discovered under; later aliases are skipped. Two *distinct*
/// nodes bound to one name is a collision — the migration document would
/// silently drop one of them, so it is an error instead.
pub fn scan_namespace(root: &Arc<Namespace>) -> Result<ScanResult> {
    let mut result = ScanResult::default();
    let mut visited_namespaces: HashSet<*const Namespace> = HashSet::new();
    let mut visited_nodes: HashSet<*const ()> = HashSet::new();
    scan_into(root, &mut result, &mut visited_namespaces, &mut visited_nodes)?;
    Ok(result)
}

fn scan_into(
    namespace: &Arc<Namespace>,
    result: &mut ScanResult,
    visited_namespaces: &mut HashSet<*const Namespace>,
    visited_nodes: &mut HashSet<*const ()>,
) -> Result<()> {
    if !visited_namespaces.insert(Arc::as_ptr(namespace)) {
        debug!(namespace = namespace.name, "already visited, skipping");
        return Ok(());
    }

    for (name, export) in &namespace.entries {
        match export {
            Export::Namespace(nested) => {
                scan_into(nested, result, visited_namespaces, visited_nodes)?;
            }
            Export::Edge(node) => {
                let identity = Arc::as_ptr(node) as *const ();
                if !visited_nodes.insert(identity) {
                    // First occurrence wins for aliased nodes.
                    debug!(name, "node already discovered under another name");
                    continue;
                }
                if result.contains_name(name).is_some() {
                    return Err(Error::NameCollision { name: name.clone() });
                }
                match node.kind() {
                    NodeKind::Process => result.processes.insert(name.clone(), Arc::clone(node)),
                    NodeKind::Step => result.steps.insert(name.clone(), Arc::clone(node)),
                };
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueMap;
    use crate::ports::PortsTree;

    struct Probe {
        kind: NodeKind,
    }

    impl LegacyNode for Probe {
        fn type_name(&self) -> &str {
            "probe"
        }

        fn kind(&self) -> NodeKind {
            self.kind
        }

        fn ports_schema(&self) -> PortsTree {
            PortsTree::branch([("v", PortsTree::leaf(0.0))])
        }

        fn next_update(&self, _timestep: f64, _states: &ValueMap) -> ValueMap {
            ValueMap::new()
        }
    }

    fn probe(kind: NodeKind) -> Arc<dyn LegacyNode> {
        Arc::new(Probe { kind })
    }

    #[test]
    fn test_scan_splits_by_kind() {
        let root = Arc::new(
            Namespace::new("sim.processes")
                .with_edge("growth", probe(NodeKind::Process))
                .with_edge("division", probe(NodeKind::Step)),
        );
        let scan = scan_namespace(&root).unwrap();
        assert!(scan.processes.contains_key("growth"));
        assert!(scan.steps.contains_key("division"));
    }

    #[test]
    fn test_scan_recurses_nested_namespaces() {
        let inner = Arc::new(Namespace::new("inner").with_edge("leaf", probe(NodeKind::Step)));
        let root = Arc::new(Namespace::new("outer").with_namespace("inner", inner));
        let scan = scan_namespace(&root).unwrap();
        assert!(scan.steps.contains_key("leaf"));
    }

    #[test]
    fn test_cyclic_namespaces_terminate() {
        // Mutual aliasing: the same namespace reachable twice.
        let shared = Arc::new(Namespace::new("shared").with_edge("node", probe(NodeKind::Process)));
        let root = Arc::new(
            Namespace::new("root")
                .with_namespace("a", Arc::clone(&shared))
                .with_namespace("b", shared),
        );
        let scan = scan_namespace(&root).unwrap();
        assert_eq!(scan.processes.len(), 1);
    }

    #[test]
    fn test_aliased_node_first_occurrence_wins() {
        let node = probe(NodeKind::Process);
        let root = Arc::new(
            Namespace::new("root")
                .with_edge("alpha", Arc::clone(&node))
                .with_edge("beta", node),
        );
        let scan = scan_namespace(&root).unwrap();
        assert_eq!(scan.processes.len(), 1);
        assert!(scan.processes.contains_key("alpha"));
    }

    #[test]
    fn test_distinct_nodes_under_one_name_collide() {
        let inner_a = Arc::new(Namespace::new("a").with_edge("dup", probe(NodeKind::Process)));
        let inner_b = Arc::new(Namespace::new("b").with_edge("dup", probe(NodeKind::Step)));
        let root = Arc::new(
            Namespace::new("root")
                .with_namespace("a", inner_a)
                .with_namespace("b", inner_b),
        );
        let err = scan_namespace(&root).unwrap_err();
        assert!(matches!(err, Error::NameCollision { name } if name == "dup"));
    }
}
