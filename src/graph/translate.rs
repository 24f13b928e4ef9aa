//! Lock-step translation of a node tree and its wiring into node records.
//!
//! The walk recurses per key, pairing each node sub-tree with the wiring
//! sub-tree under the same key. A missing wiring key means "no explicit
//! binding" and falls back to the node's self-reported topology; a wiring
//! key with no matching node, or wiring whose shape disagrees with the node
//! tree, aborts the migration rather than silently mis-wiring ports.

use hashbrown::HashMap;
use tracing::debug;

use crate::infer::{InferenceGap, SchemaInferrer};
use crate::model::{DescriptorMap, Path, Value, ValueMap};
use crate::ports::translate_ports;
use crate::registry::TypeRegistry;
use crate::{Error, Result};

use super::{LegacyNode, NodeKind, NodeRecord, NodeTree, WiringTree, node_address};

/// Execution interval assigned to process-kind nodes.
pub const DEFAULT_INTERVAL: f64 = 1.0;

/// Walks a legacy node tree and emits the declarative per-node records.
///
/// Config schemas are structural — identical across instances of one node
/// implementation — so they are computed once per `type_name` and cached.
pub struct GraphTranslator<'r> {
    inferrer: SchemaInferrer<'r>,
    schema_cache: HashMap<String, DescriptorMap>,
}

impl<'r> GraphTranslator<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            inferrer: SchemaInferrer::new(registry),
            schema_cache: HashMap::new(),
        }
    }

    /// Inference gaps accumulated across every node translated so far.
    pub fn gaps(&self) -> &[InferenceGap] {
        self.inferrer.gaps()
    }

    pub fn take_gaps(&mut self) -> Vec<InferenceGap> {
        self.inferrer.take_gaps()
    }

    /// Translate a whole node tree, producing the nested mapping of node
    /// records that becomes a processes or steps sub-document.
    pub fn translate_tree(
        &mut self,
        tree: &NodeTree,
        wiring: Option<&WiringTree>,
    ) -> Result<Value> {
        self.translate_at(tree, wiring, &Path::root())
    }

    fn translate_at(
        &mut self,
        tree: &NodeTree,
        wiring: Option<&WiringTree>,
        path: &Path,
    ) -> Result<Value> {
        match tree {
            NodeTree::Edge(node) => {
                let record = self.translate_node(node.as_ref(), wiring)?;
                Ok(record.into_value())
            }
            NodeTree::Branch(children) => {
                let bindings = match wiring {
                    None => None,
                    Some(WiringTree::Branch(entries)) => Some(entries),
                    Some(other) => {
                        return Err(Error::StructuralMismatch {
                            path: path.to_string(),
                            message: format!(
                                "node sub-tree paired with non-branch wiring {other:?}"
                            ),
                        });
                    }
                };

                // A wiring key that names no node would be dropped silently
                // otherwise; that risks mis-wiring, so fail fast.
                if let Some(entries) = bindings {
                    for key in entries.keys() {
                        if !children.contains_key(key) {
                            return Err(Error::StructuralMismatch {
                                path: path.child(key).to_string(),
                                message: "wiring key has no matching node".to_owned(),
                            });
                        }
                    }
                }

                let mut result = ValueMap::new();
                for (key, subtree) in children {
                    let sub_wiring = bindings.and_then(|entries| entries.get(key));
                    result.insert(
                        key.clone(),
                        self.translate_at(subtree, sub_wiring, &path.child(key))?,
                    );
                }
                Ok(Value::Map(result))
            }
        }
    }

    /// Translate a single edge object into its node record.
    ///
    /// `wiring` of `None` means no explicit binding: the node's own declared
    /// topology applies.
    pub fn translate_node(
        &mut self,
        node: &dyn LegacyNode,
        wiring: Option<&WiringTree>,
    ) -> Result<NodeRecord> {
        let config = self.config_schema(node);
        let bound = match wiring {
            Some(external) => external.clone(),
            None => node.topology(),
        };
        let kind = node.kind();
        Ok(NodeRecord {
            kind,
            address: node_address(node),
            config,
            interval: matches!(kind, NodeKind::Process).then_some(DEFAULT_INTERVAL),
            inputs: bound.restrict(&node.input_ports()).to_value(),
            outputs: bound.restrict(&node.output_ports()).to_value(),
        })
    }

    fn config_schema(&mut self, node: &dyn LegacyNode) -> DescriptorMap {
        if let Some(cached) = self.schema_cache.get(node.type_name()) {
            return cached.clone();
        }
        debug!(type_name = node.type_name(), "translating config schema");
        let schema = translate_ports(&mut self.inferrer, &node.ports_schema(), node.type_name());
        self.schema_cache
            .insert(node.type_name().to_owned(), schema.clone());
        schema
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::TypeDescriptor;
    use crate::ports::PortsTree;

    /// Counts ports_schema calls so the per-type cache is observable.
    struct CountingProcess {
        calls: Arc<AtomicUsize>,
    }

    impl LegacyNode for CountingProcess {
        fn type_name(&self) -> &str {
            "counting-process"
        }

        fn kind(&self) -> NodeKind {
            NodeKind::Process
        }

        fn ports_schema(&self) -> PortsTree {
            self.calls.fetch_add(1, Ordering::SeqCst);
            PortsTree::branch([
                ("x", PortsTree::leaf(11.11)),
                ("y", PortsTree::leaf(2.22)),
                ("z", PortsTree::leaf(3i64)),
            ])
        }

        fn topology(&self) -> WiringTree {
            WiringTree::branch([
                ("x", WiringTree::address(["a"])),
                ("y", WiringTree::address(["b"])),
                ("z", WiringTree::address(["c"])),
            ])
        }

        fn next_update(&self, _timestep: f64, _states: &ValueMap) -> ValueMap {
            ValueMap::new()
        }
    }

    fn counting_tree(calls: &Arc<AtomicUsize>, copies: usize) -> NodeTree {
        NodeTree::branch((0..copies).map(|i| {
            (
                format!("node{i}"),
                NodeTree::edge(Arc::new(CountingProcess { calls: Arc::clone(calls) })),
            )
        }))
    }

    #[test]
    fn test_translate_node_record_shape() {
        let registry = TypeRegistry::builtin();
        let mut translator = GraphTranslator::new(&registry);
        let node = CountingProcess { calls: Arc::new(AtomicUsize::new(0)) };
        let record = translator.translate_node(&node, None).unwrap();

        assert_eq!(record.kind, NodeKind::Process);
        assert_eq!(record.address, "local:counting-process");
        assert_eq!(record.interval, Some(DEFAULT_INTERVAL));
        assert_eq!(record.config.get("x"), Some(&TypeDescriptor::float()));
        assert_eq!(record.config.get("z"), Some(&TypeDescriptor::integer()));

        // No explicit binding: self-topology applies, bidirectionally.
        let inputs = record.inputs.as_map().unwrap();
        assert_eq!(inputs.get("x"), Some(&Value::List(vec![Value::from("a")])));
        assert_eq!(record.inputs, record.outputs);
    }

    #[test]
    fn test_config_schema_cached_per_type() {
        let registry = TypeRegistry::builtin();
        let mut translator = GraphTranslator::new(&registry);
        let calls = Arc::new(AtomicUsize::new(0));
        let tree = counting_tree(&calls, 3);

        translator.translate_tree(&tree, None).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_wiring_key_falls_back_to_topology() {
        let registry = TypeRegistry::builtin();
        let mut translator = GraphTranslator::new(&registry);
        let calls = Arc::new(AtomicUsize::new(0));
        let tree = counting_tree(&calls, 2);

        // Wiring binds node0 only; node1 keeps its self-topology.
        let wiring = WiringTree::branch([(
            "node0",
            WiringTree::branch([("x", WiringTree::address(["other"]))]),
        )]);
        let document = translator.translate_tree(&tree, Some(&wiring)).unwrap();
        let map = document.as_map().unwrap();

        let node0 = map.get("node0").unwrap().as_map().unwrap();
        let inputs0 = node0.get("inputs").unwrap().as_map().unwrap();
        assert_eq!(inputs0.get("x"), Some(&Value::List(vec![Value::from("other")])));

        let node1 = map.get("node1").unwrap().as_map().unwrap();
        let inputs1 = node1.get("inputs").unwrap().as_map().unwrap();
        assert_eq!(inputs1.get("x"), Some(&Value::List(vec![Value::from("a")])));
    }

    #[test]
    fn test_unmatched_wiring_key_is_structural_mismatch() {
        let registry = TypeRegistry::builtin();
        let mut translator = GraphTranslator::new(&registry);
        let calls = Arc::new(AtomicUsize::new(0));
        let tree = counting_tree(&calls, 1);

        let wiring = WiringTree::branch([("phantom", WiringTree::address(["a"]))]);
        let err = translator.translate_tree(&tree, Some(&wiring)).unwrap_err();
        assert!(matches!(err, Error::StructuralMismatch { .. }));
        assert!(err.to_string().contains("phantom"));
    }

    #[test]
    fn test_address_wiring_against_subtree_is_structural_mismatch() {
        let registry = TypeRegistry::builtin();
        let mut translator = GraphTranslator::new(&registry);
        let calls = Arc::new(AtomicUsize::new(0));
        let tree = counting_tree(&calls, 1);

        let wiring = WiringTree::address(["a"]);
        let err = translator.translate_tree(&tree, Some(&wiring)).unwrap_err();
        assert!(matches!(err, Error::StructuralMismatch { .. }));
    }
}
