//! # Process Graph Model
//!
//! The legacy side of the migration: edge objects (processes and steps),
//! the node tree that arranges them, and the wiring tree that binds their
//! ports into a shared state space.

pub mod adapter;
pub mod discover;
pub mod translate;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::model::{DescriptorMap, Value, ValueMap};
use crate::ports::PortsTree;

pub use adapter::{CompositeNode, NodeAdapter};
pub use discover::{Export, Namespace, ScanResult, scan_namespace};
pub use translate::GraphTranslator;

// ============================================================================
// Edge objects
// ============================================================================

/// What kind of edge object a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Interval-driven: updated every `interval` units of simulated time.
    Process,
    /// Event-driven and stateless between triggers.
    Step,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Process => "process",
            NodeKind::Step => "step",
        }
    }
}

/// A legacy (v1-style) computational node.
///
/// This is the contract the migration engine consumes. Implementations own
/// their parameters and ports declaration; the engine reads both but calls
/// `next_update` only through the v2 adapter, never during translation.
pub trait LegacyNode: Send + Sync {
    /// Stable implementation identity. Drives the address locator and the
    /// per-type config schema cache, so it must be identical across
    /// instances of one implementation.
    fn type_name(&self) -> &str;

    fn kind(&self) -> NodeKind;

    /// Instance configuration mapping.
    fn parameters(&self) -> ValueMap {
        ValueMap::new()
    }

    /// Declared ports with their default values.
    fn ports_schema(&self) -> PortsTree;

    /// Self-reported wiring, used when no external wiring is supplied.
    fn topology(&self) -> WiringTree {
        WiringTree::Branch(BTreeMap::new())
    }

    /// Port names read by the node. Empty means bidirectional: every port
    /// is both an input and an output.
    fn input_ports(&self) -> Vec<String> {
        Vec::new()
    }

    /// Port names written by the node. Empty means bidirectional.
    fn output_ports(&self) -> Vec<String> {
        Vec::new()
    }

    /// Compute a partial state update. Steps ignore `timestep`.
    fn next_update(&self, timestep: f64, states: &ValueMap) -> ValueMap;
}

/// Address locator for a node implementation, e.g. `local:mass-listener`.
pub fn node_address(node: &dyn LegacyNode) -> String {
    format!("local:{}", node.type_name())
}

// ============================================================================
// Node tree
// ============================================================================

/// A legacy tree of named nodes: edge objects at the leaves, name-keyed
/// sub-trees above them. Anything else is a structural error by
/// construction.
#[derive(Clone)]
pub enum NodeTree {
    Edge(Arc<dyn LegacyNode>),
    Branch(BTreeMap<String, NodeTree>),
}

impl NodeTree {
    pub fn edge(node: Arc<dyn LegacyNode>) -> Self {
        NodeTree::Edge(node)
    }

    pub fn branch(entries: impl IntoIterator<Item = (impl Into<String>, NodeTree)>) -> Self {
        NodeTree::Branch(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl std::fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeTree::Edge(node) => write!(f, "Edge({})", node.type_name()),
            NodeTree::Branch(entries) => f.debug_map().entries(entries.iter()).finish(),
        }
    }
}

// ============================================================================
// Wiring tree
// ============================================================================

/// Port-to-state bindings mirroring a ports tree's shape.
///
/// Leaves are addresses into the shared state space. `Raw` is the escape
/// hatch for already-resolved wiring: it passes through translation
/// unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum WiringTree {
    Address(Vec<String>),
    Branch(BTreeMap<String, WiringTree>),
    Raw(Value),
}

impl WiringTree {
    pub fn address(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        WiringTree::Address(segments.into_iter().map(Into::into).collect())
    }

    pub fn branch(entries: impl IntoIterator<Item = (impl Into<String>, WiringTree)>) -> Self {
        WiringTree::Branch(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Convert to plain ordered-name-sequence form: addresses become lists
    /// of names, branches recurse, raw wiring is passed through unchanged.
    pub fn to_value(&self) -> Value {
        match self {
            WiringTree::Address(segments) => Value::List(
                segments
                    .iter()
                    .map(|s| Value::String(s.clone()))
                    .collect(),
            ),
            WiringTree::Branch(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(key, sub)| (key.clone(), sub.to_value()))
                    .collect(),
            ),
            WiringTree::Raw(value) => value.clone(),
        }
    }

    /// Restrict a branch to the named ports; empty names keep everything.
    pub fn restrict(&self, names: &[String]) -> WiringTree {
        if names.is_empty() {
            return self.clone();
        }
        match self {
            WiringTree::Branch(entries) => WiringTree::Branch(
                entries
                    .iter()
                    .filter(|(key, _)| names.iter().any(|n| n == *key))
                    .map(|(key, sub)| (key.clone(), sub.clone()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

// ============================================================================
// Node records
// ============================================================================

/// One translated node, owned by the migration document. Holds no reference
/// back to the source node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub kind: NodeKind,
    pub address: String,
    pub config: DescriptorMap,
    /// Execution interval; present exactly for process-kind nodes.
    pub interval: Option<f64>,
    pub inputs: Value,
    pub outputs: Value,
}

impl NodeRecord {
    /// Render in target document form: a mapping with a `_type` kind key.
    pub fn into_value(self) -> Value {
        let mut record = ValueMap::new();
        record.insert("_type".to_owned(), Value::String(self.kind.as_str().into()));
        record.insert("address".to_owned(), Value::String(self.address));
        record.insert(
            "config".to_owned(),
            Value::Map(
                self.config
                    .iter()
                    .map(|(key, descriptor)| (key.clone(), descriptor.to_value()))
                    .collect(),
            ),
        );
        if let Some(interval) = self.interval {
            record.insert("interval".to_owned(), Value::Float(interval));
        }
        record.insert("inputs".to_owned(), self.inputs);
        record.insert("outputs".to_owned(), self.outputs);
        Value::Map(record)
    }
}
