//! Running v1 nodes behind the v2 capability interface.
//!
//! The target engine expects nodes that expose a config schema, split
//! input/output port declarations, an initial state, and an
//! `update(state, interval)` entry point. [`NodeAdapter`] wraps a legacy
//! node and implements that interface by delegation — the wrapped node's
//! type identity is never touched.

use std::sync::Arc;

use crate::infer::SchemaInferrer;
use crate::model::{DescriptorMap, TypeDescriptor, Value, ValueMap};
use crate::ports::{PortsTree, extract_defaults, translate_ports};
use crate::registry::TypeRegistry;

use super::{LegacyNode, NodeKind};

/// The v2 node capability interface consumed by the target engine.
pub trait CompositeNode {
    /// Structural config schema, identical across instances of one
    /// implementation.
    fn config_schema(&self) -> &DescriptorMap;

    /// Ports read by the node. Bidirectional nodes report all ports.
    fn inputs(&self) -> PortsTree;

    /// Ports written by the node.
    fn outputs(&self) -> PortsTree;

    /// Initial state: the collapsed defaults of the input ports.
    fn initial_state(&self) -> Value;

    /// Apply one update. `interval` is ignored by step-kind nodes.
    fn update(&self, state: &ValueMap, interval: f64) -> ValueMap;
}

/// Adapter presenting a legacy node as a [`CompositeNode`].
///
/// The ports declaration and config schema are computed once at
/// construction; lifecycle calls delegate to the wrapped node.
pub struct NodeAdapter {
    inner: Arc<dyn LegacyNode>,
    ports: PortsTree,
    config_schema: DescriptorMap,
}

impl NodeAdapter {
    pub fn new(inner: Arc<dyn LegacyNode>, registry: &TypeRegistry) -> Self {
        let ports = inner.ports_schema();
        let mut inferrer = SchemaInferrer::new(registry);
        let mut config_schema = translate_ports(&mut inferrer, &ports, inner.type_name());
        // Every adapted node gains an explicit time step knob.
        config_schema.insert("time_step".to_owned(), TypeDescriptor::float());
        Self { inner, ports, config_schema }
    }

    pub fn kind(&self) -> NodeKind {
        self.inner.kind()
    }

    pub fn legacy(&self) -> &dyn LegacyNode {
        self.inner.as_ref()
    }
}

impl CompositeNode for NodeAdapter {
    fn config_schema(&self) -> &DescriptorMap {
        &self.config_schema
    }

    fn inputs(&self) -> PortsTree {
        self.ports.restrict(&self.inner.input_ports())
    }

    fn outputs(&self) -> PortsTree {
        self.ports.restrict(&self.inner.output_ports())
    }

    fn initial_state(&self) -> Value {
        Value::Map(extract_defaults(&self.inputs()))
    }

    fn update(&self, state: &ValueMap, interval: f64) -> ValueMap {
        self.inner.next_update(interval, state)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// v1-style process: x ** y, published to z.
    struct PowerProcess;

    impl LegacyNode for PowerProcess {
        fn type_name(&self) -> &str {
            "power-process"
        }

        fn kind(&self) -> NodeKind {
            NodeKind::Process
        }

        fn ports_schema(&self) -> PortsTree {
            PortsTree::branch([
                ("x", PortsTree::leaf(11.11)),
                ("y", PortsTree::leaf(2.22)),
                ("z", PortsTree::leaf(3i64)),
            ])
        }

        fn input_ports(&self) -> Vec<String> {
            vec!["x".to_owned(), "y".to_owned()]
        }

        fn output_ports(&self) -> Vec<String> {
            vec!["z".to_owned()]
        }

        fn next_update(&self, timestep: f64, states: &ValueMap) -> ValueMap {
            let x = states.get("x").and_then(Value::as_float).unwrap_or(0.0);
            let y = states.get("y").and_then(Value::as_float).unwrap_or(0.0);
            let mut update = ValueMap::new();
            update.insert("z".to_owned(), Value::Float(x.powf(y) / timestep * 2.0));
            update
        }
    }

    fn adapter() -> NodeAdapter {
        NodeAdapter::new(Arc::new(PowerProcess), &TypeRegistry::builtin())
    }

    #[test]
    fn test_config_schema_includes_time_step() {
        let adapted = adapter();
        let schema = adapted.config_schema();
        assert_eq!(schema.get("x"), Some(&TypeDescriptor::float()));
        assert_eq!(schema.get("z"), Some(&TypeDescriptor::integer()));
        assert_eq!(schema.get("time_step"), Some(&TypeDescriptor::float()));
    }

    #[test]
    fn test_port_split() {
        let adapted = adapter();
        assert_eq!(adapted.inputs().keys(), vec!["x", "y"]);
        assert_eq!(adapted.outputs().keys(), vec!["z"]);
    }

    #[test]
    fn test_initial_state_is_input_defaults() {
        let adapted = adapter();
        let state = adapted.initial_state();
        let map = state.as_map().unwrap();
        assert_eq!(map.get("x"), Some(&Value::Float(11.11)));
        assert_eq!(map.get("y"), Some(&Value::Float(2.22)));
        assert!(!map.contains_key("z"));
    }

    #[test]
    fn test_update_delegates_with_swapped_arguments() {
        let adapted = adapter();
        let mut state = ValueMap::new();
        state.insert("x".to_owned(), Value::Float(2.0));
        state.insert("y".to_owned(), Value::Float(3.0));
        let update = adapted.update(&state, 1.0);
        assert_eq!(update.get("z"), Some(&Value::Float(16.0)));
    }
}
