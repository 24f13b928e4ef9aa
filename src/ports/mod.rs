//! # Ports Schemas
//!
//! A legacy node declares its ports as a tree: named sub-trees down to
//! leaves, each leaf carrying a declared default value and an optional
//! explicit type override. This module extracts raw defaults from that tree,
//! collapses declaration-form value trees to their defaults, and translates
//! ports into inferred type descriptors.
//!
//! All operations here are pure, total functions over the input tree shape —
//! no I/O and no partial results.

use std::collections::BTreeMap;

use crate::infer::SchemaInferrer;
use crate::model::{DescriptorMap, Path, Value, ValueMap};

/// Marker key identifying a declaration-form leaf inside a raw value tree.
pub const DEFAULT_KEY: &str = "_default";

// ============================================================================
// PortsTree
// ============================================================================

/// A node's declared ports.
///
/// A key maps to exactly one kind — either a nested sub-tree or a leaf
/// declaration. The enum makes mixing the two under one key unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum PortsTree {
    Branch(BTreeMap<String, PortsTree>),
    Leaf(PortLeaf),
}

/// A leaf port declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct PortLeaf {
    pub default: Value,
    /// Explicit type override; bypassed by defaults extraction, honored by
    /// downstream schema consumers.
    pub type_override: Option<String>,
}

impl PortsTree {
    pub fn branch(entries: impl IntoIterator<Item = (impl Into<String>, PortsTree)>) -> Self {
        PortsTree::Branch(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn leaf(default: impl Into<Value>) -> Self {
        PortsTree::Leaf(PortLeaf { default: default.into(), type_override: None })
    }

    pub fn leaf_typed(default: impl Into<Value>, type_override: impl Into<String>) -> Self {
        PortsTree::Leaf(PortLeaf {
            default: default.into(),
            type_override: Some(type_override.into()),
        })
    }

    /// Top-level port names, for branch roots.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            PortsTree::Branch(entries) => entries.keys().map(String::as_str).collect(),
            PortsTree::Leaf(_) => Vec::new(),
        }
    }

    /// Restrict a branch root to the named ports. An empty name list keeps
    /// the whole tree (ports are bidirectional unless split explicitly).
    pub fn restrict(&self, names: &[String]) -> PortsTree {
        if names.is_empty() {
            return self.clone();
        }
        match self {
            PortsTree::Branch(entries) => PortsTree::Branch(
                entries
                    .iter()
                    .filter(|(key, _)| names.iter().any(|n| n == *key))
                    .map(|(key, sub)| (key.clone(), sub.clone()))
                    .collect(),
            ),
            PortsTree::Leaf(_) => self.clone(),
        }
    }
}

// ============================================================================
// Defaults extraction
// ============================================================================

/// Extract each leaf's declared default from a ports tree.
///
/// A leaf contributes its default directly, bypassing any type override; a
/// sub-tree contributes only if it yields a non-empty nested result.
pub fn extract_defaults(ports: &PortsTree) -> ValueMap {
    match ports {
        PortsTree::Branch(entries) => {
            let mut result = ValueMap::new();
            for (key, sub) in entries {
                match sub {
                    PortsTree::Leaf(leaf) => {
                        result.insert(key.clone(), leaf.default.clone());
                    }
                    PortsTree::Branch(_) => {
                        let nested = extract_defaults(sub);
                        if !nested.is_empty() {
                            result.insert(key.clone(), Value::Map(nested));
                        }
                    }
                }
            }
            result
        }
        PortsTree::Leaf(_) => ValueMap::new(),
    }
}

/// Collapse a declaration-form value tree down to raw defaults.
///
/// A mapping carrying a `_default` marker is replaced by that default; other
/// mappings recurse per key; anything else (including malformed leaves)
/// passes through unchanged.
pub fn collapse_defaults(declaration: &Value) -> Value {
    match declaration {
        Value::Map(entries) => {
            if let Some(default) = entries.get(DEFAULT_KEY) {
                return default.clone();
            }
            Value::Map(
                entries
                    .iter()
                    .map(|(key, sub)| (key.clone(), collapse_defaults(sub)))
                    .collect(),
            )
        }
        other => other.clone(),
    }
}

/// Render a ports tree in declaration form: every leaf becomes a mapping
/// with a `_default` (and `_type` when overridden).
pub fn declaration_form(ports: &PortsTree) -> Value {
    match ports {
        PortsTree::Branch(entries) => Value::Map(
            entries
                .iter()
                .map(|(key, sub)| (key.clone(), declaration_form(sub)))
                .collect(),
        ),
        PortsTree::Leaf(leaf) => {
            let mut decl = ValueMap::new();
            decl.insert(DEFAULT_KEY.to_owned(), leaf.default.clone());
            if let Some(override_type) = &leaf.type_override {
                decl.insert("_type".to_owned(), Value::String(override_type.clone()));
            }
            Value::Map(decl)
        }
    }
}

// ============================================================================
// Port translation
// ============================================================================

/// Translate a ports tree into inferred type descriptors, rooted at `name`.
///
/// Extraction then inference; because inference is a pure function of value
/// shape, translating already-translated defaults yields the same result.
pub fn translate_ports(
    inferrer: &mut SchemaInferrer<'_>,
    ports: &PortsTree,
    name: &str,
) -> DescriptorMap {
    let defaults = extract_defaults(ports);
    inferrer.infer_schema(&defaults, &Path::named(name))
}
