//! # Document Merging
//!
//! Assembles the final migration document from the translated processes
//! sub-document, the translated steps sub-document, and any externally
//! supplied initial state. Merging is total and deterministic — there is no
//! conflict error, only defined precedence.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Value, ValueMap};

// ============================================================================
// Deep merge
// ============================================================================

/// Recursively merge `over` onto `base`.
///
/// Mapping keys merge per key; any non-mapping collision resolves
/// later-argument-wins.
pub fn deep_merge(base: Value, over: Value) -> Value {
    match (base, over) {
        (Value::Map(mut base_map), Value::Map(over_map)) => {
            for (key, over_value) in over_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, over_value),
                    None => over_value,
                };
                base_map.insert(key, merged);
            }
            Value::Map(base_map)
        }
        (_, over) => over,
    }
}

/// Deep-merge two name-keyed maps.
pub fn deep_merge_maps(base: ValueMap, over: ValueMap) -> ValueMap {
    match deep_merge(Value::Map(base), Value::Map(over)) {
        Value::Map(merged) => merged,
        _ => unreachable!("merging two maps yields a map"),
    }
}

// ============================================================================
// Migration document
// ============================================================================

/// The root migration output handed to the target engine:
/// `{"state": {<node name>: <node record or state value>, ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationDocument {
    pub state: ValueMap,
}

impl MigrationDocument {
    /// Render as pretty-printed JSON, the on-disk interchange form the
    /// target engine loads.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Merge the translated sub-documents and external initial state into one
/// document.
///
/// Order is deliberate: processes first, steps on top (their keys win), the
/// initial state last. Structural data survives wherever it is declared,
/// while initial-state leaves fill the gaps the translation left and
/// override declared placeholders.
pub fn migrate(processes: ValueMap, steps: ValueMap, initial_state: ValueMap) -> MigrationDocument {
    let combined = deep_merge_maps(processes, steps);
    MigrationDocument { state: deep_merge_maps(combined, initial_state) }
}

// ============================================================================
// Flattening
// ============================================================================

/// Flatten a nested state map into dot-notation keys, for diffing migrated
/// documents against their source.
pub fn flatten_state(state: &ValueMap) -> BTreeMap<String, Value> {
    let mut flat = BTreeMap::new();
    flatten_into(state, "", &mut flat);
    flat
}

fn flatten_into(state: &ValueMap, prefix: &str, flat: &mut BTreeMap<String, Value>) {
    for (key, value) in state {
        let flat_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Map(nested) => flatten_into(nested, &flat_key, flat),
            other => {
                flat.insert(flat_key, other.clone());
            }
        }
    }
}
