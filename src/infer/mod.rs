//! # Schema Inference
//!
//! Derives a [`TypeDescriptor`] for any [`Value`] reachable from a legacy
//! default-value tree. Inference must be total: downstream translation cannot
//! proceed with unresolved types, so anything the engine cannot classify
//! degrades to `any` and is recorded as a diagnostic gap instead of aborting
//! the surrounding traversal.
//!
//! Dispatch is a closed match over the value-shape categories, with one open
//! seam: registered leaf handlers are consulted before the object-reflection
//! fallback, in registration order.

use tracing::warn;

use crate::model::{DescriptorMap, ObjectValue, Path, TypeDescriptor, Value, ValueMap};
use crate::registry::TypeRegistry;

// ============================================================================
// Diagnostics
// ============================================================================

/// A value the engine could not classify: substituted with `any` and
/// recorded here for later investigation. Never a hard failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceGap {
    pub type_name: String,
    pub path: Path,
}

// ============================================================================
// Inferrer
// ============================================================================

/// Recursive type inference over a snapshot of runtime values.
///
/// Inference is a pure function of (value shape, path) given a fixed
/// registry: the same value always yields the same descriptor. The only
/// state accumulated across calls is the gap diagnostic list.
pub struct SchemaInferrer<'r> {
    registry: &'r TypeRegistry,
    gaps: Vec<InferenceGap>,
}

impl<'r> SchemaInferrer<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry, gaps: Vec::new() }
    }

    /// Gaps recorded so far, as (type name, path) pairs.
    pub fn gaps(&self) -> &[InferenceGap] {
        &self.gaps
    }

    pub fn take_gaps(&mut self) -> Vec<InferenceGap> {
        std::mem::take(&mut self.gaps)
    }

    /// Infer the type descriptor for `value` at `path`.
    ///
    /// Known approximation: sequences are typed from their first element
    /// only. Heterogeneity past index 0 is not detected, matching the source
    /// system this engine migrates from.
    pub fn infer(&mut self, value: &Value, path: &Path) -> TypeDescriptor {
        match value {
            // Null signals the absence of a concrete type, not an error.
            Value::Null => TypeDescriptor::maybe_any(),
            Value::Bool(_) => TypeDescriptor::boolean(),
            Value::Int(_) => TypeDescriptor::integer(),
            Value::Float(_) => TypeDescriptor::float(),
            Value::String(_) => TypeDescriptor::string(),

            Value::Array(a) => {
                TypeDescriptor::array_of(&a.shape_expr(), &TypeDescriptor::expr(a.dtype.as_str()))
            }

            // Sets are typed as sequences.
            Value::List(items) | Value::Set(items) => self.infer_sequence(items, path),

            Value::Tuple(items) => {
                let positions: Vec<TypeDescriptor> = items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| self.infer(item, &path.child(format!("_{index}"))))
                    .collect();
                TypeDescriptor::tuple_of(&positions)
            }

            Value::Function(_) => TypeDescriptor::expr("function"),

            Value::Map(entries) => self.infer_mapping(entries, path),

            // Domain leaves and composites: registered handlers first, then
            // the reflection fallback, then a recorded gap.
            Value::Quantity(_) | Value::Sparse(_) | Value::Object(_) | Value::Opaque { .. } => {
                if let Some(handler) = self.registry.classify(value) {
                    return (handler.infer)(value, path);
                }
                match value {
                    Value::Object(object) => self.infer_object(object, path),
                    _ => self.record_gap(value, path),
                }
            }
        }
    }

    /// Infer descriptors for every entry of a config mapping, rooted at
    /// `path`. This is the entry point port translation uses.
    pub fn infer_schema(&mut self, config: &ValueMap, path: &Path) -> DescriptorMap {
        config
            .iter()
            .map(|(key, value)| (key.clone(), self.infer(value, &path.child(key))))
            .collect()
    }

    // ========================================================================
    // Shape rules
    // ========================================================================

    fn infer_sequence(&mut self, items: &[Value], path: &Path) -> TypeDescriptor {
        let element = match items.first() {
            Some(first) => self.infer(first, &path.child("_element")),
            None => TypeDescriptor::any(),
        };
        TypeDescriptor::list_of(&element)
    }

    /// Uniform-mapping collapse: when every value infers to the same
    /// descriptor (compared in flattened form), the mapping collapses to
    /// `map[V]`. One divergent value keeps the full field-keyed form.
    fn infer_mapping(&mut self, entries: &ValueMap, path: &Path) -> TypeDescriptor {
        if entries.is_empty() {
            return TypeDescriptor::any();
        }

        let mut fields = DescriptorMap::new();
        let mut distinct: Vec<String> = Vec::new();
        for (key, value) in entries {
            let descriptor = self.infer(value, &path.child(key));
            let flat = descriptor.flatten();
            if !distinct.contains(&flat) {
                distinct.push(flat);
            }
            fields.insert(key.clone(), descriptor);
        }

        if distinct.len() == 1 {
            let uniform = fields
                .values()
                .next()
                .cloned()
                .unwrap_or_else(TypeDescriptor::any);
            TypeDescriptor::map_of(&uniform)
        } else {
            TypeDescriptor::Struct(fields)
        }
    }

    /// Reflect over an object's named public fields. Leading-underscore
    /// fields are private by convention and skipped.
    fn infer_object(&mut self, object: &ObjectValue, path: &Path) -> TypeDescriptor {
        let mut fields = DescriptorMap::new();
        for (key, value) in &object.fields {
            if key.starts_with('_') {
                continue;
            }
            fields.insert(key.clone(), self.infer(value, &path.child(key)));
        }
        TypeDescriptor::Struct(fields)
    }

    fn record_gap(&mut self, value: &Value, path: &Path) -> TypeDescriptor {
        let type_name = value.type_name().to_owned();
        warn!(%path, type_name, "no handler classified value; substituting any");
        self.gaps.push(InferenceGap { type_name, path: path.clone() });
        TypeDescriptor::any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArrayValue, Dtype, Quantity};
    use pretty_assertions::assert_eq;

    fn infer_one(value: &Value) -> TypeDescriptor {
        let registry = TypeRegistry::builtin();
        let mut inferrer = SchemaInferrer::new(&registry);
        inferrer.infer(value, &Path::root())
    }

    fn map(pairs: Vec<(&str, Value)>) -> Value {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
    }

    #[test]
    fn test_primitives() {
        assert_eq!(infer_one(&Value::Int(3)), TypeDescriptor::integer());
        assert_eq!(infer_one(&Value::Bool(true)), TypeDescriptor::boolean());
        assert_eq!(infer_one(&Value::Float(1.5)), TypeDescriptor::float());
        assert_eq!(infer_one(&Value::from("x")), TypeDescriptor::string());
        assert_eq!(infer_one(&Value::Null), TypeDescriptor::maybe_any());
    }

    #[test]
    fn test_sequence_uses_first_element_only() {
        let homogeneous = Value::from(vec![1i64, 2, 3]);
        assert_eq!(infer_one(&homogeneous), TypeDescriptor::expr("list[integer]"));

        // First-element heuristic: the string at index 1 goes unnoticed.
        let heterogeneous = Value::List(vec![Value::Int(1), Value::from("x")]);
        assert_eq!(infer_one(&heterogeneous), TypeDescriptor::expr("list[integer]"));
    }

    #[test]
    fn test_empty_sequence_is_list_of_any() {
        assert_eq!(infer_one(&Value::List(vec![])), TypeDescriptor::expr("list[any]"));
    }

    #[test]
    fn test_tuple_positions_inferred_independently() {
        let t = Value::Tuple(vec![Value::Int(1), Value::Float(2.0), Value::from("s")]);
        assert_eq!(infer_one(&t), TypeDescriptor::expr("(integer|float|string)"));
    }

    #[test]
    fn test_uniform_mapping_collapses() {
        let m = map(vec![("a", Value::Int(1)), ("b", Value::Int(2))]);
        assert_eq!(infer_one(&m), TypeDescriptor::expr("map[integer]"));
    }

    #[test]
    fn test_divergent_mapping_keeps_field_keyed_form() {
        let m = map(vec![("a", Value::Int(1)), ("b", Value::from("x"))]);
        let TypeDescriptor::Struct(fields) = infer_one(&m) else {
            panic!("expected field-keyed descriptor");
        };
        assert_eq!(fields.get("a"), Some(&TypeDescriptor::integer()));
        assert_eq!(fields.get("b"), Some(&TypeDescriptor::string()));
    }

    #[test]
    fn test_empty_mapping_is_any() {
        assert_eq!(infer_one(&map(vec![])), TypeDescriptor::any());
    }

    #[test]
    fn test_uniform_mapping_of_empty_maps_collapses_to_map_any() {
        let m = map(vec![("a", map(vec![])), ("b", map(vec![]))]);
        assert_eq!(infer_one(&m), TypeDescriptor::expr("map[any]"));
    }

    #[test]
    fn test_array_expression() {
        let a = Value::Array(ArrayValue::new(vec![4, 5], Dtype::Float, vec![0.0; 20]));
        assert_eq!(infer_one(&a), TypeDescriptor::expr("array[(4|5),float]"));
    }

    #[test]
    fn test_quantity_dispatches_to_registered_handler() {
        let q = Value::Quantity(Quantity::new([("umol", -1.0)], 383.3));
        let TypeDescriptor::Struct(fields) = infer_one(&q) else {
            panic!("expected structural descriptor");
        };
        assert_eq!(fields.get("_type"), Some(&TypeDescriptor::expr("quantity")));
        assert_eq!(fields.get("magnitude"), Some(&TypeDescriptor::float()));
    }

    #[test]
    fn test_object_reflection_skips_private_fields() {
        let object = ObjectValue::new("Listener")
            .with_field("count", 3i64)
            .with_field("_cache", Value::Null);
        let TypeDescriptor::Struct(fields) = infer_one(&object.into()) else {
            panic!("expected field-keyed descriptor");
        };
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("count"), Some(&TypeDescriptor::integer()));
    }

    #[test]
    fn test_opaque_records_gap_and_continues() {
        let registry = TypeRegistry::builtin();
        let mut inferrer = SchemaInferrer::new(&registry);
        let m = map(vec![
            ("good", Value::Int(1)),
            ("bad", Value::Opaque { type_name: "FbaBorrowed".into() }),
        ]);
        let TypeDescriptor::Struct(fields) = inferrer.infer(&m, &Path::named("top")) else {
            panic!("expected field-keyed descriptor");
        };
        // The bad attribute degrades to any; its sibling is unaffected.
        assert_eq!(fields.get("bad"), Some(&TypeDescriptor::any()));
        assert_eq!(fields.get("good"), Some(&TypeDescriptor::integer()));

        let gaps = inferrer.gaps();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].type_name, "FbaBorrowed");
        assert_eq!(gaps[0].path.to_string(), "top.bad");
    }

    #[test]
    fn test_infer_is_idempotent() {
        let registry = TypeRegistry::builtin();
        let mut inferrer = SchemaInferrer::new(&registry);
        let value = map(vec![
            ("x", Value::Float(11.11)),
            ("ys", Value::from(vec![1i64, 2])),
        ]);
        let path = Path::named("top");
        let first = inferrer.infer(&value, &path);
        let second = inferrer.infer(&value, &path);
        assert_eq!(first, second);
    }
}
