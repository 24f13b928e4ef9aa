//! Inferred type descriptors.
//!
//! A descriptor is either a string-encoded type expression (`integer`,
//! `list[float]`, `map[string]`, `(float|integer)`) or a field-keyed
//! structural tree. Structural descriptors for domain leaves additionally
//! carry metadata leaves (array shape, unit dimension table) so the value can
//! be reconstructed by the consuming engine.

use std::collections::BTreeMap;

use serde::Serialize;

use super::Value;
use super::leaf::UnitMap;

/// Structural type expression inferred for a [`Value`].
///
/// Inference is a pure function of value shape: two values with the same
/// shape always yield equal descriptors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypeDescriptor {
    /// Flattened string expression: `integer`, `list[any]`, `map[float]`,
    /// `(float|integer)`, `array[(4|5),float]`.
    Expr(String),
    /// Field-keyed structural descriptor; used when a mapping's value types
    /// diverge or a leaf handler emits reconstruction metadata.
    Struct(BTreeMap<String, TypeDescriptor>),
    /// Metadata leaf: array/matrix shape.
    Shape(Vec<usize>),
    /// Metadata leaf: base-dimension exponents of a quantity.
    Dimension(UnitMap),
}

/// Descriptor map keyed by field or port name.
pub type DescriptorMap = BTreeMap<String, TypeDescriptor>;

// ============================================================================
// Constructors
// ============================================================================

impl TypeDescriptor {
    pub fn expr(tag: impl Into<String>) -> Self {
        TypeDescriptor::Expr(tag.into())
    }

    pub fn any() -> Self {
        Self::expr("any")
    }

    pub fn integer() -> Self {
        Self::expr("integer")
    }

    pub fn float() -> Self {
        Self::expr("float")
    }

    pub fn boolean() -> Self {
        Self::expr("boolean")
    }

    pub fn string() -> Self {
        Self::expr("string")
    }

    /// Absent value: the descriptor signals "no concrete type observed",
    /// not an error.
    pub fn maybe_any() -> Self {
        Self::expr("maybe[any]")
    }

    pub fn list_of(element: &TypeDescriptor) -> Self {
        Self::expr(format!("list[{}]", element.flatten()))
    }

    pub fn map_of(value: &TypeDescriptor) -> Self {
        let flat = value.flatten();
        if flat.is_empty() {
            return Self::expr("map[any]");
        }
        Self::expr(format!("map[{flat}]"))
    }

    /// Parenthesized, pipe-joined positional encoding; nested structural
    /// descriptors flatten into the colon/pipe string form.
    pub fn tuple_of(positions: &[TypeDescriptor]) -> Self {
        let inner = positions
            .iter()
            .map(TypeDescriptor::flatten)
            .collect::<Vec<_>>()
            .join("|");
        Self::expr(format!("({inner})"))
    }

    pub fn array_of(shape_expr: &str, element: &TypeDescriptor) -> Self {
        Self::expr(format!("array[({shape_expr}),{}]", element.flatten()))
    }
}

// ============================================================================
// Flattening
// ============================================================================

impl TypeDescriptor {
    /// Normalize to the flat string encoding.
    ///
    /// Structural descriptors become `key:part|key2:part2` with nested
    /// structures parenthesized. This form is what uniform-mapping collapse
    /// compares, so it must be deterministic — hence the ordered maps.
    pub fn flatten(&self) -> String {
        match self {
            TypeDescriptor::Expr(s) => s.clone(),
            TypeDescriptor::Struct(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|(key, sub)| match sub {
                        TypeDescriptor::Struct(_) => format!("{key}:({})", sub.flatten()),
                        _ => format!("{key}:{}", sub.flatten()),
                    })
                    .collect();
                parts.join("|")
            }
            TypeDescriptor::Shape(shape) => {
                let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
                format!("({})", dims.join("|"))
            }
            TypeDescriptor::Dimension(dims) => {
                let parts: Vec<String> = dims.iter().map(|(k, v)| format!("{k}:{v}")).collect();
                format!("{{{}}}", parts.join("|"))
            }
        }
    }

    /// Render as a plain [`Value`] for embedding in a migration document.
    pub fn to_value(&self) -> Value {
        match self {
            TypeDescriptor::Expr(s) => Value::String(s.clone()),
            TypeDescriptor::Struct(fields) => Value::Map(
                fields
                    .iter()
                    .map(|(k, sub)| (k.clone(), sub.to_value()))
                    .collect(),
            ),
            TypeDescriptor::Shape(shape) => {
                Value::List(shape.iter().map(|d| Value::Int(*d as i64)).collect())
            }
            TypeDescriptor::Dimension(dims) => Value::Map(
                dims.iter()
                    .map(|(k, v)| (k.clone(), Value::Float(*v)))
                    .collect(),
            ),
        }
    }
}

impl From<DescriptorMap> for TypeDescriptor {
    fn from(fields: DescriptorMap) -> Self {
        TypeDescriptor::Struct(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, TypeDescriptor)]) -> TypeDescriptor {
        TypeDescriptor::Struct(
            pairs
                .iter()
                .map(|(k, d)| ((*k).to_owned(), d.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_flatten_expr_is_identity() {
        assert_eq!(TypeDescriptor::integer().flatten(), "integer");
    }

    #[test]
    fn test_flatten_struct() {
        let d = fields(&[
            ("a", TypeDescriptor::float()),
            ("b", fields(&[("c", TypeDescriptor::integer())])),
        ]);
        assert_eq!(d.flatten(), "a:float|b:(c:integer)");
    }

    #[test]
    fn test_tuple_encoding_flattens_nested_structs() {
        let d = TypeDescriptor::tuple_of(&[
            TypeDescriptor::integer(),
            fields(&[("x", TypeDescriptor::float())]),
        ]);
        assert_eq!(d, TypeDescriptor::expr("(integer|x:float)"));
    }

    #[test]
    fn test_map_of_empty_collapses_to_any() {
        let empty = fields(&[]);
        assert_eq!(
            TypeDescriptor::map_of(&empty),
            TypeDescriptor::expr("map[any]")
        );
    }

    #[test]
    fn test_to_value() {
        let d = fields(&[("shape", TypeDescriptor::Shape(vec![4, 5]))]);
        let v = d.to_value();
        let m = v.as_map().unwrap();
        assert_eq!(
            m.get("shape"),
            Some(&Value::List(vec![Value::Int(4), Value::Int(5)]))
        );
    }
}
