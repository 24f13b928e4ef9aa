//! Universal value type covering every shape a legacy state tree can hold.

use std::fmt;

use serde::Serialize;

use super::ValueMap;
use super::leaf::{ArrayValue, Quantity, SparseMatrix};

/// A runtime datum snapshotted from a legacy simulation tree.
///
/// Covers the full set of shapes the inference engine can classify:
/// - Scalars: Null, Bool, Int, Float, String
/// - Containers: List, Tuple, Set, Map
/// - Domain leaves: Array, Quantity, Sparse
/// - Callables and reflected composites: Function, Object
/// - Everything else: Opaque (classified only via a registered handler,
///   otherwise recorded as an inference gap)
///
/// Values are read-only to the engine — inference and translation never
/// mutate them. Serialize-only: documents are produced, never parsed back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    Map(ValueMap),

    // Domain leaves
    Array(ArrayValue),
    Quantity(Quantity),
    Sparse(SparseMatrix),

    // Callables
    Function(String),

    // Composite exposing named fields (the reflection capability)
    Object(ObjectValue),

    // Outside the capability interface entirely
    Opaque { type_name: String },
}

/// A composite value that exposes named public fields.
///
/// This is the explicit capability interface replacing deep runtime
/// introspection: a source object either surfaces its fields here or it is
/// `Opaque` and falls back to `any`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectValue {
    pub type_name: String,
    pub fields: ValueMap,
}

impl ObjectValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), fields: ValueMap::new() }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Array(_) => "array",
            Value::Quantity(_) => "quantity",
            Value::Sparse(_) => "csr_matrix",
            Value::Function(_) => "function",
            Value::Object(o) => &o.type_name,
            Value::Opaque { type_name } => type_name,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl From<ValueMap> for Value { fn from(v: ValueMap) -> Self { Value::Map(v) } }
impl From<Quantity> for Value { fn from(v: Quantity) -> Self { Value::Quantity(v) } }
impl From<SparseMatrix> for Value { fn from(v: SparseMatrix) -> Self { Value::Sparse(v) } }
impl From<ObjectValue> for Value { fn from(v: ObjectValue) -> Self { Value::Object(v) } }
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::List(v.into_iter().map(Into::into).collect()) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::List(l) | Value::Set(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Tuple(l) => {
                write!(f, "(")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, ")")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Array(a) => write!(f, "<array{:?}>", a.shape),
            Value::Quantity(q) => write!(f, "{q}"),
            Value::Sparse(s) => write!(f, "<csr_matrix{:?}>", s.shape),
            Value::Function(name) => write!(f, "<function {name}>"),
            Value::Object(o) => write!(f, "<{} object>", o.type_name),
            Value::Opaque { type_name } => write!(f, "<{type_name}>"),
        }
    }
}
