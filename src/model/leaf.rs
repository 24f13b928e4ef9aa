//! Domain leaf value types.
//!
//! These are the opaque-to-the-engine scientific types a legacy state tree
//! carries: dimensioned quantities, dense arrays, and CSR sparse matrices.
//! The inference engine treats them as pluggable leaves — classification,
//! serialization, and deserialization all go through the handlers registered
//! in [`crate::registry`].

use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;

// ============================================================================
// Scalar element kinds
// ============================================================================

/// Element type of an array-like leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Integer,
    Float,
    Boolean,
}

impl Dtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dtype::Integer => "integer",
            Dtype::Float => "float",
            Dtype::Boolean => "boolean",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Dense arrays
// ============================================================================

/// A dense n-dimensional array, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayValue {
    pub shape: Vec<usize>,
    pub dtype: Dtype,
    pub data: Vec<f64>,
}

impl ArrayValue {
    pub fn new(shape: Vec<usize>, dtype: Dtype, data: Vec<f64>) -> Self {
        Self { shape, dtype, data }
    }

    /// Shape rendered in the pipe-joined form used by type expressions,
    /// e.g. `4|5` for a 4x5 array.
    pub fn shape_expr(&self) -> String {
        self.shape
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("|")
    }
}

// ============================================================================
// Dimensioned quantities
// ============================================================================

/// A scalar magnitude tagged with unit exponents, e.g. `383.3 umol^-1`.
///
/// Units are a map from unit symbol to exponent. The dimension of a quantity
/// resolves each derived unit to its base dimension through [`unit_table`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity {
    pub units: UnitMap,
    pub magnitude: f64,
}

/// Unit exponent map. Kept ordered so serialized dimensions are stable.
pub type UnitMap = std::collections::BTreeMap<String, f64>;

impl Quantity {
    pub fn new(units: impl IntoIterator<Item = (impl Into<String>, f64)>, magnitude: f64) -> Self {
        Self {
            units: units.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            magnitude,
        }
    }

    /// Resolve this quantity's units to base dimensions.
    ///
    /// Derived units (e.g. `umol`) collapse to their base dimension key
    /// (`mol`) while keeping the quantity's own exponent. Unknown units pass
    /// through as their own dimension.
    pub fn dimension(&self) -> UnitMap {
        let table = unit_table();
        let mut dimension = UnitMap::new();
        for (unit, exponent) in &self.units {
            let base = table
                .iter()
                .find(|entry| entry.symbol == unit.as_str())
                .and_then(|entry| entry.base)
                .unwrap_or(unit.as_str());
            dimension.insert(base.to_owned(), *exponent);
        }
        dimension
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.magnitude)?;
        for (unit, exp) in &self.units {
            if (*exp - 1.0).abs() < f64::EPSILON {
                write!(f, " {unit}")?;
            } else {
                write!(f, " {unit}^{exp}")?;
            }
        }
        Ok(())
    }
}

/// One row of the unit table: a symbol, the base dimension it reduces to
/// (None for base units), and the scale factor into that base.
#[derive(Debug, Clone, Copy)]
pub struct UnitEntry {
    pub symbol: &'static str,
    pub base: Option<&'static str>,
    pub scale: f64,
}

static UNIT_TABLE: LazyLock<Vec<UnitEntry>> = LazyLock::new(|| {
    vec![
        // base units
        UnitEntry { symbol: "g", base: None, scale: 1.0 },
        UnitEntry { symbol: "m", base: None, scale: 1.0 },
        UnitEntry { symbol: "s", base: None, scale: 1.0 },
        UnitEntry { symbol: "mol", base: None, scale: 1.0 },
        UnitEntry { symbol: "L", base: None, scale: 1.0 },
        UnitEntry { symbol: "K", base: None, scale: 1.0 },
        // derived
        UnitEntry { symbol: "kg", base: Some("g"), scale: 1e3 },
        UnitEntry { symbol: "mg", base: Some("g"), scale: 1e-3 },
        UnitEntry { symbol: "fg", base: Some("g"), scale: 1e-15 },
        UnitEntry { symbol: "um", base: Some("m"), scale: 1e-6 },
        UnitEntry { symbol: "nm", base: Some("m"), scale: 1e-9 },
        UnitEntry { symbol: "min", base: Some("s"), scale: 60.0 },
        UnitEntry { symbol: "h", base: Some("s"), scale: 3600.0 },
        UnitEntry { symbol: "mmol", base: Some("mol"), scale: 1e-3 },
        UnitEntry { symbol: "umol", base: Some("mol"), scale: 1e-6 },
        UnitEntry { symbol: "nmol", base: Some("mol"), scale: 1e-9 },
        UnitEntry { symbol: "mL", base: Some("L"), scale: 1e-3 },
        UnitEntry { symbol: "fL", base: Some("L"), scale: 1e-15 },
    ]
});

/// The fixed catalog of known units.
pub fn unit_table() -> &'static [UnitEntry] {
    &UNIT_TABLE
}

// ============================================================================
// CSR sparse matrices
// ============================================================================

/// A compressed-sparse-row matrix: `data`/`indices` per stored element and
/// one `pointers` entry per row boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SparseMatrix {
    pub shape: (usize, usize),
    pub dtype: Dtype,
    pub data: Vec<f64>,
    pub indices: Vec<i64>,
    pub pointers: Vec<i64>,
}

impl SparseMatrix {
    pub fn new(
        shape: (usize, usize),
        dtype: Dtype,
        data: Vec<f64>,
        indices: Vec<i64>,
        pointers: Vec<i64>,
    ) -> Self {
        Self { shape, dtype, data, indices, pointers }
    }

    /// Number of stored (non-zero) elements.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }
}
