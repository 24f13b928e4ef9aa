//! # Migration Data Model
//!
//! The DTOs that cross every boundary in the crate: runtime values, paths,
//! type descriptors, and the domain leaf types.
//!
//! Design rule: this module is pure data — no I/O, no registry access, no
//! traversal logic. Name-keyed maps are `BTreeMap` so every derived artifact
//! (flattened descriptors, serialized documents) is deterministic.

pub mod descriptor;
pub mod leaf;
pub mod path;
pub mod value;

use std::collections::BTreeMap;

pub use descriptor::{DescriptorMap, TypeDescriptor};
pub use leaf::{ArrayValue, Dtype, Quantity, SparseMatrix, UnitMap};
pub use path::Path;
pub use value::{ObjectValue, Value};

/// A map of field names to values.
pub type ValueMap = BTreeMap<String, Value>;
