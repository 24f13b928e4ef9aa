//! Built-in leaf handlers: dimensioned quantities and CSR sparse matrices.
//!
//! Both serialize to a self-describing mapping with a `_type` key, and both
//! deserialize pass-through when handed an already-live value.

use std::collections::BTreeMap;

use crate::model::{
    Dtype, Path, Quantity, SparseMatrix, TypeDescriptor, UnitMap, Value, ValueMap,
};
use crate::{Error, Result};

use super::LeafHandler;

// ============================================================================
// quantity
// ============================================================================

pub fn quantity_handler() -> LeafHandler {
    LeafHandler {
        name: "quantity",
        check: |value| matches!(value, Value::Quantity(_)),
        infer: infer_quantity,
        serialize: serialize_quantity,
        deserialize: deserialize_quantity,
    }
}

fn infer_quantity(value: &Value, _path: &Path) -> TypeDescriptor {
    let Value::Quantity(q) = value else {
        return TypeDescriptor::any();
    };
    let mut fields = BTreeMap::new();
    fields.insert("_type".to_owned(), TypeDescriptor::expr("quantity"));
    fields.insert("_dimension".to_owned(), TypeDescriptor::Dimension(q.dimension()));
    fields.insert("magnitude".to_owned(), TypeDescriptor::float());
    TypeDescriptor::Struct(fields)
}

fn serialize_quantity(value: &Value) -> Result<Value> {
    let Value::Quantity(q) = value else {
        return Err(codec_error("quantity", value));
    };
    let mut state = ValueMap::new();
    state.insert("_type".to_owned(), Value::String("quantity".into()));
    state.insert("_dimension".to_owned(), unit_map_value(&q.dimension()));
    state.insert("units".to_owned(), unit_map_value(&q.units));
    state.insert("magnitude".to_owned(), Value::Float(q.magnitude));
    Ok(Value::Map(state))
}

fn deserialize_quantity(state: &Value) -> Result<Value> {
    // Already live: pass through unchanged.
    if matches!(state, Value::Quantity(_)) {
        return Ok(state.clone());
    }
    let map = state.as_map().ok_or_else(|| codec_error("quantity", state))?;
    let units = map
        .get("units")
        .and_then(Value::as_map)
        .ok_or_else(|| codec_error("quantity", state))?;
    let magnitude = map
        .get("magnitude")
        .and_then(Value::as_float)
        .ok_or_else(|| codec_error("quantity", state))?;
    let units: UnitMap = units
        .iter()
        .filter_map(|(k, v)| v.as_float().map(|f| (k.clone(), f)))
        .collect();
    Ok(Value::Quantity(Quantity { units, magnitude }))
}

fn unit_map_value(units: &UnitMap) -> Value {
    Value::Map(
        units
            .iter()
            .map(|(k, v)| (k.clone(), Value::Float(*v)))
            .collect(),
    )
}

// ============================================================================
// csr_matrix
// ============================================================================

pub fn csr_matrix_handler() -> LeafHandler {
    LeafHandler {
        name: "csr_matrix",
        check: |value| matches!(value, Value::Sparse(_)),
        infer: infer_csr_matrix,
        serialize: serialize_csr_matrix,
        deserialize: deserialize_csr_matrix,
    }
}

fn array_descriptor(len: usize, element: TypeDescriptor) -> TypeDescriptor {
    let mut fields = BTreeMap::new();
    fields.insert("_type".to_owned(), TypeDescriptor::expr("array"));
    fields.insert("_shape".to_owned(), TypeDescriptor::Shape(vec![len]));
    fields.insert("_data".to_owned(), element);
    TypeDescriptor::Struct(fields)
}

fn infer_csr_matrix(value: &Value, _path: &Path) -> TypeDescriptor {
    let Value::Sparse(m) = value else {
        return TypeDescriptor::any();
    };
    let element = TypeDescriptor::expr(m.dtype.as_str());
    let mut fields = BTreeMap::new();
    fields.insert("_type".to_owned(), TypeDescriptor::expr("csr_matrix"));
    fields.insert("_shape".to_owned(), TypeDescriptor::Shape(vec![m.shape.0, m.shape.1]));
    fields.insert("_data".to_owned(), element.clone());
    fields.insert("data".to_owned(), array_descriptor(m.nnz(), element));
    fields.insert("indices".to_owned(), array_descriptor(m.nnz(), TypeDescriptor::integer()));
    fields.insert(
        "pointers".to_owned(),
        array_descriptor(m.pointers.len(), TypeDescriptor::integer()),
    );
    TypeDescriptor::Struct(fields)
}

fn serialize_csr_matrix(value: &Value) -> Result<Value> {
    let Value::Sparse(m) = value else {
        return Err(codec_error("csr_matrix", value));
    };
    let mut state = ValueMap::new();
    state.insert("_type".to_owned(), Value::String("csr_matrix".into()));
    state.insert(
        "_shape".to_owned(),
        Value::List(vec![Value::Int(m.shape.0 as i64), Value::Int(m.shape.1 as i64)]),
    );
    state.insert("_data".to_owned(), Value::String(m.dtype.as_str().into()));
    state.insert(
        "data".to_owned(),
        Value::List(m.data.iter().map(|v| Value::Float(*v)).collect()),
    );
    state.insert(
        "indices".to_owned(),
        Value::List(m.indices.iter().map(|v| Value::Int(*v)).collect()),
    );
    state.insert(
        "pointers".to_owned(),
        Value::List(m.pointers.iter().map(|v| Value::Int(*v)).collect()),
    );
    Ok(Value::Map(state))
}

fn deserialize_csr_matrix(state: &Value) -> Result<Value> {
    // Already live: pass through unchanged.
    if matches!(state, Value::Sparse(_)) {
        return Ok(state.clone());
    }
    let map = state.as_map().ok_or_else(|| codec_error("csr_matrix", state))?;
    let shape = int_list(map, "_shape", state)?;
    if shape.len() != 2 {
        return Err(codec_error("csr_matrix", state));
    }
    let dtype = match map.get("_data").and_then(Value::as_str) {
        Some("integer") => Dtype::Integer,
        Some("boolean") => Dtype::Boolean,
        _ => Dtype::Float,
    };
    Ok(Value::Sparse(SparseMatrix::new(
        (shape[0] as usize, shape[1] as usize),
        dtype,
        float_list(map, "data", state)?,
        int_list(map, "indices", state)?,
        int_list(map, "pointers", state)?,
    )))
}

// ============================================================================
// Shared helpers
// ============================================================================

fn codec_error(type_name: &str, state: &Value) -> Error {
    Error::LeafCodec {
        type_name: type_name.to_owned(),
        message: format!("unexpected wire shape: {}", state.type_name()),
    }
}

fn float_list(map: &ValueMap, key: &str, state: &Value) -> Result<Vec<f64>> {
    match map.get(key) {
        Some(Value::List(items)) => items
            .iter()
            .map(|v| v.as_float().ok_or_else(|| codec_error("csr_matrix", state)))
            .collect(),
        _ => Err(codec_error("csr_matrix", state)),
    }
}

fn int_list(map: &ValueMap, key: &str, state: &Value) -> Result<Vec<i64>> {
    match map.get(key) {
        Some(Value::List(items)) => items
            .iter()
            .map(|v| match v {
                Value::Int(i) => Ok(*i),
                _ => Err(codec_error("csr_matrix", state)),
            })
            .collect(),
        _ => Err(codec_error("csr_matrix", state)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Quantity;

    #[test]
    fn test_quantity_roundtrip() {
        let q = Value::Quantity(Quantity::new([("umol", -1.0)], 383.3));
        let wire = serialize_quantity(&q).unwrap();
        assert_eq!(deserialize_quantity(&wire).unwrap(), q);
    }

    #[test]
    fn test_quantity_serialized_shape() {
        let q = Value::Quantity(Quantity::new([("umol", -1.0)], 383.3));
        let wire = serialize_quantity(&q).unwrap();
        let map = wire.as_map().unwrap();
        assert_eq!(map.get("_type"), Some(&Value::String("quantity".into())));
        let dim = map.get("_dimension").unwrap().as_map().unwrap();
        assert_eq!(dim.get("mol"), Some(&Value::Float(-1.0)));
    }

    #[test]
    fn test_csr_roundtrip_both_dtypes() {
        for dtype in [Dtype::Integer, Dtype::Float] {
            let m = Value::Sparse(SparseMatrix::new(
                (4, 4),
                dtype,
                vec![1.0, 2.0, 3.0],
                vec![1, 2, 3],
                vec![0, 1, 2, 3, 3],
            ));
            let wire = serialize_csr_matrix(&m).unwrap();
            assert_eq!(deserialize_csr_matrix(&wire).unwrap(), m);
        }
    }

    #[test]
    fn test_deserialize_live_matrix_passes_through() {
        let m = Value::Sparse(SparseMatrix::new((1, 1), Dtype::Float, vec![], vec![], vec![0, 0]));
        assert_eq!(deserialize_csr_matrix(&m).unwrap(), m);
    }

    #[test]
    fn test_infer_csr_carries_reconstruction_metadata() {
        let m = Value::Sparse(SparseMatrix::new(
            (2, 3),
            Dtype::Float,
            vec![5.0],
            vec![1],
            vec![0, 1, 1],
        ));
        let descriptor = infer_csr_matrix(&m, &Path::root());
        let TypeDescriptor::Struct(fields) = descriptor else {
            panic!("expected structural descriptor");
        };
        assert_eq!(fields.get("_shape"), Some(&TypeDescriptor::Shape(vec![2, 3])));
        assert_eq!(fields.get("_data"), Some(&TypeDescriptor::float()));
        assert!(fields.contains_key("pointers"));
    }
}
