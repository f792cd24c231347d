//! The native value form a decoded message is converted into.

use serde::{Deserialize, Serialize};

use crate::TypeTag;

/// A value that can cross the bridge.
///
/// Each variant corresponds to exactly one [`TypeTag`]. Equality compares
/// doubles by bit pattern, so every value compares equal to its own round
/// trip, NaN payloads included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Value {
    /// Absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// An unsigned byte.
    Byte(u8),
    /// A 16-bit signed integer.
    Int16(i16),
    /// A 32-bit signed integer.
    Int32(i32),
    /// A 64-bit signed integer.
    Int64(i64),
    /// A double-precision float.
    Float64(f64),
    /// UTF-8 text.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Homogeneous 32-bit integers.
    Int32Array(Vec<i32>),
    /// Homogeneous 64-bit integers.
    Int64Array(Vec<i64>),
    /// Homogeneous doubles.
    Float64Array(Vec<f64>),
    /// Homogeneous strings.
    StringArray(Vec<String>),
    /// Heterogeneous values, possibly nested.
    Objects(Vec<Self>),
}

impl Value {
    /// The tag this value is carried under.
    pub const fn tag(&self) -> TypeTag {
        match self {
            Self::Null => TypeTag::Null,
            Self::Bool(_) => TypeTag::Bool,
            Self::Byte(_) => TypeTag::Byte,
            Self::Int16(_) => TypeTag::Int16,
            Self::Int32(_) => TypeTag::Int32,
            Self::Int64(_) => TypeTag::Int64,
            Self::Float64(_) => TypeTag::Float64,
            Self::String(_) => TypeTag::String,
            Self::Bytes(_) => TypeTag::Bytes,
            Self::Int32Array(_) => TypeTag::Int32Array,
            Self::Int64Array(_) => TypeTag::Int64Array,
            Self::Float64Array(_) => TypeTag::Float64Array,
            Self::StringArray(_) => TypeTag::StringArray,
            Self::Objects(_) => TypeTag::ObjectArray,
        }
    }
}

/// Compares doubles by bit pattern.
fn same_f64(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Int16(a), Self::Int16(b)) => a == b,
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Int32Array(a), Self::Int32Array(b)) => a == b,
            (Self::Int64Array(a), Self::Int64Array(b)) => a == b,
            (Self::Float64Array(a), Self::Float64Array(b)) => same_f64(a, b),
            (Self::StringArray(a), Self::StringArray(b)) => a == b,
            (Self::Objects(a), Self::Objects(b)) => a == b,
            _ => false,
        }
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Self::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Self::Int32Array(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Self::Int64Array(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::Float64Array(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::StringArray(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Objects(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_compare_bitwise() {
        assert_eq!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
        assert_ne!(Value::Float64(0.0), Value::Float64(-0.0));
        assert_eq!(
            Value::Float64Array(vec![f64::INFINITY, f64::NAN]),
            Value::Float64Array(vec![f64::INFINITY, f64::NAN])
        );
    }

    #[test]
    fn different_shapes_are_unequal() {
        assert_ne!(Value::Int32(1), Value::Int64(1));
        assert_ne!(Value::Bytes(vec![]), Value::Int32Array(vec![]));
    }

    #[test]
    fn json_form_is_externally_tagged() {
        let v = Value::Objects(vec![Value::Int32(1), "a".into(), Value::Null]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"Objects":[{"Int32":1},{"String":"a"},"Null"]}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
