//! Value types for the instance representation

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A decoded document value.
///
/// Mirrors the JSON data model, plus a [`Tensor`] variant for numeric arrays
/// produced by a computation backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null/empty value
    Null,

    /// Boolean value
    Bool(bool),

    /// Integral number
    Integer(i64),

    /// Integral number above `i64::MAX`
    Unsigned(u64),

    /// Floating point number
    Float(f64),

    /// String value
    String(String),

    /// Ordered sequence
    Array(Vec<Value>),

    /// Mapping with string keys, kept in key order
    Object(BTreeMap<String, Value>),

    /// Backend-specific numeric array
    Tensor(Tensor),
}

/// A dense numeric array owned by a named backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    backend: String,
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Tensor {
    /// Create a tensor with an explicit shape.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidTensor`] when the element count implied
    /// by `shape` does not match `data.len()`.
    pub fn new(
        backend: impl Into<String>,
        shape: Vec<usize>,
        data: Vec<f64>,
    ) -> crate::Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(crate::Error::InvalidTensor {
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            backend: backend.into(),
            shape,
            data,
        })
    }

    /// Create a one-dimensional tensor.
    pub fn from_vec(backend: impl Into<String>, data: Vec<f64>) -> Self {
        Self {
            backend: backend.into(),
            shape: vec![data.len()],
            data,
        }
    }

    /// Name of the backend that produced this tensor
    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Length of the leading dimension, as a sequence would report it.
    pub fn len(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert into nested plain arrays of floats.
    ///
    /// A zero-dimensional tensor becomes a single [`Value::Float`].
    pub fn to_value(&self) -> Value {
        fn nest(shape: &[usize], data: &[f64]) -> Value {
            match shape.split_first() {
                None => Value::Float(data.first().copied().unwrap_or_default()),
                Some((&dim, rest)) => {
                    let stride: usize = rest.iter().product();
                    let items = (0..dim)
                        .map(|i| nest(rest, &data[i * stride..(i + 1) * stride]))
                        .collect();
                    Value::Array(items)
                }
            }
        }
        nest(&self.shape, &self.data)
    }
}

impl Value {
    /// Name of the value's kind, using JSON Schema vocabulary.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) | Value::Unsigned(_) => "integer",
            Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Tensor(_) => "tensor",
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view of integers and floats.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Unsigned(u) => Some(*u as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Exact view of integral values
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Integer(i) => Some(i128::from(*i)),
            Value::Unsigned(u) => Some(i128::from(*u)),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Value::Tensor(t) => Some(t),
            _ => None,
        }
    }

    /// Whether this value is a number with no fractional part.
    pub fn is_integral(&self) -> bool {
        match self {
            Value::Integer(_) | Value::Unsigned(_) => true,
            Value::Float(f) => f.is_finite() && f.fract() == 0.0,
            _ => false,
        }
    }

    /// Look up a property of an object value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Structural equality with numeric equivalence (`1 == 1.0`).
    ///
    /// Tensors compare equal to the nested arrays they convert into.
    #[allow(clippy::float_cmp)]
    pub fn equivalent(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Tensor(a), b) => a.to_value().equivalent(b),
            (a, Value::Tensor(b)) => a.equivalent(&b.to_value()),
            (a, b) if a.as_i128().is_some() && b.as_i128().is_some() => a.as_i128() == b.as_i128(),
            (a, b) if a.as_f64().is_some() && b.as_f64().is_some() => a.as_f64() == b.as_f64(),
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equivalent(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.equivalent(other)))
            }
            (a, b) => a == b,
        }
    }
}

impl PartialEq<serde_json::Value> for Value {
    fn eq(&self, other: &serde_json::Value) -> bool {
        self.equivalent(&Value::from(other.clone()))
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Unsigned(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        i64::try_from(u).map_or(Value::Unsigned(u), Value::Integer)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Tensor> for Value {
    fn from(t: Tensor) -> Self {
        Value::Tensor(t)
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Value::Object(iter.into_iter().collect())
    }
}

// Tensors and non-finite floats have no JSON encoding; serialization fails
// rather than silently coercing them.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Unsigned(u) => serializer.serialize_u64(*u),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(f) => Err(S::Error::custom(format!(
                "non-finite number {f} is not JSON-serializable"
            ))),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Tensor(t) => Err(S::Error::custom(format!(
                "{} tensor is not JSON-serializable",
                t.backend()
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Unsigned(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Object(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Tensor(t) => write!(f, "<{} tensor {:?}>", t.backend(), t.shape()),
        }
    }
}
