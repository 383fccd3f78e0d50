//! Property values exchanged between records and the traversal backend.
//!
//! `Value` is the dynamic representation every mapped field passes through.
//! The [`Property`] trait converts statically-typed field types to and from
//! it, and declares whether a field is a scalar, a sequence, or a map so the
//! cardinality policy can decide how to write it.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::VertexId;

/// Property name → value, the flattened shape of a record.
pub type PropertyMap = BTreeMap<String, Value>;

/// A dynamically-typed property value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

/// The static shape of a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Scalar,
    Sequence,
    Map,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Ordinal comparison between two values.
    ///
    /// Integers and floats compare numerically with each other. Values of
    /// unrelated types are unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Equality that treats `Int(3)` and `Float(3.0)` as the same value.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.compare(other) == Some(Ordering::Equal)
            }
            _ => self == other,
        }
    }

    /// Convert to JSON. Timestamps become RFC 3339 strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::DateTime(d) => serde_json::Value::String(d.to_rfc3339()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "'{s}'"),
            Value::DateTime(d) => write!(f, "datetime('{}')", d.to_rfc3339()),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("[")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

// ── Conversions into Value ───────────────────────────────────────

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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::DateTime(d)
    }
}

impl From<VertexId> for Value {
    fn from(id: VertexId) -> Self {
        id.to_value()
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

// ── Property ─────────────────────────────────────────────────────

/// A field type that can be stored as a graph property.
///
/// `from_value` returns `None` when the raw value cannot be converted to
/// `Self`; the reflector then leaves the field untouched.
pub trait Property: Sized + Send + Sync + 'static {
    const KIND: FieldKind = FieldKind::Scalar;

    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;
}

/// Unwrap a one-element list, which is how backends report single values
/// of multi-valued properties.
fn single(value: &Value) -> &Value {
    match value {
        Value::List(items) if items.len() == 1 => &items[0],
        other => other,
    }
}

impl Property for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match single(value) {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl Property for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match single(value) {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

macro_rules! integer_property {
    ($($t:ty),* $(,)?) => {
        $(
            impl Property for $t {
                /// Values beyond the `i64` range are written as decimal strings.
                fn to_value(&self) -> Value {
                    i64::try_from(*self).map_or_else(|_| Value::String(self.to_string()), Value::Int)
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match single(value) {
                        Value::Int(n) => <$t>::try_from(*n).ok(),
                        // Backends that speak JSON report every number as a float.
                        Value::Float(x) if x.is_finite() => {
                            let whole = x.trunc();
                            (whole >= <$t>::MIN as f64 && whole <= <$t>::MAX as f64)
                                .then(|| whole as $t)
                        }
                        Value::String(s) => s
                            .parse::<$t>()
                            .ok()
                            .filter(|n| i64::try_from(*n).is_err()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

integer_property!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl Property for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match single(value) {
            Value::Float(x) => Some(*x),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }
}

impl Property for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        f64::from_value(value).map(|x| x as f32)
    }
}

impl Property for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match single(value) {
            Value::DateTime(d) => Some(*d),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|d| d.with_timezone(&Utc)),
            _ => None,
        }
    }
}

impl Property for Uuid {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match single(value) {
            Value::String(s) => Uuid::parse_str(s).ok(),
            _ => None,
        }
    }
}

impl Property for VertexId {
    fn to_value(&self) -> Value {
        match self {
            VertexId::Int(n) => Value::Int(*n),
            VertexId::String(s) => Value::String(s.clone()),
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match single(value) {
            Value::Int(n) => Some(VertexId::Int(*n)),
            Value::String(s) => Some(VertexId::String(s.clone())),
            _ => None,
        }
    }
}

impl Property for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: Property> Property for Option<T> {
    const KIND: FieldKind = T::KIND;

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Property> Property for Vec<T> {
    const KIND: FieldKind = FieldKind::Sequence;

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Property::to_value).collect())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Vec::new()),
            Value::List(items) => items.iter().map(T::from_value).collect(),
            scalar => T::from_value(scalar).map(|item| vec![item]),
        }
    }
}

impl<T: Property + Ord> Property for BTreeSet<T> {
    const KIND: FieldKind = FieldKind::Sequence;

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Property::to_value).collect())
    }

    fn from_value(value: &Value) -> Option<Self> {
        Vec::<T>::from_value(value).map(|items| items.into_iter().collect())
    }
}

impl<T: Property> Property for BTreeMap<String, T> {
    const KIND: FieldKind = FieldKind::Map;

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(BTreeMap::new()),
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k.clone(), v)))
                .collect(),
            _ => None,
        }
    }
}

impl<T: Property> Property for HashMap<String, T> {
    const KIND: FieldKind = FieldKind::Map;

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }

    fn from_value(value: &Value) -> Option<Self> {
        BTreeMap::<String, T>::from_value(value).map(|map| map.into_iter().collect())
    }
}
