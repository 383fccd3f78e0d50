//! Property cardinality policy.
//!
//! Decides, per field kind and backend dialect, whether a value is written
//! as a single property or as multiple property calls, and expands a value
//! into the backend's property writes.
//!
//! Map-typed fields are written as one `Set` property call per map key, the
//! key being the stored value. Map values are dropped. This matches what the
//! existing graphs contain and is kept as is.

use serde::{Deserialize, Serialize};

use crate::value::{FieldKind, Value};

/// Backend property cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Single,
    List,
    Set,
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cardinality::Single => f.write_str("single"),
            Cardinality::List => f.write_str("list"),
            Cardinality::Set => f.write_str("set"),
        }
    }
}

/// Which multi-valued cardinalities the backend accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// TinkerPop reference semantics: `List` and `Set` are both available.
    #[default]
    Standard,
    /// Backends without ordered multi-valued properties (Amazon Neptune).
    #[serde(alias = "neptune")]
    SetOnly,
}

impl Dialect {
    pub fn supports_list(self) -> bool {
        matches!(self, Dialect::Standard)
    }
}

/// One backend property call: `.property(cardinality, name, value)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyWrite {
    pub cardinality: Cardinality,
    pub name: String,
    pub value: Value,
}

impl PropertyWrite {
    pub fn new(cardinality: Cardinality, name: impl Into<String>, value: Value) -> Self {
        Self {
            cardinality,
            name: name.into(),
            value,
        }
    }

    pub fn single(name: impl Into<String>, value: Value) -> Self {
        Self::new(Cardinality::Single, name, value)
    }
}

/// Cardinality used for a field of the given kind.
pub fn cardinality_for(kind: FieldKind, dialect: Dialect) -> Cardinality {
    match kind {
        FieldKind::Scalar | FieldKind::Map => Cardinality::Single,
        FieldKind::Sequence if dialect.supports_list() => Cardinality::List,
        FieldKind::Sequence => Cardinality::Set,
    }
}

/// Expand one property into the backend calls that store it.
///
/// Scalars produce one `Single` write, sequences one write per element, and
/// maps one `Set` write per key. `Null` values produce nothing.
pub fn property_writes(
    name: &str,
    kind: FieldKind,
    value: &Value,
    dialect: Dialect,
) -> Vec<PropertyWrite> {
    match (kind, value) {
        (_, Value::Null) => Vec::new(),
        (FieldKind::Sequence, Value::List(items)) => {
            let cardinality = cardinality_for(kind, dialect);
            items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| PropertyWrite::new(cardinality, name, item.clone()))
                .collect()
        }
        (FieldKind::Sequence, scalar) => vec![PropertyWrite::new(
            cardinality_for(kind, dialect),
            name,
            scalar.clone(),
        )],
        (FieldKind::Map, Value::Map(map)) => map
            .keys()
            .map(|key| PropertyWrite::new(Cardinality::Set, name, Value::String(key.clone())))
            .collect(),
        (_, other) => vec![PropertyWrite::single(name, other.clone())],
    }
}
