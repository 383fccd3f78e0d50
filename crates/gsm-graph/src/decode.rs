//! Raw backend results to property maps and records.

use gsm_core::{PropertyMap, Schema, Value, Vertex};

use crate::error::{MapperError, Result};

/// Resolve the single-value-vs-collection ambiguity of a `valueMap` result.
///
/// One-element lists become their element, longer lists stay lists, and
/// every other value is kept as is.
pub fn resolve_cardinality(raw: &Value) -> Result<PropertyMap> {
    let Value::Map(map) = raw else {
        return Err(MapperError::NotAMap {
            found: raw.type_name(),
        });
    };

    Ok(map
        .iter()
        .map(|(name, value)| {
            let resolved = match value {
                Value::List(items) if items.len() == 1 => items[0].clone(),
                other => other.clone(),
            };
            (name.clone(), resolved)
        })
        .collect())
}

/// Decode one raw result into a record.
///
/// Schema properties missing from the result are treated as `Null`.
pub fn decode<T: Vertex>(schema: &Schema<T>, raw: &Value) -> Result<T> {
    let mut properties = resolve_cardinality(raw)?;
    for name in schema.property_names() {
        properties.entry(name).or_insert(Value::Null);
    }

    let mut record = T::default();
    schema.from_property_map(&properties, &mut record);
    Ok(record)
}
