//! Create-or-update of vertex records.
//!
//! A record without an id is created with `addVertex`; a record with an id
//! is merged by id, replacing every mapped property. Both paths stamp
//! `lastModified`, and creation also stamps `createdAt`. Nothing reaches the
//! backend if the record's schema is invalid.

use chrono::{DateTime, Utc};
use gsm_core::types::{CREATED_AT, ID, LAST_MODIFIED};
use gsm_core::{label_for, property_writes, schema_of, PropertyWrite, Schema, Value, Vertex, VertexId};

use crate::backend::{AddVertex, MergeVertex, PropertyAssignment};
use crate::error::{MapperError, Result};
use crate::mapper::Mapper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Create,
    Update,
}

impl Mapper {
    /// Persist a record, creating it when it has no id yet.
    pub async fn save<T: Vertex>(&self, record: &mut T) -> Result<()> {
        if record.base().is_new() {
            self.create(record).await
        } else {
            self.update(record).await
        }
    }

    /// Create a new vertex from the record and store the assigned id.
    pub async fn create<T: Vertex>(&self, record: &mut T) -> Result<()> {
        self.create_or_update(record, Operation::Create).await
    }

    /// Replace the properties of the record's existing vertex.
    ///
    /// Fails with `NotFound` when the record has no id or no vertex has it.
    pub async fn update<T: Vertex>(&self, record: &mut T) -> Result<()> {
        self.create_or_update(record, Operation::Update).await
    }

    async fn create_or_update<T: Vertex>(&self, record: &mut T, operation: Operation) -> Result<()> {
        let schema = schema_of::<T>()?;
        let label = label_for::<T>();
        let now = Utc::now();

        match operation {
            Operation::Create => {
                let mutation = AddVertex {
                    label: label.clone(),
                    properties: self.writes_for(schema, record, now, operation),
                };
                let id = self.backend().add_vertex(&mutation).await?;
                tracing::debug!(label = %label, id = %id, "Created vertex");

                let base = record.base_mut();
                base.id = Some(id);
                base.created_at = Some(now);
                base.last_modified = Some(now);
            }
            Operation::Update => {
                let Some(id) = record.base().id.clone() else {
                    return Err(MapperError::NotFound { label, id: None });
                };
                let writes = self.writes_for(schema, record, now, operation);
                let replaced: Vec<String> = schema
                    .property_names()
                    .into_iter()
                    .filter(|name| name.as_str() != ID && name.as_str() != CREATED_AT)
                    .collect();

                let mutation = MergeVertex {
                    id: id.clone(),
                    on_match: PropertyAssignment { replaced, writes },
                };
                let merged: Option<VertexId> = self.backend().merge_vertex(&mutation).await?;
                if merged.is_none() {
                    return Err(MapperError::NotFound { label, id: Some(id) });
                }
                tracing::debug!(label = %label, id = %id, "Updated vertex");

                record.base_mut().last_modified = Some(now);
            }
        }
        Ok(())
    }

    /// Property writes for a record, with the lifecycle stamps applied.
    fn writes_for<T: Vertex>(
        &self,
        schema: &Schema<T>,
        record: &T,
        now: DateTime<Utc>,
        operation: Operation,
    ) -> Vec<PropertyWrite> {
        let mut properties = schema.to_property_map(record);
        properties.remove(ID);
        properties.insert(LAST_MODIFIED.to_string(), Value::DateTime(now));
        match operation {
            Operation::Create => {
                properties.insert(CREATED_AT.to_string(), Value::DateTime(now));
            }
            Operation::Update => {
                properties.remove(CREATED_AT);
            }
        }

        let dialect = self.config().dialect;
        schema
            .fields()
            .iter()
            .filter_map(|field| properties.get(field.name()).map(|value| (field, value)))
            .flat_map(|(field, value)| property_writes(field.name(), field.kind(), value, dialect))
            .collect()
    }
}
