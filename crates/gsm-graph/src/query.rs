//! The fluent query facade.
//!
//! A [`Query`] collects a [`QuerySpec`] through builder calls and is
//! consumed by exactly one terminal. Terminals compile the collected spec,
//! submit it to the backend and decode what comes back.

use std::marker::PhantomData;

use chrono::Utc;
use gsm_core::types::{CREATED_AT, ID, LAST_MODIFIED};
use gsm_core::{property_writes, schema_of, PropertyMap, PropertyWrite, Value, Vertex, VertexId};

use crate::backend::PropertyAssignment;
use crate::compiler::{Condition, Operator, OrderClause, QuerySpec};
use crate::decode::{decode, resolve_cardinality};
use crate::error::{MapperError, Result};
use crate::mapper::Mapper;
use crate::traversal::{Order, Predicate, Traversal};

/// A typed query over one vertex type.
#[derive(Debug)]
pub struct Query<T> {
    mapper: Mapper,
    spec: QuerySpec,
    _record: PhantomData<fn() -> T>,
}

impl<T: Vertex> Query<T> {
    pub(crate) fn new(mapper: Mapper, label: String) -> Self {
        Self {
            mapper,
            spec: QuerySpec::new(label),
            _record: PhantomData,
        }
    }

    /// The query spec collected so far.
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Compile without executing.
    pub fn to_traversal(&self) -> Traversal {
        self.mapper.compiler().build_query(&self.spec)
    }

    // ── Builder ──────────────────────────────────────────────────

    pub fn where_(mut self, field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.spec.conditions.push(Condition::Compare {
            field: field.into(),
            operator,
            value: value.into(),
        });
        self
    }

    /// Filter with an anonymous traversal, applied as `where(..)`.
    pub fn where_raw(mut self, traversal: Traversal) -> Self {
        self.spec.conditions.push(Condition::Raw(traversal));
        self
    }

    pub fn dedup(mut self) -> Self {
        self.spec.dedup = true;
        self
    }

    /// Restrict to the given ids. The label filter is skipped.
    pub fn ids(mut self, ids: impl IntoIterator<Item = VertexId>) -> Self {
        self.spec.ids.extend(ids);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.spec.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.spec.offset = Some(n);
        self
    }

    /// Order results. Only one ordering is kept; a second call replaces the
    /// first.
    pub fn order_by(mut self, field: impl Into<String>, order: Order) -> Self {
        let field = field.into();
        if let Some(previous) = &self.spec.order {
            tracing::warn!(
                label = %self.spec.label,
                previous = %previous.field,
                replacement = %field,
                "order_by called more than once, keeping the last ordering"
            );
        }
        self.spec.order = Some(OrderClause { field, order });
        self
    }

    // ── Terminals ────────────────────────────────────────────────

    /// All matching records.
    pub async fn find(self) -> Result<Vec<T>> {
        let schema = schema_of::<T>()?;
        let traversal = self.to_traversal();
        self.mapper.compiler().trace(&traversal, "find");

        let raw = self
            .mapper
            .backend()
            .value_maps(&traversal, &schema.property_names())
            .await?;
        raw.iter().map(|r| decode(schema, r)).collect()
    }

    /// The first matching record, or `NotFound`.
    pub async fn take(self) -> Result<T> {
        let label = self.spec.label.clone();
        self.find()
            .await?
            .into_iter()
            .next()
            .ok_or(MapperError::NotFound { label, id: None })
    }

    pub async fn count(self) -> Result<u64> {
        schema_of::<T>()?;
        let traversal = self.to_traversal();
        self.mapper.compiler().trace(&traversal, "count");
        Ok(self.mapper.backend().count(&traversal).await?)
    }

    /// Drop every matching vertex. Resolves once the drop has completed.
    pub async fn delete(self) -> Result<()> {
        schema_of::<T>()?;
        let traversal = self.to_traversal();
        self.mapper.compiler().trace(&traversal, "delete");
        self.mapper.backend().drop_vertices(&traversal).await?;
        tracing::debug!(label = %self.spec.label, "Dropped matching vertices");
        Ok(())
    }

    /// Fetch one record by id, ignoring the label filter and any other
    /// clause of the chain.
    pub async fn lookup_by_id(self, id: impl Into<VertexId>) -> Result<T> {
        let id = id.into();
        let schema = schema_of::<T>()?;
        let traversal = Traversal::vertices_by_id(vec![id.clone()]);
        self.mapper.compiler().trace(&traversal, "lookup_by_id");

        let raw = self
            .mapper
            .backend()
            .value_maps(&traversal, &schema.property_names())
            .await?;
        match raw.first() {
            Some(first) => decode(schema, first),
            None => Err(MapperError::NotFound {
                label: self.spec.label,
                id: Some(id),
            }),
        }
    }

    /// Overwrite one property on every matching vertex and stamp
    /// `lastModified`. Returns the number of vertices updated.
    pub async fn update_property(self, name: &str, value: impl Into<Value>) -> Result<u64> {
        let schema = schema_of::<T>()?;
        let Some(field) = schema.field(name) else {
            return Err(MapperError::UnknownProperty {
                label: self.spec.label,
                name: name.to_string(),
            });
        };
        if name == ID || name == CREATED_AT {
            return Err(MapperError::ImmutableProperty {
                name: name.to_string(),
            });
        }

        let dialect = self.mapper.config().dialect;
        let mut writes = property_writes(name, field.kind(), &value.into(), dialect);
        let mut replaced = vec![name.to_string()];
        if name != LAST_MODIFIED {
            writes.push(PropertyWrite::single(LAST_MODIFIED, Value::DateTime(Utc::now())));
            replaced.push(LAST_MODIFIED.to_string());
        }

        let traversal = self.to_traversal();
        self.mapper.compiler().trace(&traversal, "update_property");
        let updated = self
            .mapper
            .backend()
            .set_properties(&traversal, &PropertyAssignment { replaced, writes })
            .await?;
        tracing::debug!(label = %self.spec.label, property = name, updated, "Updated property");
        Ok(updated)
    }
}

/// An untyped, label-scoped query returning property maps.
#[derive(Debug)]
pub struct RawQuery {
    mapper: Mapper,
    traversal: Traversal,
}

impl RawQuery {
    pub(crate) fn new(mapper: Mapper, label: String) -> Self {
        Self {
            mapper,
            traversal: Traversal::vertices().has_label(label),
        }
    }

    pub fn to_traversal(&self) -> &Traversal {
        &self.traversal
    }

    /// `has(field, eq(value))`
    pub fn has(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.traversal = self.traversal.has(field, value);
        self
    }

    pub fn has_predicate(mut self, field: impl Into<String>, predicate: Predicate) -> Self {
        self.traversal = self.traversal.has_predicate(field, predicate);
        self
    }

    pub fn where_raw(mut self, sub: Traversal) -> Self {
        self.traversal = self.traversal.where_(sub);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.traversal = self.traversal.limit(n);
        self
    }

    /// Every matching vertex as a resolved property map, including `id` and
    /// `label`.
    pub async fn to_list(self) -> Result<Vec<PropertyMap>> {
        self.mapper.compiler().trace(&self.traversal, "to_list");
        let raw = self.mapper.backend().value_maps(&self.traversal, &[]).await?;
        raw.iter().map(resolve_cardinality).collect()
    }

    /// The first matching vertex, if any.
    pub async fn next(self) -> Result<Option<PropertyMap>> {
        let traversal = self.traversal.limit(1);
        self.mapper.compiler().trace(&traversal, "next");
        let raw = self.mapper.backend().value_maps(&traversal, &[]).await?;
        raw.first().map(resolve_cardinality).transpose()
    }
}
