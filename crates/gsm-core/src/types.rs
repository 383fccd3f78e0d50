//! The entity contract every mappable record satisfies.
//!
//! A record embeds a [`VertexBase`] carrying the backend identifier and the
//! lifecycle timestamps, and registers its mapped fields through
//! [`Embedded::describe`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::SchemaBuilder;

// ── Reserved property names ───────────────────────────────────────

pub const ID: &str = "id";
pub const LABEL: &str = "label";
pub const LAST_MODIFIED: &str = "lastModified";
pub const CREATED_AT: &str = "createdAt";

/// Property name that excludes a field from mapping.
pub const EXCLUDED: &str = "-";

// ── Identifiers ───────────────────────────────────────────────────

/// Opaque backend-assigned vertex identifier.
///
/// TinkerGraph-style backends hand out integers; Neo4j element ids and
/// UUID-keyed stores use strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VertexId {
    Int(i64),
    String(String),
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexId::Int(n) => write!(f, "{n}"),
            VertexId::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for VertexId {
    fn from(n: i64) -> Self {
        VertexId::Int(n)
    }
}

impl From<&str> for VertexId {
    fn from(s: &str) -> Self {
        VertexId::String(s.to_string())
    }
}

impl From<String> for VertexId {
    fn from(s: String) -> Self {
        VertexId::String(s)
    }
}

impl From<Uuid> for VertexId {
    fn from(id: Uuid) -> Self {
        VertexId::String(id.to_string())
    }
}

// ── Vertex base ───────────────────────────────────────────────────

/// Identifier and lifecycle timestamps shared by every vertex record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexBase {
    pub id: Option<VertexId>,
    pub last_modified: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl VertexBase {
    /// A record is new until the backend has assigned it an identifier.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }
}

impl Embedded for VertexBase {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .field(ID, |b| &b.id, |b| &mut b.id)
            .field(LAST_MODIFIED, |b| &b.last_modified, |b| &mut b.last_modified)
            .field(CREATED_AT, |b| &b.created_at, |b| &mut b.created_at)
    }
}

// ── Contract traits ───────────────────────────────────────────────

/// A group of mapped fields that can be flattened into a parent record.
pub trait Embedded: Sized + Send + Sync + 'static {
    /// Register this type's mapped fields, in declaration order.
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self>;
}

/// A record persisted as a graph vertex.
///
/// ```ignore
/// #[derive(Debug, Default)]
/// struct Person {
///     base: VertexBase,
///     name: String,
///     tags: Vec<String>,
/// }
///
/// impl Embedded for Person {
///     fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
///         schema
///             .embed(|p| &p.base, |p| &mut p.base)
///             .field("name", |p| &p.name, |p| &mut p.name)
///             .field("tags", |p| &p.tags, |p| &mut p.tags)
///     }
/// }
///
/// impl Vertex for Person {
///     fn base(&self) -> &VertexBase { &self.base }
///     fn base_mut(&mut self) -> &mut VertexBase { &mut self.base }
/// }
/// ```
pub trait Vertex: Embedded + Default {
    fn base(&self) -> &VertexBase;

    fn base_mut(&mut self) -> &mut VertexBase;

    /// Explicit graph label. Empty means "use the type name".
    fn label() -> &'static str {
        ""
    }

    fn id(&self) -> Option<&VertexId> {
        self.base().id.as_ref()
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.base().last_modified
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.base().created_at
    }
}
