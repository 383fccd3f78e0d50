//! Error types for graph-struct-manager operations.

use gsm_core::{SchemaError, VertexId};
use thiserror::Error;

/// Errors surfaced by a traversal backend.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Backend rejected traversal: {0}")]
    Rejected(String),

    #[error("Unsupported traversal: {0}")]
    Unsupported(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors returned by the mapper.
///
/// Everything except `Graph` is detected locally, before any backend call.
#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Unknown property '{name}' for label {label}")]
    UnknownProperty { label: String, name: String },

    #[error("Property '{name}' cannot be updated directly")]
    ImmutableProperty { name: String },

    #[error("Result is not a map: found {found}")]
    NotAMap { found: &'static str },

    #[error("Vertex not found: {label}{}", describe_id(.id))]
    NotFound { label: String, id: Option<VertexId> },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

fn describe_id(id: &Option<VertexId>) -> String {
    id.as_ref()
        .map(|id| format!(" with id {id}"))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, MapperError>;
