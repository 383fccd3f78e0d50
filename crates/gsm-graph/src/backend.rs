//! The traversal backend seam.
//!
//! The mapper never talks to a graph directly. Every mutation and query is
//! expressed as an [`AddVertex`], [`MergeVertex`], or [`Traversal`] and
//! submitted to a [`TraversalBackend`]. Connection lifecycle, pooling and
//! timeouts belong to the implementation.

use async_trait::async_trait;
use gsm_core::{PropertyWrite, Value, VertexId};

use crate::error::GraphError;
use crate::traversal::Traversal;

/// `addV(label)` followed by `.property(..)` calls.
#[derive(Debug, Clone, PartialEq)]
pub struct AddVertex {
    pub label: String,
    pub properties: Vec<PropertyWrite>,
}

/// Property replacement applied to matched vertices.
///
/// Every name in `replaced` loses its current values before `writes` are
/// applied, so properties absent from `writes` end up cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyAssignment {
    pub replaced: Vec<String>,
    pub writes: Vec<PropertyWrite>,
}

/// `mergeV([(T.id): id]).option(onMatch, ..)`.
///
/// Match-only: a missing vertex is reported, never created.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeVertex {
    pub id: VertexId,
    pub on_match: PropertyAssignment,
}

/// A graph that accepts traversals.
///
/// Implementations must be safe for concurrent submission.
#[async_trait]
pub trait TraversalBackend: Send + Sync {
    /// Create a vertex and return its assigned identifier.
    async fn add_vertex(&self, mutation: &AddVertex) -> Result<VertexId, GraphError>;

    /// Update the vertex with `mutation.id`. `None` if no such vertex.
    async fn merge_vertex(&self, mutation: &MergeVertex) -> Result<Option<VertexId>, GraphError>;

    /// `valueMap(true)` over the traversal, restricted to `keys` when not
    /// empty.
    ///
    /// Each result is a `Value::Map` holding `id`, `label`, and every
    /// property either as a single value or as a list of values.
    async fn value_maps(&self, traversal: &Traversal, keys: &[String]) -> Result<Vec<Value>, GraphError>;

    async fn count(&self, traversal: &Traversal) -> Result<u64, GraphError>;

    /// `drop().iterate()`, resolved once the drop has completed.
    async fn drop_vertices(&self, traversal: &Traversal) -> Result<(), GraphError>;

    /// Apply `assignment` to every vertex the traversal yields. Returns the
    /// number of vertices updated.
    async fn set_properties(
        &self,
        traversal: &Traversal,
        assignment: &PropertyAssignment,
    ) -> Result<u64, GraphError>;
}
