//! In-process traversal backend with TinkerGraph semantics.
//!
//! Vertices get sequential integer ids starting at 1 and keep their
//! insertion order. Every property holds a list of values:
//! `Single` replaces, `List` appends, `Set` appends unless already present.
//! A `SetOnly` graph rejects `List` writes the way Neptune does.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use gsm_core::types::{ID, LABEL};
use gsm_core::{Cardinality, Dialect, PropertyWrite, Value, VertexId};

use crate::backend::{AddVertex, MergeVertex, PropertyAssignment, TraversalBackend};
use crate::error::GraphError;
use crate::traversal::{Order, Source, Step, Traversal};

/// A vertex stored in memory.
#[derive(Debug, Clone)]
struct StoredVertex {
    id: i64,
    label: String,
    properties: BTreeMap<String, Vec<Value>>,
}

impl StoredVertex {
    /// Values a `has(field, ..)` step sees. `id` and `label` resolve to the
    /// element's own identity.
    fn values_of(&self, field: &str) -> Vec<Value> {
        match field {
            ID => vec![Value::Int(self.id)],
            LABEL => vec![Value::String(self.label.clone())],
            _ => self.properties.get(field).cloned().unwrap_or_default(),
        }
    }

    fn apply(&mut self, write: &PropertyWrite) {
        let values = self.properties.entry(write.name.clone()).or_default();
        match write.cardinality {
            Cardinality::Single => *values = vec![write.value.clone()],
            Cardinality::List => values.push(write.value.clone()),
            Cardinality::Set => {
                if !values.iter().any(|v| v.loosely_equals(&write.value)) {
                    values.push(write.value.clone());
                }
            }
        }
    }

    fn value_map(&self, keys: &[String]) -> Value {
        let mut map = BTreeMap::new();
        map.insert(ID.to_string(), Value::Int(self.id));
        map.insert(LABEL.to_string(), Value::String(self.label.clone()));
        for (name, values) in &self.properties {
            if values.is_empty() || (!keys.is_empty() && !keys.contains(name)) {
                continue;
            }
            map.insert(name.clone(), Value::List(values.clone()));
        }
        Value::Map(map)
    }
}

#[derive(Debug, Default)]
struct GraphState {
    next_id: i64,
    vertices: Vec<StoredVertex>,
}

/// In-memory graph, safe for concurrent use.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    dialect: Dialect,
    state: RwLock<GraphState>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph that only accepts the cardinalities `dialect` supports.
    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: RwLock::default(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Number of stored vertices.
    pub fn vertex_count(&self) -> usize {
        self.read().vertices.len()
    }

    /// All values of every property of one vertex.
    pub fn properties_of(&self, id: &VertexId) -> Option<BTreeMap<String, Vec<Value>>> {
        let VertexId::Int(id) = id else {
            return None;
        };
        self.read()
            .vertices
            .iter()
            .find(|v| v.id == *id)
            .map(|v| v.properties.clone())
    }

    fn read(&self) -> RwLockReadGuard<'_, GraphState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writes(&self, writes: &[PropertyWrite]) -> Result<(), GraphError> {
        for write in writes {
            if write.cardinality == Cardinality::List && !self.dialect.supports_list() {
                return Err(GraphError::Rejected(format!(
                    "list cardinality is not supported (property '{}')",
                    write.name
                )));
            }
            if write.value.is_null() {
                return Err(GraphError::Rejected(format!(
                    "null value for property '{}'",
                    write.name
                )));
            }
        }
        Ok(())
    }
}

// ── Evaluation ───────────────────────────────────────────────────

/// Indices of the vertices a root traversal yields, in stream order.
fn evaluate(state: &GraphState, traversal: &Traversal) -> Result<Vec<usize>, GraphError> {
    let start = match traversal.source() {
        Source::Vertices(ids) if ids.is_empty() => (0..state.vertices.len()).collect(),
        Source::Vertices(ids) => ids
            .iter()
            .filter_map(|id| position_of(state, id))
            .collect(),
        Source::Anonymous => {
            return Err(GraphError::Unsupported(format!(
                "anonymous traversal cannot be submitted directly: {traversal}"
            )))
        }
    };
    apply_steps(state, start, traversal.steps())
}

fn position_of(state: &GraphState, id: &VertexId) -> Option<usize> {
    match id {
        VertexId::Int(n) => state.vertices.iter().position(|v| v.id == *n),
        VertexId::String(s) => {
            let n: i64 = s.parse().ok()?;
            state.vertices.iter().position(|v| v.id == n)
        }
    }
}

fn apply_steps(
    state: &GraphState,
    mut stream: Vec<usize>,
    steps: &[Step],
) -> Result<Vec<usize>, GraphError> {
    for step in steps {
        stream = match step {
            Step::HasLabel(label) => stream
                .into_iter()
                .filter(|&i| state.vertices[i].label == *label)
                .collect(),
            Step::HasId(ids) => stream
                .into_iter()
                .filter(|&i| ids.iter().any(|id| position_of(state, id) == Some(i)))
                .collect(),
            Step::Has(field, predicate) => stream
                .into_iter()
                .filter(|&i| {
                    state.vertices[i]
                        .values_of(field)
                        .iter()
                        .any(|v| predicate.test(v))
                })
                .collect(),
            Step::Where(sub) => {
                if *sub.source() != Source::Anonymous {
                    return Err(GraphError::Unsupported(format!(
                        "where() expects an anonymous traversal, got {sub}"
                    )));
                }
                let mut kept = Vec::with_capacity(stream.len());
                for i in stream {
                    if !apply_steps(state, vec![i], sub.steps())?.is_empty() {
                        kept.push(i);
                    }
                }
                kept
            }
            Step::Dedup => {
                let mut seen = Vec::with_capacity(stream.len());
                stream.retain(|i| {
                    if seen.contains(i) {
                        false
                    } else {
                        seen.push(*i);
                        true
                    }
                });
                stream
            }
            Step::OrderBy(field, order) => {
                // A missing property sorts as the greatest value, as in Cypher.
                stream.sort_by(|&a, &b| {
                    let left = state.vertices[a].values_of(field);
                    let right = state.vertices[b].values_of(field);
                    let ordering = match (left.first(), right.first()) {
                        (Some(l), Some(r)) => l.compare(r).unwrap_or(Ordering::Equal),
                        (None, Some(_)) => Ordering::Greater,
                        (Some(_), None) => Ordering::Less,
                        (None, None) => Ordering::Equal,
                    };
                    match order {
                        Order::Asc => ordering,
                        Order::Desc => ordering.reverse(),
                    }
                });
                stream
            }
            Step::Skip(n) => stream.into_iter().skip(to_usize(*n)).collect(),
            Step::Limit(n) => {
                stream.truncate(to_usize(*n));
                stream
            }
        };
    }
    Ok(stream)
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

// ── Backend ──────────────────────────────────────────────────────

#[async_trait]
impl TraversalBackend for MemoryGraph {
    async fn add_vertex(&self, mutation: &AddVertex) -> Result<VertexId, GraphError> {
        self.check_writes(&mutation.properties)?;

        let mut state = self.write();
        state.next_id += 1;
        let mut vertex = StoredVertex {
            id: state.next_id,
            label: mutation.label.clone(),
            properties: BTreeMap::new(),
        };
        for write in &mutation.properties {
            vertex.apply(write);
        }
        let id = VertexId::Int(vertex.id);
        state.vertices.push(vertex);
        Ok(id)
    }

    async fn merge_vertex(&self, mutation: &MergeVertex) -> Result<Option<VertexId>, GraphError> {
        self.check_writes(&mutation.on_match.writes)?;

        let mut state = self.write();
        let Some(index) = position_of(&state, &mutation.id) else {
            return Ok(None);
        };
        let vertex = &mut state.vertices[index];
        assign(vertex, &mutation.on_match);
        Ok(Some(VertexId::Int(vertex.id)))
    }

    async fn value_maps(&self, traversal: &Traversal, keys: &[String]) -> Result<Vec<Value>, GraphError> {
        let state = self.read();
        let matched = evaluate(&state, traversal)?;
        Ok(matched
            .into_iter()
            .map(|i| state.vertices[i].value_map(keys))
            .collect())
    }

    async fn count(&self, traversal: &Traversal) -> Result<u64, GraphError> {
        let state = self.read();
        let matched = evaluate(&state, traversal)?;
        Ok(matched.len() as u64)
    }

    async fn drop_vertices(&self, traversal: &Traversal) -> Result<(), GraphError> {
        let mut state = self.write();
        let mut matched = evaluate(&state, traversal)?;
        matched.sort_unstable();
        matched.dedup();
        for index in matched.into_iter().rev() {
            state.vertices.remove(index);
        }
        Ok(())
    }

    async fn set_properties(
        &self,
        traversal: &Traversal,
        assignment: &PropertyAssignment,
    ) -> Result<u64, GraphError> {
        self.check_writes(&assignment.writes)?;

        let mut state = self.write();
        let mut matched = evaluate(&state, traversal)?;
        matched.sort_unstable();
        matched.dedup();
        for &index in &matched {
            assign(&mut state.vertices[index], assignment);
        }
        Ok(matched.len() as u64)
    }
}

fn assign(vertex: &mut StoredVertex, assignment: &PropertyAssignment) {
    for name in &assignment.replaced {
        vertex.properties.remove(name);
    }
    for write in &assignment.writes {
        vertex.apply(write);
    }
}
