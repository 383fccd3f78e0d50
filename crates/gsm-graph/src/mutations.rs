//! Write operations for Neo4j.
//!
//! Vertex properties map onto node properties. `Single` writes assign,
//! `List` writes append to a Cypher list, and `Set` writes append only the
//! values the list does not already hold.

use gsm_core::{Cardinality, PropertyWrite, VertexId};

use crate::backend::{AddVertex, MergeVertex, PropertyAssignment};
use crate::client::GraphClient;
use crate::error::GraphError;
use crate::queries::{compile_match, quote_identifier, read_count, to_bolt, CypherBuilder};
use crate::traversal::Traversal;

impl GraphClient {
    // ── Vertex writes ────────────────────────────────────────────

    /// `CREATE` a node and return its element id.
    pub async fn create_vertex(&self, mutation: &AddVertex) -> Result<VertexId, GraphError> {
        let mut cypher = CypherBuilder::new();
        cypher.push(format!("CREATE (n:{})", quote_identifier(&mutation.label)));
        write_clauses(&[], &mutation.properties, &mut cypher);
        cypher.push("RETURN elementId(n) AS id");

        let row = self
            .query_one(cypher.into_query())
            .await?
            .ok_or_else(|| GraphError::Rejected(format!("CREATE returned no row for {}", mutation.label)))?;
        let id: String = row
            .get("id")
            .map_err(|e| GraphError::Serialization(format!("Failed to read element id: {e}")))?;

        tracing::debug!(label = %mutation.label, id = %id, "Created node");
        Ok(VertexId::String(id))
    }

    /// Replace properties on the node with the given element id. `None` if
    /// no node has it.
    pub async fn merge_vertex_by_id(&self, mutation: &MergeVertex) -> Result<Option<VertexId>, GraphError> {
        let mut cypher = CypherBuilder::new();
        let id = cypher.bind(mutation.id.to_string());
        cypher.push(format!("MATCH (n) WHERE elementId(n) = {id}"));
        write_clauses(&mutation.on_match.replaced, &mutation.on_match.writes, &mut cypher);
        cypher.push("RETURN elementId(n) AS id");

        match self.query_one(cypher.into_query()).await? {
            Some(row) => {
                let id: String = row
                    .get("id")
                    .map_err(|e| GraphError::Serialization(format!("Failed to read element id: {e}")))?;
                Ok(Some(VertexId::String(id)))
            }
            None => Ok(None),
        }
    }

    /// Apply an assignment to every node the traversal selects.
    pub async fn set_matching_properties(
        &self,
        traversal: &Traversal,
        assignment: &PropertyAssignment,
    ) -> Result<u64, GraphError> {
        let mut cypher = CypherBuilder::new();
        compile_match(traversal, &mut cypher)?;
        write_clauses(&assignment.replaced, &assignment.writes, &mut cypher);
        cypher.push("RETURN count(n) AS cnt");

        match self.query_one(cypher.into_query()).await? {
            Some(row) => read_count(row.get::<i64>("cnt")),
            None => Ok(0),
        }
    }

    /// `DETACH DELETE` every node the traversal selects.
    pub async fn delete_matching(&self, traversal: &Traversal) -> Result<(), GraphError> {
        let mut cypher = CypherBuilder::new();
        compile_match(traversal, &mut cypher)?;
        cypher.push("DETACH DELETE n");
        self.run(cypher.into_query()).await
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// `REMOVE` the replaced names, then `SET` the writes.
///
/// Consecutive writes to the same name with the same cardinality collapse
/// into one assignment.
fn write_clauses(replaced: &[String], writes: &[PropertyWrite], cypher: &mut CypherBuilder) {
    if !replaced.is_empty() {
        let removed: Vec<String> = replaced
            .iter()
            .map(|name| format!("n.{}", quote_identifier(name)))
            .collect();
        cypher.push(format!("REMOVE {}", removed.join(", ")));
    }

    let mut assignments = Vec::new();
    let mut index = 0;
    while index < writes.len() {
        let first = &writes[index];
        let run = writes[index..]
            .iter()
            .take_while(|w| w.name == first.name && w.cardinality == first.cardinality)
            .count();
        let group = &writes[index..index + run];
        index += run;

        let target = format!("n.{}", quote_identifier(&first.name));
        let assignment = match first.cardinality {
            Cardinality::Single => {
                let last = &group[group.len() - 1];
                format!("{target} = {}", cypher.bind(to_bolt(&last.value)))
            }
            Cardinality::List => {
                let values: Vec<_> = group.iter().map(|w| to_bolt(&w.value)).collect();
                format!("{target} = coalesce({target}, []) + {}", cypher.bind(values))
            }
            Cardinality::Set => {
                let mut values = Vec::with_capacity(group.len());
                for write in group {
                    if !values.iter().any(|v: &&PropertyWrite| v.value.loosely_equals(&write.value)) {
                        values.push(write);
                    }
                }
                let values: Vec<_> = values.iter().map(|w| to_bolt(&w.value)).collect();
                format!(
                    "{target} = coalesce({target}, []) + [x IN {} WHERE NOT x IN coalesce({target}, [])]",
                    cypher.bind(values)
                )
            }
        };
        assignments.push(assignment);
    }

    if !assignments.is_empty() {
        cypher.push(format!("SET {}", assignments.join(", ")));
    }
}
