//! Read operations and the traversal-to-Cypher compiler for Neo4j.
//!
//! A traversal becomes one `MATCH (n)` followed by `WHERE` filters and
//! `WITH n ..` paging stages, in step order. Every value is bound as a query
//! parameter.

use std::collections::BTreeMap;

use neo4rs::{query, BoltType, Query};

use gsm_core::types::{ID, LABEL};
use gsm_core::{Value, VertexId};

use crate::client::GraphClient;
use crate::error::GraphError;
use crate::traversal::{Order, Predicate, Source, Step, Traversal};

/// Cypher text plus its positional parameters.
#[derive(Debug, Default)]
pub struct CypherBuilder {
    clauses: Vec<String>,
    params: Vec<(String, BoltType)>,
}

impl CypherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a parameter and return its placeholder.
    pub fn bind(&mut self, value: impl Into<BoltType>) -> String {
        let name = format!("p{}", self.params.len());
        let placeholder = format!("${name}");
        self.params.push((name, value.into()));
        placeholder
    }

    pub fn push(&mut self, clause: impl Into<String>) {
        self.clauses.push(clause.into());
    }

    pub fn text(&self) -> String {
        self.clauses.join("\n")
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn into_query(self) -> Query {
        let text = self.text();
        self.params
            .into_iter()
            .fold(query(&text), |q, (name, value)| q.param(&name, value))
    }
}

// ── Traversal compilation ────────────────────────────────────────

/// `WITH n` stage collecting consecutive paging steps.
#[derive(Debug, Default)]
struct Paging {
    distinct: bool,
    order: Option<String>,
    skip: Option<String>,
    limit: Option<String>,
}

impl Paging {
    fn render(&self) -> String {
        let mut clause = String::from(if self.distinct { "WITH DISTINCT n" } else { "WITH n" });
        if let Some(order) = &self.order {
            clause.push_str(" ORDER BY ");
            clause.push_str(order);
        }
        if let Some(skip) = &self.skip {
            clause.push_str(" SKIP ");
            clause.push_str(skip);
        }
        if let Some(limit) = &self.limit {
            clause.push_str(" LIMIT ");
            clause.push_str(limit);
        }
        clause
    }
}

/// Emit the `MATCH` pipeline selecting the vertices a root traversal yields
/// as `n`.
pub fn compile_match(traversal: &Traversal, cypher: &mut CypherBuilder) -> Result<(), GraphError> {
    let mut filters = Vec::new();
    match traversal.source() {
        Source::Vertices(ids) => {
            cypher.push("MATCH (n)");
            if !ids.is_empty() {
                filters.push(id_filter(ids, cypher));
            }
        }
        Source::Anonymous => {
            return Err(GraphError::Unsupported(format!(
                "anonymous traversal cannot be submitted directly: {traversal}"
            )))
        }
    }

    let mut paging: Option<Paging> = None;
    for step in traversal.steps() {
        if step.is_filter() {
            if let Some(stage) = paging.take() {
                cypher.push(stage.render());
            }
            filters.push(compile_filter(step, cypher)?);
            continue;
        }

        flush_filters(&mut filters, cypher);
        let mut stage = paging.take().unwrap_or_default();
        match step {
            Step::Dedup => {
                if stage_used(&stage) {
                    cypher.push(stage.render());
                }
                stage = Paging {
                    distinct: true,
                    ..Paging::default()
                };
            }
            Step::OrderBy(field, order) => {
                if stage.order.is_some() || stage.skip.is_some() || stage.limit.is_some() {
                    cypher.push(stage.render());
                    stage = Paging::default();
                }
                let direction = match order {
                    Order::Asc => "ASC",
                    Order::Desc => "DESC",
                };
                stage.order = Some(format!("{} {direction}", property_expr(field)));
            }
            Step::Skip(n) => {
                if stage.skip.is_some() || stage.limit.is_some() {
                    cypher.push(stage.render());
                    stage = Paging::default();
                }
                stage.skip = Some(cypher.bind(to_i64(*n)));
            }
            Step::Limit(n) => {
                if stage.limit.is_some() {
                    cypher.push(stage.render());
                    stage = Paging::default();
                }
                stage.limit = Some(cypher.bind(to_i64(*n)));
            }
            _ => {}
        }
        paging = Some(stage);
    }

    if let Some(stage) = paging {
        cypher.push(stage.render());
    }
    flush_filters(&mut filters, cypher);
    Ok(())
}

fn stage_used(stage: &Paging) -> bool {
    stage.distinct || stage.order.is_some() || stage.skip.is_some() || stage.limit.is_some()
}

fn flush_filters(filters: &mut Vec<String>, cypher: &mut CypherBuilder) {
    if filters.is_empty() {
        return;
    }
    let condition = filters.join(" AND ");
    filters.clear();
    if cypher.clauses.len() == 1 {
        cypher.push(format!("WHERE {condition}"));
    } else {
        cypher.push(format!("WITH n WHERE {condition}"));
    }
}

fn compile_filter(step: &Step, cypher: &mut CypherBuilder) -> Result<String, GraphError> {
    match step {
        Step::HasLabel(label) => Ok(format!("n:{}", quote_identifier(label))),
        Step::HasId(ids) => Ok(id_filter(ids, cypher)),
        Step::Has(field, predicate) => Ok(compile_predicate(field, predicate, cypher)),
        Step::Where(sub) => {
            if *sub.source() != Source::Anonymous {
                return Err(GraphError::Unsupported(format!(
                    "where() expects an anonymous traversal, got {sub}"
                )));
            }
            if sub.steps().is_empty() {
                return Ok("true".to_string());
            }
            let mut parts = Vec::with_capacity(sub.steps().len());
            for inner in sub.steps() {
                if !inner.is_filter() {
                    return Err(GraphError::Unsupported(format!(
                        "only filter steps can be nested in where(): {sub}"
                    )));
                }
                parts.push(compile_filter(inner, cypher)?);
            }
            Ok(format!("({})", parts.join(" AND ")))
        }
        other => Err(GraphError::Unsupported(format!("{other:?} is not a filter step"))),
    }
}

fn id_filter(ids: &[VertexId], cypher: &mut CypherBuilder) -> String {
    let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
    format!("elementId(n) IN {}", cypher.bind(ids))
}

fn compile_predicate(field: &str, predicate: &Predicate, cypher: &mut CypherBuilder) -> String {
    let expr = property_expr(field);
    // Element ids are strings on this backend.
    let bind = |value: &Value, cypher: &mut CypherBuilder| {
        if field == ID {
            cypher.bind(id_text(value))
        } else {
            cypher.bind(to_bolt(value))
        }
    };

    match predicate {
        Predicate::Eq(v) => format!("{expr} = {}", bind(v, cypher)),
        Predicate::Neq(v) => format!("{expr} <> {}", bind(v, cypher)),
        Predicate::Gt(v) => format!("{expr} > {}", bind(v, cypher)),
        Predicate::Gte(v) => format!("{expr} >= {}", bind(v, cypher)),
        Predicate::Lt(v) => format!("{expr} < {}", bind(v, cypher)),
        Predicate::Lte(v) => format!("{expr} <= {}", bind(v, cypher)),
        Predicate::Within(values) => format!("{expr} IN {}", bind(&Value::List(values.clone()), cypher)),
        Predicate::Without(values) => format!(
            "{expr} IS NOT NULL AND NOT {expr} IN {}",
            bind(&Value::List(values.clone()), cypher)
        ),
        Predicate::Containing(text) => format!("{expr} CONTAINS {}", cypher.bind(text.clone())),
    }
}

fn id_text(value: &Value) -> BoltType {
    match value {
        Value::List(items) => BoltType::from(items.iter().map(id_text).collect::<Vec<_>>()),
        Value::String(s) => BoltType::from(s.clone()),
        other => BoltType::from(other.to_string()),
    }
}

fn property_expr(field: &str) -> String {
    match field {
        ID => "elementId(n)".to_string(),
        LABEL => "head(labels(n))".to_string(),
        _ => format!("n.{}", quote_identifier(field)),
    }
}

/// Backtick-quote a label or property name.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Convert a property value to a Cypher parameter.
///
/// Timestamps are stored as RFC 3339 strings and maps as JSON text.
pub fn to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(neo4rs::BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Int(n) => BoltType::from(*n),
        Value::Float(x) => BoltType::from(*x),
        Value::String(s) => BoltType::from(s.clone()),
        Value::DateTime(d) => BoltType::from(d.to_rfc3339()),
        Value::List(items) => BoltType::from(items.iter().map(to_bolt).collect::<Vec<_>>()),
        Value::Map(_) => BoltType::from(value.to_json().to_string()),
    }
}

// ── Result rows ──────────────────────────────────────────────────

const VALUE_MAP_RETURN: &str = "RETURN elementId(n) AS id, labels(n) AS labels, properties(n) AS props";

/// Build a `valueMap(true)`-shaped result from one returned row.
fn row_to_value_map(row: &neo4rs::Row, keys: &[String]) -> Result<Value, GraphError> {
    let id: String = row
        .get("id")
        .map_err(|e| GraphError::Serialization(format!("Failed to read element id: {e}")))?;
    let label = first_label(row.get::<Vec<String>>("labels"))?;
    let props: serde_json::Value = row
        .get("props")
        .map_err(|e| GraphError::Serialization(format!("Failed to read properties: {e}")))?;

    let mut map = BTreeMap::new();
    map.insert(ID.to_string(), Value::String(id));
    map.insert(
        LABEL.to_string(),
        Value::String(label),
    );
    if let serde_json::Value::Object(props) = props {
        for (name, value) in props {
            if keys.is_empty() || keys.contains(&name) {
                map.insert(name, Value::from(value));
            }
        }
    }
    Ok(Value::Map(map))
}

fn first_label<E: std::fmt::Display>(raw: Result<Vec<String>, E>) -> Result<String, GraphError> {
    let labels = raw.map_err(|e| GraphError::Serialization(format!("Failed to read labels: {e}")))?;
    labels
        .into_iter()
        .next()
        .ok_or_else(|| GraphError::Serialization("Vertex has no label".into()))
}

/// Decode the `cnt` column of a counting query.
pub(crate) fn read_count<E: std::fmt::Display>(raw: Result<i64, E>) -> Result<u64, GraphError> {
    let n = raw.map_err(|e| GraphError::Serialization(format!("Failed to read count: {e}")))?;
    u64::try_from(n).map_err(|_| GraphError::Serialization(format!("Negative count: {n}")))
}

impl GraphClient {
    // ── Traversal reads ──────────────────────────────────────────

    /// Property maps of every vertex the traversal selects.
    pub async fn fetch_value_maps(
        &self,
        traversal: &Traversal,
        keys: &[String],
    ) -> Result<Vec<Value>, GraphError> {
        let mut cypher = CypherBuilder::new();
        compile_match(traversal, &mut cypher)?;
        cypher.push(VALUE_MAP_RETURN);

        let rows = self.query_rows(cypher.into_query()).await?;
        rows.iter().map(|row| row_to_value_map(row, keys)).collect()
    }

    /// Number of vertices the traversal selects.
    pub async fn count_matching(&self, traversal: &Traversal) -> Result<u64, GraphError> {
        let mut cypher = CypherBuilder::new();
        compile_match(traversal, &mut cypher)?;
        cypher.push("RETURN count(n) AS cnt");

        match self.query_one(cypher.into_query()).await? {
            Some(row) => read_count(row.get::<i64>("cnt")),
            None => Ok(0),
        }
    }
}
