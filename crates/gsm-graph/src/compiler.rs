//! Query specification and its compilation into a [`Traversal`].
//!
//! Compilation order is fixed: source (ids or all vertices), label filter
//! (only without ids), conditions in insertion order, dedup, ordering, then
//! offset and limit. Compiling the same query twice yields equal
//! traversals.

use std::fmt;
use std::str::FromStr;

use gsm_core::types::ID;
use gsm_core::{MapperConfig, Property, Value, VertexId};

use crate::traversal::{Order, Predicate, Traversal};

/// Comparison operator of a `where_` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Contains,
    Without,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown operator: {0}")]
pub struct ParseOperatorError(pub String);

impl FromStr for Operator {
    type Err = ParseOperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "=" | "==" | "eq" => Ok(Operator::Eq),
            "!=" | "<>" | "neq" => Ok(Operator::Neq),
            ">" | "gt" => Ok(Operator::Gt),
            ">=" | "gte" => Ok(Operator::Gte),
            "<" | "lt" => Ok(Operator::Lt),
            "<=" | "lte" => Ok(Operator::Lte),
            "in" | "within" => Ok(Operator::In),
            "contains" | "containing" => Ok(Operator::Contains),
            "without" => Ok(Operator::Without),
            _ => Err(ParseOperatorError(s.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Eq => "=",
            Operator::Neq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "in",
            Operator::Contains => "contains",
            Operator::Without => "without",
        };
        f.write_str(symbol)
    }
}

/// One filter of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        field: String,
        operator: Operator,
        value: Value,
    },
    /// A caller-supplied anonymous traversal, applied as `where(..)`.
    Raw(Traversal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderClause {
    pub field: String,
    pub order: Order,
}

/// Everything a query chain has collected before its terminal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub label: String,
    pub ids: Vec<VertexId>,
    pub conditions: Vec<Condition>,
    pub order: Option<OrderClause>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub dedup: bool,
}

impl QuerySpec {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

/// Turns query specs into traversals.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryCompiler {
    debug: bool,
}

impl QueryCompiler {
    pub fn new(config: &MapperConfig) -> Self {
        Self {
            debug: config.debug_traversals,
        }
    }

    pub fn build_query(&self, spec: &QuerySpec) -> Traversal {
        let mut traversal = if spec.ids.is_empty() {
            Traversal::vertices().has_label(spec.label.as_str())
        } else {
            Traversal::vertices_by_id(spec.ids.clone())
        };

        for condition in &spec.conditions {
            traversal = apply_condition(traversal, condition);
        }

        if spec.dedup {
            traversal = traversal.dedup();
        }
        if let Some(clause) = &spec.order {
            traversal = traversal.order_by(clause.field.as_str(), clause.order);
        }
        if let Some(offset) = spec.offset {
            traversal = traversal.skip(offset);
        }
        if let Some(limit) = spec.limit {
            traversal = traversal.limit(limit);
        }
        traversal
    }

    /// Emit the compiled traversal when traversal debugging is enabled.
    pub fn trace(&self, traversal: &Traversal, terminal: &str) {
        if self.debug {
            tracing::debug!(terminal, traversal = %traversal, "Compiled traversal");
        }
    }
}

fn apply_condition(traversal: Traversal, condition: &Condition) -> Traversal {
    let (field, operator, value) = match condition {
        Condition::Raw(sub) => return traversal.where_(sub.clone()),
        Condition::Compare {
            field,
            operator,
            value,
        } => (field.as_str(), *operator, value),
    };

    match operator {
        Operator::Eq if field == ID => match id_lookup(value) {
            Some(ids) => traversal.has_id(ids),
            None => traversal.has_predicate(field, Predicate::Eq(value.clone())),
        },
        Operator::Eq => traversal.has_predicate(field, Predicate::Eq(value.clone())),
        Operator::Neq => traversal.has_predicate(field, Predicate::Neq(value.clone())),
        Operator::Gt => traversal.has_predicate(field, Predicate::Gt(value.clone())),
        Operator::Gte => traversal.has_predicate(field, Predicate::Gte(value.clone())),
        Operator::Lt => traversal.has_predicate(field, Predicate::Lt(value.clone())),
        Operator::Lte => traversal.has_predicate(field, Predicate::Lte(value.clone())),
        Operator::In => match value {
            Value::List(items) => traversal.has_predicate(field, Predicate::Within(items.clone())),
            _ => skip_condition(traversal, field, operator, value),
        },
        Operator::Without => match value {
            Value::List(items) => traversal.has_predicate(field, Predicate::Without(items.clone())),
            _ => skip_condition(traversal, field, operator, value),
        },
        Operator::Contains => match value {
            Value::String(text) => traversal.has_predicate(field, Predicate::Containing(text.clone())),
            _ => skip_condition(traversal, field, operator, value),
        },
    }
}

/// Ids for `hasId`: one id, or every element of a list of ids.
fn id_lookup(value: &Value) -> Option<Vec<VertexId>> {
    match value {
        Value::List(items) => items.iter().map(VertexId::from_value).collect(),
        other => VertexId::from_value(other).map(|id| vec![id]),
    }
}

fn skip_condition(traversal: Traversal, field: &str, operator: Operator, value: &Value) -> Traversal {
    tracing::debug!(
        field,
        operator = %operator,
        found = value.type_name(),
        "Ignoring condition with mismatched value shape"
    );
    traversal
}
