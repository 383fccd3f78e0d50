//! Backend-agnostic traversal model.
//!
//! A [`Traversal`] is a source (`g.V()`, `g.V(ids)`, or the anonymous `__`)
//! followed by filter and paging steps. Backends interpret it; the query
//! compiler produces it. `Display` renders Gremlin-style text for
//! diagnostics.

use std::fmt;

use gsm_core::{Value, VertexId};

/// Sort direction for `order().by(..)`.
///
/// Vertices missing the property sort last ascending and first descending,
/// on every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Asc => f.write_str("asc"),
            Order::Desc => f.write_str("desc"),
        }
    }
}

/// Property predicate used by `has(field, predicate)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Value),
    Neq(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Within(Vec<Value>),
    Without(Vec<Value>),
    Containing(String),
}

impl Predicate {
    /// Evaluate the predicate against one property value.
    pub fn test(&self, candidate: &Value) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};

        match self {
            Predicate::Eq(v) => candidate.loosely_equals(v),
            Predicate::Neq(v) => !candidate.loosely_equals(v),
            Predicate::Gt(v) => candidate.compare(v) == Some(Greater),
            Predicate::Gte(v) => matches!(candidate.compare(v), Some(Greater | Equal)),
            Predicate::Lt(v) => candidate.compare(v) == Some(Less),
            Predicate::Lte(v) => matches!(candidate.compare(v), Some(Less | Equal)),
            Predicate::Within(set) => set.iter().any(|v| candidate.loosely_equals(v)),
            Predicate::Without(set) => !set.iter().any(|v| candidate.loosely_equals(v)),
            Predicate::Containing(needle) => candidate
                .as_str()
                .is_some_and(|haystack| haystack.contains(needle.as_str())),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Eq(v) => write!(f, "eq({v})"),
            Predicate::Neq(v) => write!(f, "neq({v})"),
            Predicate::Gt(v) => write!(f, "gt({v})"),
            Predicate::Gte(v) => write!(f, "gte({v})"),
            Predicate::Lt(v) => write!(f, "lt({v})"),
            Predicate::Lte(v) => write!(f, "lte({v})"),
            Predicate::Within(set) => write!(f, "within({})", join(set)),
            Predicate::Without(set) => write!(f, "without({})", join(set)),
            Predicate::Containing(s) => write!(f, "containing('{s}')"),
        }
    }
}

/// Where a traversal starts.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// `g.V()` when empty, `g.V(ids..)` otherwise.
    Vertices(Vec<VertexId>),
    /// `__`: a child traversal evaluated against its parent's vertices.
    Anonymous,
}

/// One traversal step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    HasLabel(String),
    HasId(Vec<VertexId>),
    Has(String, Predicate),
    Where(Traversal),
    Dedup,
    OrderBy(String, Order),
    Skip(u64),
    Limit(u64),
}

impl Step {
    /// Filter steps keep or discard single vertices without looking at
    /// the rest of the stream.
    pub fn is_filter(&self) -> bool {
        matches!(
            self,
            Step::HasLabel(_) | Step::HasId(_) | Step::Has(..) | Step::Where(_)
        )
    }
}

/// A composable vertex traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    source: Source,
    steps: Vec<Step>,
}

/// Start an anonymous traversal, Gremlin's `__`.
pub fn anon() -> Traversal {
    Traversal::anonymous()
}

impl Traversal {
    /// `g.V()`
    pub fn vertices() -> Self {
        Self {
            source: Source::Vertices(Vec::new()),
            steps: Vec::new(),
        }
    }

    /// `g.V(ids..)`
    pub fn vertices_by_id(ids: Vec<VertexId>) -> Self {
        Self {
            source: Source::Vertices(ids),
            steps: Vec::new(),
        }
    }

    /// `__`
    pub fn anonymous() -> Self {
        Self {
            source: Source::Anonymous,
            steps: Vec::new(),
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn push(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn has_label(self, label: impl Into<String>) -> Self {
        self.push(Step::HasLabel(label.into()))
    }

    pub fn has_id(self, ids: Vec<VertexId>) -> Self {
        self.push(Step::HasId(ids))
    }

    /// `has(field, eq(value))`
    pub fn has(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(Step::Has(field.into(), Predicate::Eq(value.into())))
    }

    pub fn has_predicate(self, field: impl Into<String>, predicate: Predicate) -> Self {
        self.push(Step::Has(field.into(), predicate))
    }

    pub fn where_(self, sub: Traversal) -> Self {
        self.push(Step::Where(sub))
    }

    pub fn dedup(self) -> Self {
        self.push(Step::Dedup)
    }

    pub fn order_by(self, field: impl Into<String>, order: Order) -> Self {
        self.push(Step::OrderBy(field.into(), order))
    }

    pub fn skip(self, n: u64) -> Self {
        self.push(Step::Skip(n))
    }

    pub fn limit(self, n: u64) -> Self {
        self.push(Step::Limit(n))
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Source::Vertices(ids) if ids.is_empty() => f.write_str("g.V()")?,
            Source::Vertices(ids) => write!(f, "g.V({})", join(ids))?,
            Source::Anonymous => f.write_str("__")?,
        }
        for step in &self.steps {
            match step {
                Step::HasLabel(label) => write!(f, ".hasLabel('{label}')")?,
                Step::HasId(ids) => write!(f, ".hasId({})", join(ids))?,
                Step::Has(field, predicate) => write!(f, ".has('{field}', {predicate})")?,
                Step::Where(sub) => write!(f, ".where({sub})")?,
                Step::Dedup => f.write_str(".dedup()")?,
                Step::OrderBy(field, order) => write!(f, ".order().by('{field}', {order})")?,
                Step::Skip(n) => write!(f, ".skip({n})")?,
                Step::Limit(n) => write!(f, ".limit({n})")?,
            }
        }
        Ok(())
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
