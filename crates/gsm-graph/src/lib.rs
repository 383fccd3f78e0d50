//! gsm-graph: typed vertex mapping over traversal backends.
//!
//! Records implementing [`gsm_core::Vertex`] are saved with
//! [`Mapper::save`] and queried through the fluent [`Query`] facade. Queries
//! compile to backend-agnostic [`Traversal`]s which a [`TraversalBackend`]
//! executes: [`MemoryGraph`] in process, or [`GraphClient`] against Neo4j.

pub mod backend;
pub mod client;
pub mod compiler;
pub mod decode;
pub mod error;
pub mod mapper;
pub mod memory;
pub mod mutations;
pub mod queries;
pub mod query;
pub mod traversal;
mod upsert;

pub use backend::{AddVertex, MergeVertex, PropertyAssignment, TraversalBackend};
pub use client::{GraphClient, GraphConfig};
pub use compiler::{Condition, Operator, OrderClause, QueryCompiler, QuerySpec};
pub use error::{GraphError, MapperError, Result};
pub use mapper::Mapper;
pub use memory::MemoryGraph;
pub use query::{Query, RawQuery};
pub use traversal::{anon, Order, Predicate, Source, Step, Traversal};
