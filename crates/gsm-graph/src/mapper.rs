//! The mapper handle applications hold.

use std::sync::Arc;

use gsm_core::{label_for, MapperConfig, Value, Vertex};

use crate::backend::TraversalBackend;
use crate::compiler::{Operator, QueryCompiler};
use crate::query::{Query, RawQuery};

/// Entry point for saving and querying vertex records.
///
/// Holds a shared backend and immutable configuration. Clone is cheap.
#[derive(Clone)]
pub struct Mapper {
    backend: Arc<dyn TraversalBackend>,
    config: MapperConfig,
    compiler: QueryCompiler,
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Mapper {
    pub fn new(backend: impl TraversalBackend + 'static, config: MapperConfig) -> Self {
        Self::from_arc(Arc::new(backend), config)
    }

    /// Share an already wrapped backend, e.g. one the caller also queries
    /// directly.
    pub fn from_arc(backend: Arc<dyn TraversalBackend>, config: MapperConfig) -> Self {
        let compiler = QueryCompiler::new(&config);
        Self {
            backend,
            config,
            compiler,
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn TraversalBackend {
        self.backend.as_ref()
    }

    pub(crate) fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    /// Start a query over every vertex of `T`'s label.
    pub fn model<T: Vertex>(&self) -> Query<T> {
        Query::new(self.clone(), label_for::<T>())
    }

    /// Shortcut for `model::<T>().where_(field, operator, value)`.
    pub fn where_<T: Vertex>(
        &self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Query<T> {
        self.model::<T>().where_(field, operator, value)
    }

    /// Start an untyped query over an arbitrary label.
    pub fn label(&self, label: impl Into<String>) -> RawQuery {
        RawQuery::new(self.clone(), label.into())
    }
}
