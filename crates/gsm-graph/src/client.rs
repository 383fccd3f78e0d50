//! Neo4j connection management and the Neo4j traversal backend.

use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query};
use serde::Deserialize;

use gsm_core::{Value, VertexId};

use crate::backend::{AddVertex, MergeVertex, PropertyAssignment, TraversalBackend};
use crate::error::GraphError;
use crate::traversal::Traversal;

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: "gsm-dev".to_string(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl GraphConfig {
    /// Load the `[neo4j]` section from `<file_prefix>.toml` (optional) and
    /// `GSM__NEO4J__*` environment variables. A missing section yields the
    /// defaults.
    pub fn load(file_prefix: &str) -> Result<Self, GraphError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("GSM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| GraphError::Connection(format!("Failed to load config: {e}")))?;

        match cfg.get::<GraphConfig>("neo4j") {
            Ok(c) => Ok(c),
            Err(config::ConfigError::NotFound(_)) => Ok(GraphConfig::default()),
            Err(e) => Err(GraphError::Connection(format!("Invalid neo4j config: {e}"))),
        }
    }
}

/// Thread-safe Neo4j client with connection pooling.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Execute a write-only query.
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }
}

#[async_trait]
impl TraversalBackend for GraphClient {
    async fn add_vertex(&self, mutation: &AddVertex) -> Result<VertexId, GraphError> {
        self.create_vertex(mutation).await
    }

    async fn merge_vertex(&self, mutation: &MergeVertex) -> Result<Option<VertexId>, GraphError> {
        self.merge_vertex_by_id(mutation).await
    }

    async fn value_maps(&self, traversal: &Traversal, keys: &[String]) -> Result<Vec<Value>, GraphError> {
        self.fetch_value_maps(traversal, keys).await
    }

    async fn count(&self, traversal: &Traversal) -> Result<u64, GraphError> {
        self.count_matching(traversal).await
    }

    async fn drop_vertices(&self, traversal: &Traversal) -> Result<(), GraphError> {
        self.delete_matching(traversal).await
    }

    async fn set_properties(
        &self,
        traversal: &Traversal,
        assignment: &PropertyAssignment,
    ) -> Result<u64, GraphError> {
        self.set_matching_properties(traversal, assignment).await
    }
}
