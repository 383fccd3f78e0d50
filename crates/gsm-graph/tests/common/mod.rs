//! Shared fixtures for the mapper tests: vertex types and a recording
//! backend wrapped around `MemoryGraph`.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gsm_core::{Embedded, MapperConfig, SchemaBuilder, Value, Vertex, VertexBase, VertexId};
use gsm_graph::{
    AddVertex, GraphError, Mapper, MemoryGraph, MergeVertex, PropertyAssignment, Traversal,
    TraversalBackend,
};

// ── Vertex types ─────────────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Person {
    pub base: VertexBase,
    pub name: String,
    pub age: i64,
    pub tags: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    pub nickname: Option<String>,
    pub scratch: String,
}

impl Person {
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            name: name.to_string(),
            age,
            ..Self::default()
        }
    }
}

impl Embedded for Person {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .embed(|p| &p.base, |p| &mut p.base)
            .field("name", |p| &p.name, |p| &mut p.name)
            .field("age", |p| &p.age, |p| &mut p.age)
            .field("tags", |p| &p.tags, |p| &mut p.tags)
            .field("attrs", |p| &p.attrs, |p| &mut p.attrs)
            .field("nickname", |p| &p.nickname, |p| &mut p.nickname)
    }
}

impl Vertex for Person {
    fn base(&self) -> &VertexBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VertexBase {
        &mut self.base
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Account {
    pub base: VertexBase,
    pub email: String,
}

impl Embedded for Account {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .embed(|a| &a.base, |a| &mut a.base)
            .field("email", |a| &a.email, |a| &mut a.email)
    }
}

impl Vertex for Account {
    fn base(&self) -> &VertexBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VertexBase {
        &mut self.base
    }

    fn label() -> &'static str {
        "user_account"
    }
}

/// Registers a property twice.
#[derive(Debug, Default)]
pub struct Clash {
    pub base: VertexBase,
    pub first: String,
    pub second: String,
}

impl Embedded for Clash {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .embed(|c| &c.base, |c| &mut c.base)
            .field("name", |c| &c.first, |c| &mut c.first)
            .field("name", |c| &c.second, |c| &mut c.second)
    }
}

impl Vertex for Clash {
    fn base(&self) -> &VertexBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VertexBase {
        &mut self.base
    }
}

/// Forgets to embed the vertex base.
#[derive(Debug, Default)]
pub struct Baseless {
    pub base: VertexBase,
    pub name: String,
}

impl Embedded for Baseless {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema.field("name", |b| &b.name, |b| &mut b.name)
    }
}

impl Vertex for Baseless {
    fn base(&self) -> &VertexBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VertexBase {
        &mut self.base
    }
}

// ── Recording backend ────────────────────────────────────────────

/// Delegates to a `MemoryGraph` and records every submission.
#[derive(Debug, Default)]
pub struct Recorder {
    graph: MemoryGraph,
    added: Mutex<Vec<AddVertex>>,
    merged: Mutex<Vec<MergeVertex>>,
    traversals: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new(graph: MemoryGraph) -> Self {
        Self {
            graph,
            ..Self::default()
        }
    }

    pub fn graph(&self) -> &MemoryGraph {
        &self.graph
    }

    pub fn added(&self) -> Vec<AddVertex> {
        self.added.lock().unwrap().clone()
    }

    pub fn merged(&self) -> Vec<MergeVertex> {
        self.merged.lock().unwrap().clone()
    }

    pub fn traversals(&self) -> Vec<String> {
        self.traversals.lock().unwrap().clone()
    }

    pub fn last_traversal(&self) -> Option<String> {
        self.traversals.lock().unwrap().last().cloned()
    }

    fn record(&self, traversal: &Traversal) {
        self.traversals.lock().unwrap().push(traversal.to_string());
    }
}

#[async_trait]
impl TraversalBackend for Recorder {
    async fn add_vertex(&self, mutation: &AddVertex) -> Result<VertexId, GraphError> {
        self.added.lock().unwrap().push(mutation.clone());
        self.graph.add_vertex(mutation).await
    }

    async fn merge_vertex(&self, mutation: &MergeVertex) -> Result<Option<VertexId>, GraphError> {
        self.merged.lock().unwrap().push(mutation.clone());
        self.graph.merge_vertex(mutation).await
    }

    async fn value_maps(&self, traversal: &Traversal, keys: &[String]) -> Result<Vec<Value>, GraphError> {
        self.record(traversal);
        self.graph.value_maps(traversal, keys).await
    }

    async fn count(&self, traversal: &Traversal) -> Result<u64, GraphError> {
        self.record(traversal);
        self.graph.count(traversal).await
    }

    async fn drop_vertices(&self, traversal: &Traversal) -> Result<(), GraphError> {
        self.record(traversal);
        self.graph.drop_vertices(traversal).await
    }

    async fn set_properties(
        &self,
        traversal: &Traversal,
        assignment: &PropertyAssignment,
    ) -> Result<u64, GraphError> {
        self.record(traversal);
        self.graph.set_properties(traversal, assignment).await
    }
}

/// Route mapper events to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Buffers formatted log lines for assertions.
#[derive(Debug, Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// A DEBUG-level subscriber writing into this buffer.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        let sink = self.clone();
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A mapper over a fresh recording in-memory graph using the config's
/// dialect.
pub fn setup(config: MapperConfig) -> (Mapper, Arc<Recorder>) {
    init_tracing();
    let recorder = Arc::new(Recorder::new(MemoryGraph::with_dialect(config.dialect)));
    let backend: Arc<dyn TraversalBackend> = recorder.clone();
    (Mapper::from_arc(backend, config), recorder)
}

/// Save each person, returning the saved records in order.
pub async fn seed(mapper: &Mapper, people: Vec<Person>) -> Vec<Person> {
    let mut saved = Vec::with_capacity(people.len());
    for mut person in people {
        mapper.save(&mut person).await.unwrap();
        saved.push(person);
    }
    saved
}
