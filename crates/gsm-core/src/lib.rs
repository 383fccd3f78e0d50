//! gsm-core: the entity mapper's building blocks.
//!
//! This crate provides everything that does not talk to a backend:
//! - The entity contract (`Vertex`, `VertexBase`, `VertexId`)
//! - Property values and the `Property` conversion trait
//! - Static schema descriptors that flatten records into property maps
//! - Label resolution and the dialect-aware cardinality policy
//! - Mapper configuration and schema errors

pub mod cardinality;
pub mod config;
pub mod error;
pub mod label;
pub mod schema;
pub mod types;
pub mod value;

pub use cardinality::{cardinality_for, property_writes, Cardinality, Dialect, PropertyWrite};
pub use config::MapperConfig;
pub use error::{ConfigError, SchemaError};
pub use label::label_for;
pub use schema::{schema_of, FieldDescriptor, Schema, SchemaBuilder};
pub use types::{Embedded, Vertex, VertexBase, VertexId};
pub use value::{FieldKind, Property, PropertyMap, Value};
