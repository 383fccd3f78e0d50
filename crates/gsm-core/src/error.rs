use thiserror::Error;

/// Contract violations detected when a record type's schema is registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Duplicate property '{name}' in schema for {type_name}")]
    DuplicateProperty { type_name: String, name: String },

    #[error("Schema for {type_name} does not embed the vertex base (missing '{missing}')")]
    MissingBase { type_name: String, missing: String },

    #[error("Schema registry holds a mismatched entry for {type_name}")]
    Unregistered { type_name: String },
}

/// Errors loading mapper configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),
}
