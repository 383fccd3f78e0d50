//! Mapper configuration.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`GSM__MAPPER__` prefix)
//! 2. Config file (`<prefix>.toml`, `[mapper]` section)
//! 3. Defaults

use serde::Deserialize;

use crate::cardinality::Dialect;
use crate::error::ConfigError;

/// Settings consumed by the query compiler and upsert engine.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct MapperConfig {
    /// Multi-valued property behavior of the backend.
    #[serde(default)]
    pub dialect: Dialect,

    /// Emit every compiled traversal as a debug event.
    #[serde(default)]
    pub debug_traversals: bool,
}

impl MapperConfig {
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_debug_traversals(mut self, enabled: bool) -> Self {
        self.debug_traversals = enabled;
        self
    }

    /// Load from `<file_prefix>.toml` (optional) and the environment.
    ///
    /// A missing `[mapper]` section yields the defaults.
    pub fn load(file_prefix: &str) -> Result<Self, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("GSM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match cfg.get::<MapperConfig>("mapper") {
            Ok(c) => Ok(c),
            Err(config::ConfigError::NotFound(_)) => Ok(MapperConfig::default()),
            Err(e) => Err(e.into()),
        }
    }
}
