//! Application configuration.
//!
//! Aggregates the server, storage and query settings into a single Config
//! struct that can be loaded from YAML files or environment variables.

mod server;
mod storage;

pub use server::ServerConfig;
pub use storage::{FileConfig, PostgresConfig, SqliteConfig, StorageConfig, StorageType};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "GAPKEEPER_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "GAPKEEPER";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "GAPKEEPER_LOG";

use serde::Deserialize;

use crate::query::{OrderPolicy, DEFAULT_ORDER_FIELD};

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener configuration.
    pub server: ServerConfig,
    /// Storage backend selection.
    pub storage: StorageConfig,
    /// List query defaults.
    pub query: QueryConfig,
}

/// List query defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Sort field used when a request does not name one.
    pub default_order_field: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_order_field: DEFAULT_ORDER_FIELD.to_string(),
        }
    }
}

impl QueryConfig {
    pub fn order_policy(&self) -> OrderPolicy {
        OrderPolicy::new(self.default_order_field.clone())
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        Ok(config)
    }

    /// Create config for testing: in-memory storage, defaults elsewhere.
    pub fn for_test() -> Self {
        Self {
            storage: StorageConfig {
                storage_type: StorageType::Memory,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
