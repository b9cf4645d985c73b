//! Configuration schema definitions.
//!
//! Defines the configuration for the storage tool: logging settings and
//! which persisted domain to operate on. Configurations are serializable
//! to and from TOML.

mod general;
mod loading;
mod paths;
mod store;


pub use general::{GeneralConfig, LogFormat, LogLevel};
pub use paths::ConfigPaths;
pub use store::StoreConfig;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Main configuration structure.
///
/// Represents the complete configuration schema that can be loaded
/// from TOML files. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
pub struct StorageConfig {
    /// General application settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Persisted domain settings.
    #[serde(default)]
    pub store: StoreConfig,
}

impl StorageConfig {
    /// JSON schema of the configuration file, pretty printed.
    ///
    /// # Errors
    /// Returns error if the schema cannot be serialized.
    pub fn schema() -> Result<String, serde_json::Error> {
        let schema = schemars::schema_for!(StorageConfig);
        serde_json::to_string_pretty(&schema)
    }
}
