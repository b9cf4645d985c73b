use std::{io, path::PathBuf, time::Duration};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigPaths;

/// Settings for the persisted domain the tool operates on.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Name of the domain; stored as `<directory>/<domain>.json`.
    pub domain: String,

    /// Directory holding domain files. Defaults to the data directory's
    /// `defaults` folder.
    pub directory: Option<PathBuf>,

    /// Reload the domain when other processes modify it.
    pub watch_external: bool,

    /// Quiet period in milliseconds before an external change is reloaded.
    pub debounce_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            domain: "default".to_string(),
            directory: None,
            watch_external: true,
            debounce_ms: 200,
        }
    }
}

impl StoreConfig {
    /// Path of the configured domain file.
    ///
    /// # Errors
    /// Returns error if no directory is configured and the data directory
    /// cannot be resolved.
    pub fn domain_path(&self) -> Result<PathBuf, io::Error> {
        let directory = match &self.directory {
            Some(directory) => directory.clone(),
            None => ConfigPaths::defaults_dir()?,
        };

        Ok(directory.join(format!("{}.json", self.domain)))
    }

    /// Debounce window for external change reloads.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
