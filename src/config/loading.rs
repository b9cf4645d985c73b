use std::{fs, path::Path};

use tracing::{debug, instrument};

use super::{ConfigPaths, StorageConfig};
use crate::core::{Result, StorageError};

const DEFAULT_CONFIG_HEADER: &str = "# app-storage configuration file\n";

impl StorageConfig {
    /// Loads the configuration file at `path`
    ///
    /// A missing file is created with a commented header and yields the
    /// default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or created
    /// - The TOML content is invalid
    /// - The content does not match the configuration schema
    #[instrument]
    pub fn load(path: &Path) -> Result<StorageConfig> {
        if !path.exists() {
            create_default_config_file(path)?;
        }

        let content = fs::read_to_string(path).map_err(|e| StorageError::IoError {
            path: path.to_path_buf(),
            details: format!("Failed to read config: {e}"),
        })?;

        let config = Self::parse(&content, Some(path))?;
        debug!(domain = %config.store.domain, "configuration loaded");

        Ok(config)
    }

    /// Loads the configuration from its default location
    ///
    /// # Errors
    /// Returns an error if the location cannot be determined or the file is invalid
    pub fn load_default() -> Result<StorageConfig> {
        let path = ConfigPaths::main_config()?;
        Self::load(&path)
    }

    /// Parses configuration from TOML text
    ///
    /// # Errors
    /// Returns an error if the text is not valid TOML or does not match the schema
    pub fn parse(content: &str, path: Option<&Path>) -> Result<StorageConfig> {
        let value: toml::Value =
            toml::from_str(content).map_err(|e| StorageError::toml_parse(e, path))?;

        let config: StorageConfig =
            value
                .try_into()
                .map_err(|e| StorageError::ConfigValidation {
                    component: "config parsing".to_string(),
                    details: format!("Configuration validation failed: {e}"),
                })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let domain = &self.store.domain;

        if domain.is_empty() || domain.contains(['/', '\\']) || domain.starts_with('.') {
            return Err(StorageError::ConfigValidation {
                component: "store.domain".to_string(),
                details: format!("'{domain}' is not a valid domain name"),
            });
        }

        Ok(())
    }
}

fn create_default_config_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::IoError {
            path: parent.to_path_buf(),
            details: format!("Failed to create config directory: {e}"),
        })?;
    }

    fs::write(path, DEFAULT_CONFIG_HEADER).map_err(|e| StorageError::IoError {
        path: path.to_path_buf(),
        details: format!("Failed to create config file: {e}"),
    })
}
