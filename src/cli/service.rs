use std::{future::Future, io::Write, path::Path, time::Duration};

use futures::StreamExt;
use tracing::{debug, instrument};

use super::{
    CliError, Command, CommandResult,
    formatting::{format_entry, format_value},
};
use crate::{
    config::{StorageConfig, StoreConfig},
    store::{FileStore, KeyValueStore, StoredValue},
};

/// Executes parsed commands against one persisted domain.
#[derive(Debug, Clone)]
pub struct CliService {
    store: FileStore,
    watch_external: bool,
    debounce: Duration,
}

impl CliService {
    /// Creates a service operating on `store` with the watch settings of `config`.
    pub fn new(store: FileStore, config: &StoreConfig) -> Self {
        Self {
            store,
            watch_external: config.watch_external,
            debounce: config.debounce(),
        }
    }

    /// Opens the domain named by `config`, or `domain` when given.
    ///
    /// # Errors
    /// Returns error if the domain path cannot be resolved or the domain file is invalid.
    pub fn from_config(config: &StorageConfig, domain: Option<&str>) -> Result<Self, CliError> {
        let mut store_config = config.store.clone();
        if let Some(domain) = domain {
            store_config.domain = domain.to_string();
        }

        let path = store_config.domain_path()?;
        let store = FileStore::open(&path)?;

        Ok(Self::new(store, &store_config))
    }

    /// The domain being operated on.
    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Path of the domain file.
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Executes a one-shot command and returns its output.
    ///
    /// # Errors
    /// Returns `CliError::InvalidArguments` for `watch`, which streams its
    /// output through [`CliService::watch`], and `CliError::Storage` when a
    /// value cannot be parsed.
    #[instrument(skip(self), fields(domain = %self.store.path().display()))]
    pub fn execute(&self, command: &Command) -> CommandResult {
        match command {
            Command::Get { key, kind } => {
                let value = self
                    .store
                    .get(key)
                    .filter(|value| kind.is_none_or(|kind| value.kind() == kind));

                Ok(format_value(value.as_ref()))
            }
            Command::Set { key, value, kind } => {
                let value = StoredValue::parse(*kind, value)?;
                self.store.set(key, Some(value.clone()));

                Ok(format_entry(key, Some(&value)))
            }
            Command::Remove { key } => {
                let existed = self.store.get(key).is_some();
                self.store.remove(key);
                debug!(key, existed, "removed key");

                Ok(String::new())
            }
            Command::List => {
                let lines: Vec<String> = self
                    .store
                    .snapshot()
                    .iter()
                    .map(|(key, value)| format_entry(key, Some(value)))
                    .collect();

                Ok(lines.join("\n"))
            }
            Command::Schema => Ok(StorageConfig::schema()?),
            Command::Watch { .. } => Err(CliError::InvalidArguments(
                "'watch' streams output and must be run through CliService::watch".to_string(),
            )),
        }
    }

    /// Writes `key = value` for the current value of `key` and then for every
    /// change, until `shutdown` resolves.
    ///
    /// When external watching is enabled, writes made by other processes to
    /// the domain file are picked up as well.
    ///
    /// # Errors
    /// Returns error if the file watcher cannot be started or writing to `out` fails.
    pub async fn watch<W, F>(&self, key: &str, shutdown: F, out: &mut W) -> Result<(), CliError>
    where
        W: Write,
        F: Future<Output = ()>,
    {
        let _external = if self.watch_external {
            Some(self.store.watch_external_changes(self.debounce).await?)
        } else {
            None
        };

        let mut values = self.store.observe(key);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                value = values.next() => {
                    let Some(value) = value else {
                        break;
                    };

                    writeln!(out, "{}", format_entry(key, value.as_ref()))?;
                    out.flush()?;
                }
            }
        }

        debug!(key, "watch ended");
        Ok(())
    }
}
