use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use futures::stream::BoxStream;
use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, error, info, instrument, trace, warn};

use super::{FileWatcher, KeyValueStore, MemoryStore, StoredValue};
use crate::{config::ConfigPaths, core::StorageError};

/// A key-value domain persisted as a JSON file.
///
/// Reads and observation are served from an in-memory mirror. Every write
/// goes through the mirror first (so observers are notified immediately) and
/// is then flushed to disk with an atomic replace. Clones share state.
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<FileStoreInner>,
}

struct FileStoreInner {
    path: PathBuf,
    memory: MemoryStore,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens the domain stored at `path`.
    ///
    /// A missing or blank file is an empty domain. Parent directories are
    /// created as needed.
    ///
    /// # Errors
    /// Returns `StorageError::Persistence` if the file exists but cannot be read
    /// or does not contain a valid domain.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::IoError {
                path: parent.to_path_buf(),
                details: e.to_string(),
            })?;
        }

        let entries = read_domain(&path)?;
        info!(entries = entries.len(), "opened domain");

        Ok(Self {
            inner: Arc::new(FileStoreInner {
                path,
                memory: MemoryStore::with_values(entries),
                write_lock: Mutex::new(()),
            }),
        })
    }

    /// Opens the named domain inside the default defaults directory.
    ///
    /// # Errors
    /// Returns error if the defaults directory cannot be resolved or the
    /// domain file is invalid.
    pub fn open_domain(domain: &str) -> Result<Self, StorageError> {
        let directory = ConfigPaths::defaults_dir()?;
        Self::open(directory.join(format!("{domain}.json")))
    }

    /// The domain file backing this store.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Sorted copy of every entry.
    pub fn snapshot(&self) -> BTreeMap<String, StoredValue> {
        self.inner.memory.snapshot()
    }

    /// Number of live observers of `key`.
    pub fn observer_count(&self, key: &str) -> usize {
        self.inner.memory.observer_count(key)
    }

    /// Rereads the domain file and notifies observers of changed keys.
    ///
    /// # Errors
    /// Returns `StorageError::Persistence` if the file cannot be parsed; the
    /// in-memory state is left untouched in that case.
    #[instrument(skip(self), fields(path = %self.inner.path.display()))]
    pub fn reload(&self) -> Result<Vec<String>, StorageError> {
        let _guard = self.write_guard();
        let entries = read_domain(&self.inner.path)?;
        let changed = self.inner.memory.replace_all(entries);

        if !changed.is_empty() {
            debug!(?changed, "domain reloaded");
        }

        Ok(changed)
    }

    /// Watches the domain file and reloads it when another process edits it.
    ///
    /// Bursts of file events are coalesced: a reload happens once no new
    /// event arrived for `debounce`. Watching stops when the returned guard
    /// is dropped.
    ///
    /// # Errors
    /// Returns `StorageError::FileWatch` if the watcher cannot be started.
    pub async fn watch_external_changes(
        &self,
        debounce: Duration,
    ) -> Result<ExternalChanges, StorageError> {
        let (watcher, mut event_rx) = FileWatcher::new(&self.inner.path)?;
        info!(path = %watcher.path().display(), "watching domain for external changes");
        let store = self.clone();

        let task = tokio::spawn(async move {
            let _watcher = watcher;
            let mut pending = false;

            let debounce_sleep = tokio::time::sleep(debounce);
            tokio::pin!(debounce_sleep);

            loop {
                tokio::select! {
                    event = event_rx.recv() => {
                        let Some(event) = event else {
                            break;
                        };

                        trace!(
                            path = %event.path.display(),
                            kind = ?event.kind,
                            "domain file event"
                        );
                        pending = true;
                        debounce_sleep.as_mut().reset(Instant::now() + debounce);
                    }

                    _ = &mut debounce_sleep, if pending => {
                        pending = false;

                        if let Err(e) = store.reload() {
                            warn!(error = %e, "failed to reload domain");
                        }
                    }
                }
            }
        });

        Ok(ExternalChanges { task })
    }

    fn persist(&self) -> Result<(), StorageError> {
        let path = &self.inner.path;
        let snapshot = self.inner.memory.snapshot();

        let content = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| StorageError::persistence(e, path))?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| StorageError::persistence(e, &temp_path))?;
        fs::rename(&temp_path, path).map_err(|e| StorageError::persistence(e, path))?;

        Ok(())
    }

    fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.inner
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.inner.memory.get(key)
    }

    fn set(&self, key: &str, value: Option<StoredValue>) {
        let _guard = self.write_guard();
        self.inner.memory.set(key, value);

        if let Err(e) = self.persist() {
            error!(key, error = %e, "failed to persist domain");
        }
    }

    fn observe(&self, key: &str) -> BoxStream<'static, Option<StoredValue>> {
        self.inner.memory.observe(key)
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.inner.path)
            .field("memory", &self.inner.memory)
            .finish()
    }
}

/// Guard returned by [`FileStore::watch_external_changes`].
///
/// Dropping it stops the watcher task.
#[derive(Debug)]
pub struct ExternalChanges {
    task: JoinHandle<()>,
}

impl ExternalChanges {
    /// Stop watching. Equivalent to dropping the guard.
    pub fn stop(self) {}
}

impl Drop for ExternalChanges {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn read_domain(path: &Path) -> Result<HashMap<String, StoredValue>, StorageError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let content = fs::read_to_string(path).map_err(|e| StorageError::persistence(e, path))?;
    if content.trim().is_empty() {
        return Ok(HashMap::new());
    }

    serde_json::from_str(&content).map_err(|e| StorageError::persistence(e, path))
}
