//! Key-value stores that back [`AppStorage`](crate::storage::AppStorage).
//!
//! The [`KeyValueStore`] trait is the seam between typed bindings and the
//! place values actually live. [`MemoryStore`] is the ephemeral reference
//! implementation; [`FileStore`] persists a domain to disk and picks up
//! writes made by other processes.

mod file;
mod file_watcher;
mod memory;
mod value;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use futures::stream::BoxStream;

pub use file::{ExternalChanges, FileStore};
pub use file_watcher::{FileEvent, FileEventKind, FileWatcher};
pub use memory::MemoryStore;
pub use value::{StoredValue, ValueKind};
pub(crate) use value::has_scheme;

/// A thread-safe store mapping string keys to primitive values.
///
/// Implementations serialize their own mutations; callers may use a store
/// from any number of threads at once.
pub trait KeyValueStore: Send + Sync {
    /// Current value for `key`, or `None` when the key holds nothing.
    fn get(&self, key: &str) -> Option<StoredValue>;

    /// Write `value` under `key`. `None` removes the key.
    fn set(&self, key: &str, value: Option<StoredValue>);

    /// Observe `key`.
    ///
    /// The stream yields the current value immediately, then one item per
    /// subsequent mutation of the key. Every call returns an independent
    /// subscription; dropping the stream releases it.
    fn observe(&self, key: &str) -> BoxStream<'static, Option<StoredValue>>;

    /// Remove `key`.
    fn remove(&self, key: &str) {
        self.set(key, None);
    }
}

/// Shared handle to a store, as captured by bindings.
pub type SharedStore = Arc<dyn KeyValueStore>;

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Option<StoredValue> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Option<StoredValue>) {
        (**self).set(key, value);
    }

    fn observe(&self, key: &str) -> BoxStream<'static, Option<StoredValue>> {
        (**self).observe(key)
    }
}
