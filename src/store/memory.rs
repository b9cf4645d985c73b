use std::{
    collections::{BTreeMap, HashMap},
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    task::{Context, Poll},
};

use futures::{Stream, StreamExt, stream::BoxStream};
use tracing::trace;

use super::{KeyValueStore, StoredValue};
use crate::subject::{BroadcastSubject, Subscription};

/// Ephemeral, in-process key-value store.
///
/// Each observed key gets a replaying [`BroadcastSubject`] seeded with the
/// key's current value, so every observer sees the present state first. The
/// subject is discarded as soon as its last observer goes away.
/// Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    values: HashMap<String, StoredValue>,
    subjects: HashMap<String, BroadcastSubject<Option<StoredValue>>>,
}

impl MemoryState {
    /// Applies a mutation and notifies the key's observers while the caller
    /// still holds the store lock.
    fn apply(&mut self, key: &str, value: Option<StoredValue>) {
        match &value {
            Some(value) => {
                self.values.insert(key.to_string(), value.clone());
            }
            None => {
                self.values.remove(key);
            }
        }

        if let Some(subject) = self.subjects.get(key) {
            subject.send(value);
        }
        self.prune(key);
    }

    fn prune(&mut self, key: &str) {
        if self
            .subjects
            .get(key)
            .is_some_and(|subject| subject.subscriber_count() == 0)
        {
            self.subjects.remove(key);
            trace!(key, "released unobserved key");
        }
    }
}

fn lock_state(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given entries.
    pub fn with_values<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, StoredValue)>,
    {
        let store = Self::new();
        {
            let mut state = store.lock();
            state
                .values
                .extend(entries.into_iter().map(|(key, value)| (key.into(), value)));
        }
        store
    }

    /// Sorted copy of every entry.
    pub fn snapshot(&self) -> BTreeMap<String, StoredValue> {
        self.lock()
            .values
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Sorted list of keys currently holding a value.
    pub fn keys(&self) -> Vec<String> {
        self.snapshot().into_keys().collect()
    }

    /// Number of live observers of `key`.
    pub fn observer_count(&self, key: &str) -> usize {
        self.lock()
            .subjects
            .get(key)
            .map_or(0, BroadcastSubject::subscriber_count)
    }

    /// Number of keys that currently have live observers.
    pub(crate) fn observed_keys(&self) -> usize {
        self.lock().subjects.len()
    }

    /// Replaces the whole content, notifying observers of every key whose
    /// value changed. Returns the changed keys in sorted order.
    pub fn replace_all(&self, entries: HashMap<String, StoredValue>) -> Vec<String> {
        let mut state = self.lock();

        let mut changed: Vec<String> = state
            .values
            .keys()
            .chain(entries.keys())
            .filter(|key| state.values.get(*key) != entries.get(*key))
            .cloned()
            .collect();
        changed.sort();
        changed.dedup();

        for key in &changed {
            state.apply(key, entries.get(key).cloned());
        }

        trace!(changed = changed.len(), "memory store replaced");
        changed
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        lock_state(&self.state)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.lock().values.get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<StoredValue>) {
        trace!(key, removed = value.is_none(), "memory store write");
        self.lock().apply(key, value);
    }

    fn observe(&self, key: &str) -> BoxStream<'static, Option<StoredValue>> {
        let mut state = self.lock();
        let current = state.values.get(key).cloned();

        let subject = state.subjects.entry(key.to_string()).or_insert_with(|| {
            let subject = BroadcastSubject::replay_last();
            subject.send(current);
            subject
        });

        Observation {
            key: key.to_string(),
            subscription: Some(subject.subscribe()),
            state: Arc::downgrade(&self.state),
        }
        .boxed()
    }
}

/// One observer of a key. Dropping it releases the key's subject once no
/// other observer is left.
struct Observation {
    key: String,
    subscription: Option<Subscription<Option<StoredValue>>>,
    state: Weak<Mutex<MemoryState>>,
}

impl Stream for Observation {
    type Item = Option<StoredValue>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.poll_next_unpin(cx),
            None => Poll::Ready(None),
        }
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        drop(self.subscription.take());

        if let Some(state) = self.state.upgrade() {
            lock_state(&state).prune(&self.key);
        }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MemoryStore")
            .field("entries", &state.values.len())
            .field("observed_keys", &state.subjects.len())
            .finish()
    }
}
