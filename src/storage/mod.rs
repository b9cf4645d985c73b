//! Typed, defaulted bindings to a single key of a key-value store.

mod codec;

#[cfg(test)]
mod tests;

use std::{fmt, sync::Arc};

use futures::{Stream, StreamExt};
use tracing::{debug, trace};

pub use codec::{RawRepresentable, StorageValue, Uri};

use crate::{
    dependencies::Dependencies,
    store::{SharedStore, StoredValue},
};

type Encode<T> = Arc<dyn Fn(&T) -> Option<StoredValue> + Send + Sync>;
type Decode<T> = Arc<dyn Fn(StoredValue) -> Option<T> + Send + Sync>;

/// A typed view over one key of a [`KeyValueStore`](crate::store::KeyValueStore).
///
/// The store is resolved exactly once, when the binding is constructed:
/// either the store passed explicitly, or the ambient store of the
/// constructing thread's [`Dependencies`]. Changing the ambient store later
/// does not retarget existing bindings.
///
/// Reads substitute the default for a missing key or a value of the wrong
/// kind. None of the operations fail.
pub struct AppStorage<T> {
    key: String,
    default: T,
    store: SharedStore,
    encode: Encode<T>,
    decode: Decode<T>,
}

impl<T> Clone for AppStorage<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            default: self.default.clone(),
            store: Arc::clone(&self.store),
            encode: Arc::clone(&self.encode),
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<T> AppStorage<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Bind `key` in the ambient store.
    #[track_caller]
    pub fn new(key: impl Into<String>, default: T) -> Self
    where
        T: StorageValue,
    {
        Self::from_parts(key, default, None, T::decode, T::encode)
    }

    /// Bind `key` in an explicit store.
    pub fn with_store(key: impl Into<String>, default: T, store: SharedStore) -> Self
    where
        T: StorageValue,
    {
        Self::from_parts(key, default, Some(store), T::decode, T::encode)
    }

    /// Bind a raw-representable value in the ambient store.
    #[track_caller]
    pub fn raw(key: impl Into<String>, default: T) -> Self
    where
        T: RawRepresentable,
    {
        Self::from_parts(key, default, None, decode_raw::<T>, encode_raw::<T>)
    }

    /// Bind a raw-representable value in an explicit store.
    pub fn raw_with_store(key: impl Into<String>, default: T, store: SharedStore) -> Self
    where
        T: RawRepresentable,
    {
        Self::from_parts(key, default, Some(store), decode_raw::<T>, encode_raw::<T>)
    }

    /// Bind `key` with a custom codec.
    ///
    /// Without an explicit `store` the ambient store is captured now. An
    /// `encode` result of `None` removes the key instead of storing a value.
    #[track_caller]
    pub fn from_parts<D, E>(
        key: impl Into<String>,
        default: T,
        store: Option<SharedStore>,
        decode: D,
        encode: E,
    ) -> Self
    where
        D: Fn(StoredValue) -> Option<T> + Send + Sync + 'static,
        E: Fn(&T) -> Option<StoredValue> + Send + Sync + 'static,
    {
        let key = key.into();
        let store = match store {
            Some(store) => store,
            None => Dependencies::current().resolve_store(),
        };

        trace!(key = %key, "storage binding created");

        Self {
            key,
            default,
            store,
            encode: Arc::new(encode),
            decode: Arc::new(decode),
        }
    }

    /// The bound key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value reported when the key is absent or undecodable.
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// The store captured at construction.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Current value, or the default.
    pub fn get(&self) -> T {
        self.store
            .get(&self.key)
            .and_then(|raw| (self.decode)(raw))
            .unwrap_or_else(|| self.default.clone())
    }

    /// Write `value` through to the store.
    pub fn set(&self, value: T) {
        let encoded = (self.encode)(&value);
        debug!(key = %self.key, removed = encoded.is_none(), "storage set");
        self.store.set(&self.key, encoded);
    }

    /// Remove the key so that reads fall back to the default.
    pub fn reset(&self) {
        debug!(key = %self.key, "storage reset");
        self.store.remove(&self.key);
    }

    /// Observe the value.
    ///
    /// Each call starts an independent subscription that yields the current
    /// value first, then one item per change of the key. Dropping the stream
    /// releases the underlying store observer.
    pub fn values(&self) -> impl Stream<Item = T> + Send + 'static {
        let default = self.default.clone();
        let decode = Arc::clone(&self.decode);

        self.store.observe(&self.key).map(move |raw| {
            raw.and_then(|raw| decode(raw))
                .unwrap_or_else(|| default.clone())
        })
    }
}

impl<T> AppStorage<Option<T>>
where
    T: StorageValue + Clone + Send + Sync + 'static,
{
    /// Bind an optional value in the ambient store; absence reads as `None`.
    #[track_caller]
    pub fn optional(key: impl Into<String>) -> Self {
        Self::new(key, None)
    }

    /// Bind an optional value in an explicit store.
    pub fn optional_with_store(key: impl Into<String>, store: SharedStore) -> Self {
        Self::with_store(key, None, store)
    }
}

impl<T> AppStorage<Option<T>>
where
    T: RawRepresentable + Clone + Send + Sync + 'static,
{
    /// Bind an optional raw-representable value in the ambient store.
    #[track_caller]
    pub fn raw_optional(key: impl Into<String>) -> Self {
        Self::from_parts(
            key,
            None,
            None,
            |raw| Some(decode_raw::<T>(raw)),
            |value: &Option<T>| value.as_ref().and_then(encode_raw::<T>),
        )
    }
}

fn encode_raw<T: RawRepresentable>(value: &T) -> Option<StoredValue> {
    value.to_raw().encode()
}

fn decode_raw<T: RawRepresentable>(value: StoredValue) -> Option<T> {
    T::Raw::decode(value).and_then(T::from_raw)
}

impl<T> fmt::Debug for AppStorage<T>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppStorage")
            .field("key", &self.key)
            .field("default", &self.default)
            .field("value", &self.get())
            .finish()
    }
}
