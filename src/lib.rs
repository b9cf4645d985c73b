//! App-storage - observable, persisted key-value bindings.
//!
//! The crate is built from three layers:
//!
//! - [`subject::BroadcastSubject`]: a multi-subscriber broadcast primitive
//!   with replay of the latest value and per-subscriber buffering
//! - [`store::KeyValueStore`]: string-keyed primitive storage with per-key
//!   observation, in memory or persisted to a JSON domain file
//! - [`storage::AppStorage`]: a typed, defaulted binding to one key, bound
//!   to an explicit store or to the ambient one from [`dependencies`]
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use app_storage::{AppStorage, MemoryStore, with_dependencies};
//!
//! let volume = with_dependencies(
//!     |deps| deps.set_store(Arc::new(MemoryStore::new())),
//!     || AppStorage::new("volume", 0.5f64),
//! );
//!
//! assert_eq!(volume.get(), 0.5);
//! volume.set(0.8);
//! assert_eq!(volume.get(), 0.8);
//! ```

/// Command-line interface for persisted domains.
pub mod cli;

/// Configuration schema definitions and loading.
pub mod config;

/// Core error types and result aliases.
pub mod core;

/// Ambient store resolution and issue reporting.
pub mod dependencies;

/// Typed storage bindings.
pub mod storage;

/// Key-value stores.
pub mod store;

/// Multi-subscriber broadcast subject.
pub mod subject;

/// Logging initialization.
pub mod tracing_config;

/// Re-exported core types for convenience.
pub use core::{Result, StorageError};
pub use dependencies::{Dependencies, ExecutionContext, with_dependencies};
pub use storage::{AppStorage, RawRepresentable, StorageValue, Uri};
pub use store::{FileStore, KeyValueStore, MemoryStore, SharedStore, StoredValue, ValueKind};
pub use subject::{BroadcastSubject, BufferPolicy, ReplayPolicy, Subscription};
