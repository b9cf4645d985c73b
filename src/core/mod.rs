use std::{
    fmt, io,
    path::{Path, PathBuf},
    result,
};

use thiserror::Error;

/// Error types for the storage boundary.
///
/// The observation core (subjects, stores and bindings) never fails from the
/// caller's point of view. These errors only surface where the crate touches
/// the outside world: configuration files, persisted domains, file watching
/// and command-line input.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Configuration validation error
    #[error("configuration validation failed for '{component}': {details}")]
    ConfigValidation {
        /// Component that failed validation
        component: String,
        /// Validation error details
        details: String,
    },

    /// I/O operation error
    #[error("I/O error on '{path}': {details}")]
    IoError {
        /// Path where I/O error occurred
        path: PathBuf,
        /// I/O error details
        details: String,
    },

    /// Standard I/O operation error (for compatibility)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// TOML parsing error with location context
    #[error("failed to parse TOML at '{location}': {details}")]
    TomlParseError {
        /// Location of TOML being parsed (file path or "string")
        location: String,
        /// Parse error details
        details: String,
    },

    /// A persisted domain could not be read or written
    #[error("failed to persist domain '{path}': {details}")]
    Persistence {
        /// Path of the domain file
        path: PathBuf,
        /// Error details from the persistence operation
        details: String,
    },

    /// Failed to initialize or run the file watcher
    #[error("file watcher error: {details}")]
    FileWatch {
        /// File watcher error details
        details: String,
    },

    /// Text could not be parsed as a stored value of the requested kind
    #[error("invalid {kind} value '{input}': {reason}")]
    InvalidValue {
        /// Requested value kind
        kind: String,
        /// The rejected input
        input: String,
        /// Why the input was rejected
        reason: String,
    },
}

/// A specialized `Result` type for storage boundary operations.
pub type Result<T> = result::Result<T, StorageError>;

impl StorageError {
    /// Creates a TOML parsing error with optional file path context.
    ///
    /// # Arguments
    ///
    /// * `error` - The underlying parsing error
    /// * `path` - Optional path to the file that failed to parse
    pub fn toml_parse(error: impl fmt::Display, path: Option<&Path>) -> Self {
        let location = match path {
            Some(p) => {
                let clean_path = p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
                clean_path.to_string_lossy().to_string()
            }
            None => "string".to_string(),
        };

        StorageError::TomlParseError {
            location,
            details: error.to_string(),
        }
    }

    /// Creates a persistence error for the given domain file.
    pub fn persistence(error: impl fmt::Display, path: &Path) -> Self {
        StorageError::Persistence {
            path: path.to_path_buf(),
            details: error.to_string(),
        }
    }

    /// Creates an invalid value error for command-line or config input.
    pub fn invalid_value(
        kind: impl fmt::Display,
        input: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        StorageError::InvalidValue {
            kind: kind.to_string(),
            input: input.into(),
            reason: reason.to_string(),
        }
    }
}
