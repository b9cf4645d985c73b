use thiserror::Error;

use crate::core::StorageError;

/// Errors that can occur during CLI command execution.
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid arguments were provided to a command.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The configuration, the domain file or a value could not be handled.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Output could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing command output failed.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Type alias for command execution results.
///
/// Commands produce their complete output as a String; an empty string
/// means there is nothing to print.
pub type CommandResult = Result<String, CliError>;
