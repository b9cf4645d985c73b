//! Command-line interface for inspecting and editing persisted domains.
//!
//! Arguments are parsed with clap; [`CliService`] executes the parsed
//! command against the configured [`FileStore`](crate::store::FileStore)
//! and returns printable output.

pub mod formatting;
mod service;
mod types;


use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use service::CliService;
pub use types::{CliError, CommandResult};

use crate::store::ValueKind;

/// Top-level arguments of the `app-storage` binary.
#[derive(Debug, Parser)]
#[command(name = "app-storage")]
#[command(about = "Inspect, edit and watch persisted key-value domains")]
#[command(version)]
pub struct Cli {
    /// Configuration file to load instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Domain to operate on instead of the configured one
    #[arg(long, global = true, value_name = "NAME")]
    pub domain: Option<String>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Commands understood by [`CliService`].
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print the value stored under a key
    Get {
        /// Key to read
        key: String,

        /// Only show the value if it has this kind
        #[arg(long)]
        kind: Option<ValueKind>,
    },

    /// Store a value under a key
    Set {
        /// Key to write
        key: String,

        /// Value text
        value: String,

        /// How to interpret the value: bool, integer, double, data (hex), string or url
        #[arg(long)]
        kind: ValueKind,
    },

    /// Remove a key
    Remove {
        /// Key to remove
        key: String,
    },

    /// Print every entry of the domain, sorted by key
    List,

    /// Print a key's value and every later change until interrupted
    Watch {
        /// Key to watch
        key: String,
    },

    /// Print the JSON schema of the configuration file
    Schema,
}
