//! Formatting utilities for CLI output.

use crate::store::StoredValue;

/// Printed in place of a value when a key holds nothing.
pub const ABSENT: &str = "(absent)";

/// ANSI color codes for terminal output
pub struct Colors;

impl Colors {
    /// Reset all formatting
    pub const RESET: &'static str = "\x1b[0m";
    /// Bold text
    pub const BOLD: &'static str = "\x1b[1m";
    /// Dim text
    pub const DIM: &'static str = "\x1b[2m";
    /// Red color
    pub const RED: &'static str = "\x1b[31m";
}

/// Formats descriptions with muted styling
pub fn format_description(text: &str) -> String {
    format!("{}{}{}", Colors::DIM, text, Colors::RESET)
}

/// Formats error messages with red styling
pub fn format_error(text: &str) -> String {
    format!("{}{}{}{}", Colors::BOLD, Colors::RED, text, Colors::RESET)
}

/// Formats a stored value for human-readable CLI output.
///
/// # Examples
///
/// ```
/// use app_storage::{cli::formatting::format_value, store::StoredValue};
///
/// assert_eq!(format_value(Some(&StoredValue::Integer(42))), "42");
/// assert_eq!(format_value(Some(&StoredValue::String("hi".into()))), "\"hi\"");
/// assert_eq!(format_value(None), "(absent)");
/// ```
pub fn format_value(value: Option<&StoredValue>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => ABSENT.to_string(),
    }
}

/// Formats a `key = value` line.
pub fn format_entry(key: &str, value: Option<&StoredValue>) -> String {
    format!("{key} = {}", format_value(value))
}
