use std::{
    fmt,
    panic::Location,
    sync::{Arc, Mutex, PoisonError},
};

use tracing::warn;

/// A misconfiguration detected at a specific call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// What went wrong.
    pub message: String,
    /// Source file of the offending call.
    pub file: &'static str,
    /// Line of the offending call.
    pub line: u32,
    /// Column of the offending call.
    pub column: u32,
}

impl Issue {
    /// Creates an issue located at the caller.
    #[track_caller]
    pub fn here(message: impl Into<String>) -> Self {
        Self::at(message, Location::caller())
    }

    /// Creates an issue located at `location`.
    pub fn at(message: impl Into<String>, location: &'static Location<'static>) -> Self {
        Self {
            message: message.into(),
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (at {}:{}:{})",
            self.message, self.file, self.line, self.column
        )
    }
}

/// Side channel for misconfiguration reports.
pub trait IssueReporter: Send + Sync {
    /// Handle a reported issue.
    fn report(&self, issue: &Issue);
}

/// Logs issues and carries on. Used in live and preview contexts.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl IssueReporter for LogReporter {
    fn report(&self, issue: &Issue) {
        warn!(
            file = issue.file,
            line = issue.line,
            column = issue.column,
            "{}",
            issue.message
        );
    }
}

/// Panics with the issue, failing the running test.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicReporter;

impl IssueReporter for PanicReporter {
    #[allow(clippy::panic)]
    fn report(&self, issue: &Issue) {
        panic!("{issue}");
    }
}

/// Records issues so a caller can inspect them afterwards.
#[derive(Debug, Default, Clone)]
pub struct CollectingReporter {
    issues: Arc<Mutex<Vec<Issue>>>,
}

impl CollectingReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every issue reported so far.
    pub fn issues(&self) -> Vec<Issue> {
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl IssueReporter for CollectingReporter {
    fn report(&self, issue: &Issue) {
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(issue.clone());
    }
}
