//! Ambient dependency resolution.
//!
//! Bindings that are not handed a store explicitly take one from the
//! calling thread's [`Dependencies`] scope when they are constructed. When
//! nothing is configured the outcome depends on the [`ExecutionContext`]:
//! live and preview code quietly get an in-memory placeholder, while test
//! code gets a reported [`Issue`] pointing at the construction site.

mod issue;


use std::{
    cell::RefCell,
    env, fmt,
    panic::Location,
    str::FromStr,
    sync::{Arc, OnceLock},
};

use tracing::debug;

pub use issue::{CollectingReporter, Issue, IssueReporter, LogReporter, PanicReporter};

use crate::store::{MemoryStore, SharedStore};

/// Environment variable selecting the process-wide execution context.
pub const CONTEXT_ENV: &str = "APP_STORAGE_CONTEXT";

/// The mode the process (or a scope) runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionContext {
    /// Production: misconfiguration degrades silently.
    #[default]
    Live,
    /// Design-time previews: unconfigured stores are in-memory by intent.
    Preview,
    /// Tests: misconfiguration must fail loudly.
    Test,
}

impl ExecutionContext {
    /// The process-wide context, read once from [`CONTEXT_ENV`].
    ///
    /// Unknown or missing values resolve to [`ExecutionContext::Live`].
    pub fn process() -> Self {
        static CONTEXT: OnceLock<ExecutionContext> = OnceLock::new();

        *CONTEXT.get_or_init(|| {
            let context = env::var(CONTEXT_ENV)
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or_default();
            debug!(?context, "resolved process execution context");
            context
        })
    }

    fn default_reporter(self) -> Arc<dyn IssueReporter> {
        match self {
            ExecutionContext::Live | ExecutionContext::Preview => Arc::new(LogReporter),
            ExecutionContext::Test => Arc::new(PanicReporter),
        }
    }
}

impl FromStr for ExecutionContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(ExecutionContext::Live),
            "preview" => Ok(ExecutionContext::Preview),
            "test" => Ok(ExecutionContext::Test),
            other => Err(format!("unknown execution context '{other}'")),
        }
    }
}

/// The set of injectable collaborators visible to a scope.
#[derive(Clone, Default)]
pub struct Dependencies {
    store: Option<SharedStore>,
    context: Option<ExecutionContext>,
    reporter: Option<Arc<dyn IssueReporter>>,
}

thread_local! {
    static SCOPES: RefCell<Vec<Dependencies>> = const { RefCell::new(Vec::new()) };
}

impl Dependencies {
    /// The innermost dependencies in effect on this thread.
    pub fn current() -> Self {
        SCOPES.with(|scopes| scopes.borrow().last().cloned().unwrap_or_default())
    }

    /// Use `store` as the ambient key-value store.
    pub fn with_store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the execution context for this scope.
    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Override where misconfiguration issues are sent.
    pub fn with_reporter(mut self, reporter: Arc<dyn IssueReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Set the ambient store in place.
    pub fn set_store(&mut self, store: SharedStore) {
        self.store = Some(store);
    }

    /// Set the execution context in place.
    pub fn set_context(&mut self, context: ExecutionContext) {
        self.context = Some(context);
    }

    /// Set the issue reporter in place.
    pub fn set_reporter(&mut self, reporter: Arc<dyn IssueReporter>) {
        self.reporter = Some(reporter);
    }

    /// Effective execution context: the scope override, else the process one.
    pub fn context(&self) -> ExecutionContext {
        self.context.unwrap_or_else(ExecutionContext::process)
    }

    /// The configured store, if any.
    pub fn store(&self) -> Option<&SharedStore> {
        self.store.as_ref()
    }

    /// Resolve the store a binding should capture.
    ///
    /// Returns the configured store. Without one, a fresh [`MemoryStore`]
    /// placeholder is returned; in the test context an [`Issue`] naming the
    /// caller is reported first.
    #[track_caller]
    pub fn resolve_store(&self) -> SharedStore {
        if let Some(store) = &self.store {
            return Arc::clone(store);
        }

        let context = self.context();
        let location = Location::caller();

        match context {
            ExecutionContext::Preview => {
                debug!(%location, "no store configured, using preview memory store");
            }
            ExecutionContext::Live | ExecutionContext::Test => {
                let issue = Issue::at(
                    "no key-value store configured; falling back to an unpersisted memory store",
                    location,
                );
                self.report(context, &issue);
            }
        }

        Arc::new(MemoryStore::new())
    }

    fn report(&self, context: ExecutionContext, issue: &Issue) {
        match &self.reporter {
            Some(reporter) => reporter.report(issue),
            None => context.default_reporter().report(issue),
        }
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependencies")
            .field("store", &self.store.is_some())
            .field("context", &self.context)
            .field("reporter", &self.reporter.is_some())
            .finish()
    }
}

struct ScopeGuard;

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPES.with(|scopes| {
            scopes.borrow_mut().pop();
        });
    }
}

/// Run `operation` with dependencies derived from the current scope.
///
/// `configure` receives a copy of the current dependencies to adjust. The
/// derived scope is visible to everything `operation` does on this thread
/// and is removed afterwards, even if `operation` panics.
pub fn with_dependencies<R>(
    configure: impl FnOnce(&mut Dependencies),
    operation: impl FnOnce() -> R,
) -> R {
    let mut dependencies = Dependencies::current();
    configure(&mut dependencies);

    SCOPES.with(|scopes| scopes.borrow_mut().push(dependencies));
    let _guard = ScopeGuard;

    operation()
}
