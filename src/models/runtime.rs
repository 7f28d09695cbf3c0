//! Sandbox runtime state and run results.

use serde::{Deserialize, Serialize};

/// Interpreter family backing a sandbox.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LanguageKind {
    /// General-purpose script engine.
    Script,
    /// Tabular query engine.
    Query,
}

/// Bootstrap state of one sandbox instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// Not yet mounted.
    Uninitialized,
    /// Interpreter is being fetched and initialized.
    Loading,
    /// Accepting runs.
    Ready,
    /// Bootstrap failed; terminal for this instance.
    Failed,
}

/// Ordered rows returned by the query engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    /// Column names, in select order.
    pub columns: Vec<String>,
    /// Row values positional against `columns`.
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    /// An empty result set (a successful query with zero rows).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Successful output of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RunOutput {
    /// Captured stdout of a script.
    Text(String),
    /// Result set of a query.
    Rows(QueryResult),
}

/// Outcome of one run. Execution errors are values, not `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The code ran to completion.
    Completed(RunOutput),
    /// The code raised; the instance stays usable.
    Errored {
        /// Formatted interpreter error.
        message: String,
        /// Output captured before the error.
        partial_output: String,
    },
}

impl RunOutcome {
    /// Whether the run raised an execution error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Errored { .. })
    }
}

/// Observable state of one sandbox instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeState {
    /// Interpreter family.
    pub language: LanguageKind,
    /// Bootstrap state.
    pub readiness: Readiness,
    /// Output of the most recent successful run.
    pub last_output: Option<RunOutput>,
    /// Error of the most recent failed run, or the bootstrap failure.
    pub last_error: Option<String>,
}

impl RuntimeState {
    /// Fresh, unmounted state.
    #[must_use]
    pub fn new(language: LanguageKind) -> Self {
        Self {
            language,
            readiness: Readiness::Uninitialized,
            last_output: None,
            last_error: None,
        }
    }
}
