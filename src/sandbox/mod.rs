//! Per-question sandboxed interpreters.
//!
//! Every mounted code question owns one [`runtime::SandboxRuntime`] backed
//! by its own interpreter instance; nothing is shared between questions.
//! Interpreters plug in through [`InterpreterLoader`] and [`Interpreter`].

pub mod query;
pub mod registry;
pub mod runtime;
pub mod script;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::SandboxConfig;
use crate::models::question::TableDefinition;
use crate::models::runtime::{LanguageKind, RunOutcome};
use crate::Result;

/// Boxed future returned by interpreter and loader methods.
pub type InterpreterFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A live interpreter owned by exactly one sandbox.
pub trait Interpreter: Send {
    /// Execute `source`, capturing its output.
    ///
    /// Errors raised by the code are returned as [`RunOutcome::Errored`];
    /// the interpreter remains usable afterwards. Implementations should
    /// stop early once `cancel` fires.
    fn execute<'a>(
        &'a mut self,
        source: &'a str,
        cancel: CancellationToken,
    ) -> InterpreterFuture<'a, RunOutcome>;
}

/// Fetches and initializes a fresh interpreter.
pub trait InterpreterLoader: Send + Sync {
    /// Language of the interpreters this loader produces.
    fn language(&self) -> LanguageKind;

    /// Build a new, isolated interpreter.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Bootstrap` if the interpreter cannot be loaded.
    fn load(&self) -> InterpreterFuture<'_, Result<Box<dyn Interpreter>>>;
}

/// Loader for `language`, seeding `tables` into query sandboxes.
#[must_use]
pub fn loader_for(
    language: LanguageKind,
    tables: Vec<TableDefinition>,
    config: &SandboxConfig,
) -> Arc<dyn InterpreterLoader> {
    match language {
        LanguageKind::Script => Arc::new(script::ScriptLoader::new(config)),
        LanguageKind::Query => Arc::new(query::QueryLoader::new(tables)),
    }
}
