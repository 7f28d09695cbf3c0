//! Script interpreter backed by an embedded `rhai` engine.
//!
//! Each instance owns its own engine and scope, so variables defined by one
//! run remain visible to the next run of the same question and never leak
//! into another question's sandbox.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Interpreter, InterpreterFuture, InterpreterLoader};
use crate::config::SandboxConfig;
use crate::models::runtime::{LanguageKind, RunOutcome, RunOutput};
use crate::Result;

const TIMED_OUT: &str = "timed out";
const CANCELLED: &str = "was cancelled";

/// Builds [`ScriptInterpreter`] instances with the configured limits.
pub struct ScriptLoader {
    max_operations: u64,
    timeout: Duration,
}

impl ScriptLoader {
    /// Loader using the limits in `config`.
    #[must_use]
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            max_operations: config.script_max_operations,
            timeout: config.script_timeout(),
        }
    }
}

impl InterpreterLoader for ScriptLoader {
    fn language(&self) -> LanguageKind {
        LanguageKind::Script
    }

    fn load(&self) -> InterpreterFuture<'_, Result<Box<dyn Interpreter>>> {
        Box::pin(async move {
            let interpreter = ScriptInterpreter::new(self.max_operations, self.timeout);
            Ok(Box::new(interpreter) as Box<dyn Interpreter>)
        })
    }
}

#[derive(Default)]
struct RunGuard {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

/// One isolated script engine with a persistent scope.
pub struct ScriptInterpreter {
    engine: Arc<Engine>,
    scope: Scope<'static>,
    stdout: Arc<Mutex<String>>,
    guard: Arc<Mutex<RunGuard>>,
    timeout: Duration,
}

impl ScriptInterpreter {
    /// Fresh engine with print/debug captured and execution limits set.
    #[must_use]
    pub fn new(max_operations: u64, timeout: Duration) -> Self {
        let stdout = Arc::new(Mutex::new(String::new()));
        let guard = Arc::new(Mutex::new(RunGuard::default()));

        let mut engine = Engine::new();
        engine.set_max_operations(max_operations);

        let sink = Arc::clone(&stdout);
        engine.on_print(move |text| append_line(&sink, text));
        let sink = Arc::clone(&stdout);
        engine.on_debug(move |text, _source, _pos| append_line(&sink, text));

        let watch = Arc::clone(&guard);
        engine.on_progress(move |_ops| {
            let guard = watch.lock().ok()?;
            if guard.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return Some(Dynamic::from(CANCELLED));
            }
            if guard.deadline.is_some_and(|d| Instant::now() >= d) {
                return Some(Dynamic::from(TIMED_OUT));
            }
            None
        });

        Self {
            engine: Arc::new(engine),
            scope: Scope::new(),
            stdout,
            guard,
            timeout,
        }
    }

    fn arm(&self, cancel: CancellationToken) {
        if let Ok(mut guard) = self.guard.lock() {
            guard.deadline = Some(Instant::now() + self.timeout);
            guard.cancel = Some(cancel);
        }
        if let Ok(mut out) = self.stdout.lock() {
            out.clear();
        }
    }

    fn disarm(&self) -> String {
        if let Ok(mut guard) = self.guard.lock() {
            *guard = RunGuard::default();
        }
        self.stdout
            .lock()
            .map(|mut out| std::mem::take(&mut *out))
            .unwrap_or_default()
    }
}

impl Interpreter for ScriptInterpreter {
    fn execute<'a>(
        &'a mut self,
        source: &'a str,
        cancel: CancellationToken,
    ) -> InterpreterFuture<'a, RunOutcome> {
        Box::pin(async move {
            self.arm(cancel);

            let engine = Arc::clone(&self.engine);
            let mut scope = std::mem::take(&mut self.scope);
            let script = source.to_owned();
            let joined = tokio::task::spawn_blocking(move || {
                let result = engine.run_with_scope(&mut scope, &script);
                (scope, result)
            })
            .await;

            let stdout = self.disarm();
            match joined {
                Ok((scope, Ok(()))) => {
                    self.scope = scope;
                    RunOutcome::Completed(RunOutput::Text(stdout))
                }
                Ok((scope, Err(err))) => {
                    self.scope = scope;
                    let message = describe_error(&err);
                    debug!(%message, "script raised an error");
                    RunOutcome::Errored {
                        message,
                        partial_output: stdout,
                    }
                }
                Err(join_err) => {
                    warn!(%join_err, "script worker failed; scope reset");
                    RunOutcome::Errored {
                        message: format!("Error: interpreter crashed: {join_err}"),
                        partial_output: stdout,
                    }
                }
            }
        })
    }
}

fn append_line(sink: &Mutex<String>, text: &str) {
    if let Ok(mut out) = sink.lock() {
        out.push_str(text);
        out.push('\n');
    }
}

fn describe_error(err: &EvalAltResult) -> String {
    match err {
        EvalAltResult::ErrorTooManyOperations(_) => {
            "Error: script exceeded its operation limit".to_owned()
        }
        EvalAltResult::ErrorTerminated(token, _) => format!("Error: script {token}"),
        other => format!("Error: {other}"),
    }
}
