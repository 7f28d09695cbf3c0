//! Sandbox instance state machine: `Uninitialized -> Loading -> Ready | Failed`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{Interpreter, InterpreterLoader};
use crate::models::runtime::{LanguageKind, Readiness, RunOutcome, RunOutput, RuntimeState};
use crate::{AppError, Result};

/// One question's isolated interpreter plus its editor buffer.
///
/// Only one run is accepted at a time; a second concurrent run is rejected
/// with `AppError::Busy`. Bootstrap failure is terminal for the instance.
pub struct SandboxRuntime {
    question_id: String,
    starter: String,
    loader: Arc<dyn InterpreterLoader>,
    bootstrap_timeout: Duration,
    state: Mutex<RuntimeState>,
    readiness_tx: watch::Sender<Readiness>,
    source: Mutex<String>,
    interpreter: tokio::sync::Mutex<Option<Box<dyn Interpreter>>>,
    cancel: CancellationToken,
}

impl SandboxRuntime {
    /// Create an unmounted instance whose buffer holds `starter`.
    #[must_use]
    pub fn new(
        question_id: impl Into<String>,
        starter: impl Into<String>,
        loader: Arc<dyn InterpreterLoader>,
        bootstrap_timeout: Duration,
    ) -> Self {
        let starter = starter.into();
        Self {
            question_id: question_id.into(),
            source: Mutex::new(starter.clone()),
            state: Mutex::new(RuntimeState::new(loader.language())),
            readiness_tx: watch::channel(Readiness::Uninitialized).0,
            starter,
            loader,
            bootstrap_timeout,
            interpreter: tokio::sync::Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Question this instance belongs to.
    #[must_use]
    pub fn question_id(&self) -> &str {
        &self.question_id
    }

    /// Interpreter family.
    #[must_use]
    pub fn language(&self) -> LanguageKind {
        self.loader.language()
    }

    /// Current bootstrap state.
    #[must_use]
    pub fn readiness(&self) -> Readiness {
        self.lock_state().readiness
    }

    /// Snapshot of the observable state.
    #[must_use]
    pub fn state(&self) -> RuntimeState {
        self.lock_state().clone()
    }

    /// Current editor buffer.
    #[must_use]
    pub fn source(&self) -> String {
        self.lock_source().clone()
    }

    /// Replace the editor buffer.
    pub fn set_source(&self, text: impl Into<String>) {
        *self.lock_source() = text.into();
    }

    /// Whether the instance was disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Load the interpreter. Only the first call does any work; later calls
    /// report the current readiness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Bootstrap` once, on the call that failed to load.
    pub async fn bootstrap(&self) -> Result<Readiness> {
        {
            let mut state = self.lock_state();
            if state.readiness != Readiness::Uninitialized {
                return Ok(state.readiness);
            }
            state.readiness = Readiness::Loading;
        }
        self.readiness_tx.send_replace(Readiness::Loading);
        debug!(question_id = %self.question_id, language = ?self.language(), "sandbox loading");

        let load = tokio::time::timeout(self.bootstrap_timeout, self.loader.load());
        let loaded = tokio::select! {
            () = self.cancel.cancelled() => {
                Err(AppError::Bootstrap("sandbox disposed while loading".into()))
            }
            result = load => match result {
                Ok(inner) => inner,
                Err(_) => Err(AppError::Bootstrap(format!(
                    "interpreter did not load within {}s",
                    self.bootstrap_timeout.as_secs()
                ))),
            },
        };

        match loaded {
            Ok(interpreter) => {
                *self.interpreter.lock().await = Some(interpreter);
                self.lock_state().readiness = Readiness::Ready;
                self.readiness_tx.send_replace(Readiness::Ready);
                info!(question_id = %self.question_id, "sandbox ready");
                Ok(Readiness::Ready)
            }
            Err(err) => {
                let message = match err {
                    AppError::Bootstrap(msg) => msg,
                    other => other.to_string(),
                };
                {
                    let mut state = self.lock_state();
                    state.readiness = Readiness::Failed;
                    state.last_error = Some(message.clone());
                }
                self.readiness_tx.send_replace(Readiness::Failed);
                error!(question_id = %self.question_id, %message, "sandbox failed to load");
                Err(AppError::Bootstrap(message))
            }
        }
    }

    /// Wait until bootstrap has settled on `Ready` or `Failed`. Pending
    /// until something calls [`Self::bootstrap`].
    pub async fn wait_settled(&self) -> Readiness {
        let mut rx = self.readiness_tx.subscribe();
        let settled = match rx
            .wait_for(|r| matches!(r, Readiness::Ready | Readiness::Failed))
            .await
        {
            Ok(readiness) => *readiness,
            Err(_) => self.readiness(),
        };
        settled
    }

    /// Run `source` and record its outcome. The buffer is set to `source`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotReady` unless the instance is `Ready` (or after
    /// disposal), and `AppError::Busy` while another run is in flight.
    /// Execution errors are returned inside `Ok(RunOutcome::Errored)`.
    pub async fn run(&self, source: &str) -> Result<RunOutcome> {
        match self.readiness() {
            Readiness::Ready => {}
            Readiness::Failed => {
                return Err(AppError::NotReady(
                    "sandbox failed to load; remount to retry".into(),
                ))
            }
            Readiness::Uninitialized | Readiness::Loading => {
                return Err(AppError::NotReady("sandbox is still loading".into()))
            }
        }

        let Ok(mut slot) = self.interpreter.try_lock() else {
            return Err(AppError::Busy("a run is already in progress".into()));
        };
        let Some(interpreter) = slot.as_mut() else {
            return Err(AppError::NotReady("sandbox was disposed".into()));
        };

        self.set_source(source);

        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            outcome = interpreter.execute(source, self.cancel.child_token()) => Some(outcome),
        };
        let Some(outcome) = outcome.filter(|_| !self.cancel.is_cancelled()) else {
            debug!(question_id = %self.question_id, "run output discarded after disposal");
            return Err(AppError::NotReady("sandbox was disposed".into()));
        };

        {
            let mut state = self.lock_state();
            match &outcome {
                RunOutcome::Completed(output) => {
                    state.last_output = Some(output.clone());
                    state.last_error = None;
                }
                RunOutcome::Errored {
                    message,
                    partial_output,
                } => {
                    state.last_output = (!partial_output.is_empty())
                        .then(|| RunOutput::Text(partial_output.clone()));
                    state.last_error = Some(message.clone());
                }
            }
        }

        if outcome.is_error() {
            debug!(question_id = %self.question_id, "run raised an execution error");
        }
        Ok(outcome)
    }

    /// Restore the starter text and clear output and error. The interpreter
    /// is kept as is.
    pub fn reset(&self) {
        self.set_source(self.starter.clone());
        let mut state = self.lock_state();
        state.last_output = None;
        state.last_error = None;
    }

    /// Tear down: cancel any in-flight run or bootstrap and drop the
    /// interpreter once idle.
    pub fn dispose(&self) {
        self.cancel.cancel();
        if let Ok(mut slot) = self.interpreter.try_lock() {
            slot.take();
        }
        debug!(question_id = %self.question_id, "sandbox disposed");
    }

    fn lock_state(&self) -> MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("sandbox state lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_source(&self) -> MutexGuard<'_, String> {
        self.source
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Drop for SandboxRuntime {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
