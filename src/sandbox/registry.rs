//! Mount/unmount bookkeeping for per-question sandboxes.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::runtime::SandboxRuntime;
use super::{loader_for, InterpreterLoader};
use crate::config::SandboxConfig;
use crate::models::question::{Question, QuestionBody, TableDefinition};
use crate::models::runtime::LanguageKind;

/// Owns the live sandbox of every mounted code question.
///
/// Mounting starts the bootstrap in the background, so it must be called
/// from within a Tokio runtime.
pub struct SandboxRegistry {
    config: SandboxConfig,
    instances: HashMap<String, Arc<SandboxRuntime>>,
}

impl SandboxRegistry {
    /// Empty registry using the limits in `config`.
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            instances: HashMap::new(),
        }
    }

    /// Mount a fresh sandbox for `question_id`, disposing any previous one.
    pub fn mount(
        &mut self,
        question_id: &str,
        language: LanguageKind,
        starter: &str,
        tables: Vec<TableDefinition>,
    ) -> Arc<SandboxRuntime> {
        let loader = loader_for(language, tables, &self.config);
        self.mount_with_loader(question_id, starter, loader)
    }

    /// Mount the sandbox a code question asks for. Returns `None` for any
    /// other question type.
    pub fn mount_question(&mut self, question: &Question) -> Option<Arc<SandboxRuntime>> {
        match &question.body {
            QuestionBody::Code {
                language,
                starter_code,
                tables,
                ..
            } => Some(self.mount(&question.id, *language, starter_code, tables.clone())),
            _ => None,
        }
    }

    /// Mount using a caller-supplied interpreter loader.
    pub fn mount_with_loader(
        &mut self,
        question_id: &str,
        starter: &str,
        loader: Arc<dyn InterpreterLoader>,
    ) -> Arc<SandboxRuntime> {
        self.unmount(question_id);

        let runtime = Arc::new(SandboxRuntime::new(
            question_id,
            starter,
            loader,
            self.config.bootstrap_timeout(),
        ));
        let booting = Arc::clone(&runtime);
        tokio::spawn(async move {
            if let Err(err) = booting.bootstrap().await {
                warn!(question_id = %booting.question_id(), %err, "sandbox bootstrap failed");
            }
        });

        info!(question_id, language = ?runtime.language(), "sandbox mounted");
        self.instances
            .insert(question_id.to_owned(), Arc::clone(&runtime));
        runtime
    }

    /// The mounted sandbox for `question_id`.
    #[must_use]
    pub fn get(&self, question_id: &str) -> Option<Arc<SandboxRuntime>> {
        self.instances.get(question_id).cloned()
    }

    /// Dispose and forget the sandbox for `question_id`.
    pub fn unmount(&mut self, question_id: &str) -> bool {
        match self.instances.remove(question_id) {
            Some(runtime) => {
                runtime.dispose();
                info!(question_id, "sandbox unmounted");
                true
            }
            None => false,
        }
    }

    /// Dispose every mounted sandbox.
    pub fn unmount_all(&mut self) {
        for (_, runtime) in self.instances.drain() {
            runtime.dispose();
        }
    }

    /// Number of mounted sandboxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether nothing is mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl Drop for SandboxRegistry {
    fn drop(&mut self) {
        self.unmount_all();
    }
}
