//! Shared fixtures for integration tests.

use std::sync::Arc;

use assessment_runtime::config::{HistoryConfig, StorageConfig};
use assessment_runtime::models::answer::{Answer, AnswerValue};
use assessment_runtime::models::question::{Question, QuestionBody};
use assessment_runtime::orchestrator::session_manager::SessionManager;
use assessment_runtime::persistence::store::{DurableStore, MemoryBackend};

/// `count` short-answer questions with ids `q1..=qN`.
pub fn short_answer_questions(count: usize) -> Vec<Question> {
    (1..=count)
        .map(|n| Question {
            id: format!("q{n}"),
            prompt: format!("Question {n}"),
            body: QuestionBody::ShortAnswer,
        })
        .collect()
}

/// Free-text answer for `question_id`.
pub fn text_answer(question_id: &str, text: &str) -> Answer {
    Answer::new(question_id, AnswerValue::Text(text.to_owned()))
}

/// Unbounded in-memory store.
pub fn memory_store() -> DurableStore {
    DurableStore::new(Arc::new(MemoryBackend::new()), &StorageConfig::default())
}

/// Store whose backend refuses any write beyond `quota` bytes.
pub fn tiny_store(quota: u64) -> DurableStore {
    DurableStore::new(
        Arc::new(MemoryBackend::with_quota(quota)),
        &StorageConfig::default(),
    )
}

/// Session manager over `store` with default caps.
pub async fn manager(store: DurableStore) -> SessionManager {
    SessionManager::load(store, HistoryConfig::default())
        .await
        .expect("load manager")
}
