//! Schema migration of stored session histories and preferences.

use std::sync::Arc;

use serde_json::json;

use assessment_runtime::config::StorageConfig;
use assessment_runtime::models::deck::DeckCollection;
use assessment_runtime::models::preferences::Preferences;
use assessment_runtime::models::session::{SessionHistory, SessionKind, SessionStatus};
use assessment_runtime::persistence::store::{
    DurableStore, MemoryBackend, StoreBackend, StoreKey, StoredRecord,
};

async fn store_with(
    key: StoreKey,
    schema_version: u32,
    payload: serde_json::Value,
) -> DurableStore {
    let backend = Arc::new(MemoryBackend::new());
    backend
        .write(
            key.as_str(),
            StoredRecord {
                schema_version,
                payload: payload.to_string(),
            },
        )
        .await
        .expect("seed record");
    DurableStore::new(backend, &StorageConfig::default())
}

fn v1_session(id: &str, name: &str, completed: bool) -> serde_json::Value {
    json!({
        "id": id,
        "subject_or_exam_name": name,
        "started_at": "2025-01-10T08:00:00Z",
        "completed_at": if completed { json!("2025-01-10T09:00:00Z") } else { json!(null) },
    })
}

#[tokio::test]
async fn v1_quiz_array_is_upgraded_with_defaults() {
    let store = store_with(
        StoreKey::QuizSessions,
        1,
        json!([v1_session("a", "Biology", false), v1_session("b", "Physics", true)]),
    )
    .await;

    let history: SessionHistory = store.load(StoreKey::QuizSessions).await.expect("migrated");
    assert_eq!(history.sessions.len(), 2);

    let first = &history.sessions[0];
    assert_eq!(first.kind, SessionKind::Quiz);
    assert_eq!(first.name, "Biology");
    assert!(first.answers.is_empty());
    assert!(first.questions.is_empty());
    assert_eq!(first.current_index, 0);
    assert!(!first.is_paused);
    assert_eq!(first.status(), SessionStatus::Active);

    assert_eq!(history.sessions[1].status(), SessionStatus::Completed);
}

#[tokio::test]
async fn v1_exam_key_defaults_kind_to_exam() {
    let payload = json!([v1_session("e", "Final", false)]);
    let store = store_with(StoreKey::ExamSessions, 1, payload).await;
    let history: SessionHistory = store.load(StoreKey::ExamSessions).await.expect("migrated");
    assert_eq!(history.sessions[0].kind, SessionKind::Exam);
}

#[tokio::test]
async fn non_object_entries_are_dropped_during_migration() {
    let store = store_with(
        StoreKey::ExamSessions,
        1,
        json!([42, "junk", v1_session("ok", "Kept", false)]),
    )
    .await;
    let history: SessionHistory = store.load(StoreKey::ExamSessions).await.expect("migrated");
    assert_eq!(history.sessions.len(), 1);
    assert_eq!(history.sessions[0].id, "ok");
}

#[tokio::test]
async fn newer_schema_version_is_decoded_best_effort() {
    let store = store_with(
        StoreKey::Preferences,
        99,
        json!({ "active_session_id": "s-1", "future_field": true }),
    )
    .await;
    let prefs: Preferences = store.load(StoreKey::Preferences).await.expect("best effort");
    assert_eq!(prefs.active_session_id.as_deref(), Some("s-1"));
}

#[tokio::test]
async fn undecodable_document_loads_as_default() {
    let store = store_with(StoreKey::Decks, 1, json!({ "decks": "not a list" })).await;
    let decks: DeckCollection = store.load(StoreKey::Decks).await.expect("falls back");
    assert!(decks.decks.is_empty());
}
