//! Durable store over the in-memory backend: round trips, quota, eviction.

use std::sync::Arc;

use chrono::{Duration, Utc};

use assessment_runtime::config::StorageConfig;
use assessment_runtime::models::deck::{Deck, DeckCollection, Flashcard};
use assessment_runtime::models::preferences::Preferences;
use assessment_runtime::models::session::{Session, SessionHistory, SessionKind};
use assessment_runtime::persistence::store::{DurableStore, MemoryBackend, StoreKey};
use assessment_runtime::AppError;

fn unbounded() -> DurableStore {
    DurableStore::new(Arc::new(MemoryBackend::new()), &StorageConfig::default())
}

fn session_started(minutes_ago: i64) -> Session {
    Session::new(
        SessionKind::Exam,
        format!("exam-{minutes_ago}"),
        None,
        Vec::new(),
        Utc::now() - Duration::minutes(minutes_ago),
    )
}

#[tokio::test]
async fn missing_key_loads_default() {
    let prefs: Preferences = unbounded().load(StoreKey::Preferences).await.expect("load");
    assert_eq!(prefs, Preferences::default());
}

#[tokio::test]
async fn save_then_load_returns_same_document() {
    let store = unbounded();
    let prefs = Preferences {
        active_session_id: Some("abc".into()),
    };
    store.save(StoreKey::Preferences, &prefs).await.expect("save");
    let loaded: Preferences = store.load(StoreKey::Preferences).await.expect("load");
    assert_eq!(loaded, prefs);
}

#[tokio::test]
async fn write_over_hard_quota_fails_distinguishably_and_keeps_old_value() {
    let storage = StorageConfig {
        soft_warning_bytes: 50,
        hard_quota_bytes: 200,
    };
    let store = DurableStore::in_memory(&storage);

    let small = DeckCollection {
        decks: vec![Deck::new("tiny".into(), Vec::new())],
    };
    store.save(StoreKey::Decks, &small).await.expect("fits");

    let cards = (0..20)
        .map(|i| Flashcard::new(format!("front {i}"), format!("back {i}")))
        .collect();
    let big = DeckCollection {
        decks: vec![Deck::new("huge".into(), cards)],
    };
    let err = store.save(StoreKey::Decks, &big).await.expect_err("over quota");
    assert!(err.is_quota_exceeded());
    assert!(matches!(err, AppError::QuotaExceeded(_)));

    let loaded: DeckCollection = store.load(StoreKey::Decks).await.expect("load");
    assert_eq!(loaded.decks[0].name, "tiny");
}

#[tokio::test]
async fn rewriting_a_key_does_not_double_count_it() {
    let storage = StorageConfig {
        soft_warning_bytes: 100,
        hard_quota_bytes: 120,
    };
    let store = DurableStore::in_memory(&storage);
    let prefs = Preferences {
        active_session_id: Some("x".repeat(40)),
    };
    store.save(StoreKey::Preferences, &prefs).await.expect("first");
    store.save(StoreKey::Preferences, &prefs).await.expect("rewrite");
}

#[tokio::test]
async fn evict_oldest_keeps_newest_by_start_time() {
    let store = unbounded();
    let history = SessionHistory {
        sessions: vec![session_started(30), session_started(10), session_started(20)],
    };
    store.save(StoreKey::ExamSessions, &history).await.expect("save");

    let dropped = store
        .evict_oldest::<SessionHistory>(StoreKey::ExamSessions, 2)
        .await
        .expect("evict");
    assert_eq!(dropped, 1);

    let kept: SessionHistory = store.load(StoreKey::ExamSessions).await.expect("load");
    let names: Vec<_> = kept.sessions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["exam-10", "exam-20"]);
}

#[tokio::test]
async fn evict_within_cap_writes_nothing() {
    let store = unbounded();
    let dropped = store
        .evict_oldest::<SessionHistory>(StoreKey::QuizSessions, 5)
        .await
        .expect("evict");
    assert_eq!(dropped, 0);
}

#[tokio::test]
async fn remove_reports_presence() {
    let store = unbounded();
    store
        .save(StoreKey::Preferences, &Preferences::default())
        .await
        .expect("save");
    assert!(store.remove(StoreKey::Preferences).await.expect("remove"));
    assert!(!store.remove(StoreKey::Preferences).await.expect("remove again"));
}

#[test]
fn store_keys_map_to_stable_names() {
    assert_eq!(StoreKey::for_sessions(SessionKind::Exam).as_str(), "exam_sessions");
    assert_eq!(StoreKey::for_sessions(SessionKind::Quiz).as_str(), "quiz_sessions");
    assert_eq!(StoreKey::Decks.as_str(), "decks");
    assert_eq!(StoreKey::Preferences.as_str(), "preferences");
}
