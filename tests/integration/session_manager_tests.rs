//! Session manager behavior across persistence and reloads.

use assessment_runtime::models::session::{SessionKind, SessionStatus};
use assessment_runtime::AppError;

use super::test_helpers::{manager, memory_store, short_answer_questions, text_answer, tiny_store};

#[tokio::test]
async fn answer_pause_resume_answer_complete_scenario() {
    let mut sessions = manager(memory_store()).await;
    let session = sessions
        .create(SessionKind::Exam, "Algebra".into(), None, short_answer_questions(3))
        .await
        .expect("create");
    let id = session.id.clone();

    sessions.record_answer(&id, text_answer("q2", "x = 4")).await.expect("answer q2");
    let paused = sessions.pause(&id).await.expect("pause").expect("exists");
    assert_eq!(paused.status(), SessionStatus::Paused);
    sessions.resume(&id).await.expect("resume");
    sessions.record_answer(&id, text_answer("q1", "7")).await.expect("answer q1");
    let done = sessions.complete(&id).await.expect("complete").expect("exists");

    assert_eq!(done.answers.len(), 2);
    assert!(done.completed_at.is_some());
    assert!(!done.is_paused);
    assert!(done.total_time_seconds.is_some());
    assert_eq!(done.status(), SessionStatus::Completed);
}

#[tokio::test]
async fn completed_session_rejects_answers_and_keeps_completion_time() {
    let mut sessions = manager(memory_store()).await;
    let id = sessions
        .create(SessionKind::Quiz, "Cells".into(), None, short_answer_questions(2))
        .await
        .expect("create")
        .id;

    let first = sessions.complete(&id).await.expect("complete").expect("exists");
    let second = sessions.complete(&id).await.expect("complete").expect("exists");
    assert_eq!(first.completed_at, second.completed_at);

    let err = sessions
        .record_answer(&id, text_answer("q1", "late"))
        .await
        .expect_err("completed");
    assert!(matches!(err, AppError::SessionCompleted(_)));
    assert!(sessions.get(&id).expect("exists").answers.is_empty());
}

#[tokio::test]
async fn twenty_first_exam_evicts_the_oldest() {
    let mut sessions = manager(memory_store()).await;
    let mut ids = Vec::new();
    for n in 0..20 {
        let session = sessions
            .create(SessionKind::Exam, format!("exam {n}"), None, short_answer_questions(1))
            .await
            .expect("create");
        ids.push(session.id);
    }
    assert_eq!(sessions.list(SessionKind::Exam).len(), 20);

    let newest = sessions
        .create(SessionKind::Exam, "exam 20".into(), None, short_answer_questions(1))
        .await
        .expect("create");

    let exams = sessions.list(SessionKind::Exam);
    assert_eq!(exams.len(), 20);
    assert_eq!(exams[0].id, newest.id);
    assert!(sessions.get(&ids[0]).is_none());
    assert!(sessions.get(&ids[1]).is_some());
}

#[tokio::test]
async fn quiz_cap_is_independent_of_exam_cap() {
    let mut sessions = manager(memory_store()).await;
    for n in 0..12 {
        sessions
            .create(SessionKind::Quiz, format!("quiz {n}"), None, Vec::new())
            .await
            .expect("create");
    }
    sessions
        .create(SessionKind::Exam, "exam".into(), None, Vec::new())
        .await
        .expect("create");

    assert_eq!(sessions.list(SessionKind::Quiz).len(), 10);
    assert_eq!(sessions.list(SessionKind::Exam).len(), 1);
}

#[tokio::test]
async fn state_survives_reload() {
    let store = memory_store();
    let id = {
        let mut sessions = manager(store.clone()).await;
        let id = sessions
            .create(
                SessionKind::Exam,
                "History".into(),
                Some("WW2".into()),
                short_answer_questions(2),
            )
            .await
            .expect("create")
            .id;
        sessions.record_answer(&id, text_answer("q1", "1945")).await.expect("answer");
        sessions.toggle_flag(&id, "q2").await.expect("flag");
        sessions.navigate(&id, 1).await.expect("navigate");
        sessions.pause(&id).await.expect("pause");
        id
    };

    let reloaded = manager(store).await;
    let session = reloaded.get(&id).expect("persisted");
    assert_eq!(session.status(), SessionStatus::Paused);
    assert_eq!(session.answers["q1"], text_answer("q1", "1945"));
    assert!(session.flagged.contains("q2"));
    assert_eq!(session.current_index, 1);
    assert_eq!(session.subject.as_deref(), Some("WW2"));
    assert_eq!(reloaded.active_session().map(|s| s.id.clone()), Some(id));
}

#[tokio::test]
async fn storage_failure_still_applies_change_in_memory() {
    let mut sessions = manager(tiny_store(16)).await;

    let err = sessions
        .create(SessionKind::Exam, "Offline".into(), None, short_answer_questions(2))
        .await
        .expect_err("quota exceeded");
    assert!(err.is_quota_exceeded());

    let active = sessions.active_session().expect("created in memory").clone();
    assert_eq!(sessions.list(SessionKind::Exam).len(), 1);

    let err = sessions
        .record_answer(&active.id, text_answer("q1", "kept"))
        .await
        .expect_err("quota exceeded");
    assert!(err.is_quota_exceeded());
    assert_eq!(sessions.get(&active.id).expect("exists").answers.len(), 1);
}

#[tokio::test]
async fn unknown_session_ids_are_silent_no_ops() {
    let mut sessions = manager(memory_store()).await;
    assert!(sessions.record_answer("ghost", text_answer("q1", "x")).await.expect("ok").is_none());
    assert!(sessions.pause("ghost").await.expect("ok").is_none());
    assert!(sessions.complete("ghost").await.expect("ok").is_none());
    assert!(!sessions.delete("ghost").await.expect("ok"));
    assert!(sessions.export("ghost").expect("ok").is_none());
}

#[tokio::test]
async fn delete_clears_active_pointer() {
    let mut sessions = manager(memory_store()).await;
    let id = sessions
        .create(SessionKind::Quiz, "Temp".into(), None, Vec::new())
        .await
        .expect("create")
        .id;
    assert!(sessions.active_session().is_some());

    assert!(sessions.delete(&id).await.expect("delete"));
    assert!(sessions.active_session().is_none());
    assert!(sessions.list(SessionKind::Quiz).is_empty());
}

#[tokio::test]
async fn set_active_ignores_unknown_ids() {
    let mut sessions = manager(memory_store()).await;
    let id = sessions
        .create(SessionKind::Exam, "A".into(), None, Vec::new())
        .await
        .expect("create")
        .id;
    sessions.set_active(Some("ghost")).await.expect("ignored");
    assert_eq!(sessions.active_session().map(|s| s.id.as_str()), Some(id.as_str()));

    sessions.set_active(None).await.expect("clear");
    assert!(sessions.active_session().is_none());
}

#[tokio::test]
async fn export_includes_status_and_progress() {
    let mut sessions = manager(memory_store()).await;
    let id = sessions
        .create(SessionKind::Exam, "Export".into(), None, short_answer_questions(3))
        .await
        .expect("create")
        .id;
    sessions.record_answer(&id, text_answer("q3", "done")).await.expect("answer");

    let document = sessions.export(&id).expect("export").expect("exists");
    let value: serde_json::Value = serde_json::from_str(&document).expect("json");
    assert_eq!(value["status"], "active");
    assert_eq!(value["progress"]["answered"], 1);
    assert_eq!(value["progress"]["total"], 3);
    assert_eq!(value["session"]["id"], id.as_str());
}
