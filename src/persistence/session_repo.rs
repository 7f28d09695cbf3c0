//! Session history documents in the durable store.

use serde_json::{json, Map, Value};

use super::store::{keep_newest, Collection, DurableStore, StoreKey, Versioned};
use crate::models::session::{SessionHistory, SessionKind};
use crate::Result;

impl Versioned for SessionHistory {
    const SCHEMA_VERSION: u32 = 2;

    /// Version 1 stored a bare array of sessions without `kind`, navigation,
    /// flags or pause bookkeeping.
    fn migrate(from_version: u32, key: StoreKey, value: Value) -> Value {
        if from_version >= 2 {
            return value;
        }

        let kind = match key {
            StoreKey::QuizSessions => "quiz",
            _ => "exam",
        };

        let sessions = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("sessions") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        let upgraded: Vec<Value> = sessions
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(Value::Object(upgrade_v1_session(map, kind))),
                _ => None,
            })
            .collect();

        json!({ "sessions": upgraded })
    }
}

fn upgrade_v1_session(mut session: Map<String, Value>, kind: &str) -> Map<String, Value> {
    if let Some(name) = session.remove("subject_or_exam_name") {
        session.entry("name").or_insert(name);
    }
    session.entry("kind").or_insert_with(|| json!(kind));
    session.entry("name").or_insert_with(|| json!(""));
    session.entry("questions").or_insert_with(|| json!([]));
    session.entry("answers").or_insert_with(|| json!({}));
    session.entry("current_index").or_insert_with(|| json!(0));
    session.entry("flagged").or_insert_with(|| json!([]));
    session.entry("is_paused").or_insert_with(|| json!(false));
    session.entry("paused_at").or_insert(Value::Null);
    session.entry("total_time_seconds").or_insert(Value::Null);
    session
}

impl Collection for SessionHistory {
    fn retain_newest(&mut self, max_entries: usize) -> usize {
        keep_newest(&mut self.sessions, max_entries, |s| s.started_at)
    }
}

/// Repository wrapper for exam and quiz histories.
#[derive(Clone)]
pub struct SessionRepo {
    store: DurableStore,
}

impl SessionRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(store: DurableStore) -> Self {
        Self { store }
    }

    /// Load the history for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the stored document cannot be read.
    pub async fn load(&self, kind: SessionKind) -> Result<SessionHistory> {
        self.store.load(StoreKey::for_sessions(kind)).await
    }

    /// Replace the history for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::QuotaExceeded` if the store is full, or another
    /// persistence error.
    pub async fn save(&self, kind: SessionKind, history: &SessionHistory) -> Result<()> {
        self.store.save(StoreKey::for_sessions(kind), history).await
    }
}
