//! Session model and lifecycle helpers.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::answer::Answer;
use super::question::Question;

/// Which history a session belongs to; each kind has its own cap and store key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Full exam attempt.
    Exam,
    /// Short quiz attempt.
    Quiz,
}

impl SessionKind {
    /// Every kind, in load order.
    pub const ALL: [Self; 2] = [Self::Exam, Self::Quiz];
}

/// Lifecycle status derived from a session's timestamps and pause flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting answers, clock running.
    Active,
    /// Accepting answers, paused by the learner (clock still running).
    Paused,
    /// Terminal; no further writes.
    Completed,
}

/// Answered/flagged counters for display and export.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Progress {
    /// Questions with a recorded answer.
    pub answered: usize,
    /// Questions in the session.
    pub total: usize,
    /// Questions flagged for review.
    pub flagged: usize,
}

/// One attempt at an exam or quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Session {
    /// Unique record identifier.
    pub id: String,
    /// Exam or quiz.
    pub kind: SessionKind,
    /// Exam name, or the quiz subject.
    pub name: String,
    /// Subject the questions were generated for.
    #[serde(default)]
    pub subject: Option<String>,
    /// Question snapshots; never rewritten after creation.
    pub questions: Vec<Question>,
    /// At most one answer per question id.
    #[serde(default)]
    pub answers: BTreeMap<String, Answer>,
    /// Question currently shown.
    #[serde(default)]
    pub current_index: usize,
    /// Question ids marked for review.
    #[serde(default)]
    pub flagged: BTreeSet<String>,
    /// Creation timestamp; the session clock starts here.
    pub started_at: DateTime<Utc>,
    /// Set exactly once, on completion.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Whether the learner paused the attempt.
    #[serde(default)]
    pub is_paused: bool,
    /// When the current pause began.
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
    /// Wall-clock seconds from start to completion, pauses included.
    #[serde(default)]
    pub total_time_seconds: Option<i64>,
}

impl Session {
    /// Construct a new active session with a generated identifier.
    #[must_use]
    pub fn new(
        kind: SessionKind,
        name: String,
        subject: Option<String>,
        questions: Vec<Question>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            name,
            subject,
            questions,
            answers: BTreeMap::new(),
            current_index: 0,
            flagged: BTreeSet::new(),
            started_at: now,
            completed_at: None,
            is_paused: false,
            paused_at: None,
            total_time_seconds: None,
        }
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        if self.completed_at.is_some() {
            SessionStatus::Completed
        } else if self.is_paused {
            SessionStatus::Paused
        } else {
            SessionStatus::Active
        }
    }

    /// Whether the session is terminal.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self.status(), next),
            (SessionStatus::Active, SessionStatus::Paused | SessionStatus::Completed)
                | (SessionStatus::Paused, SessionStatus::Active | SessionStatus::Completed)
        )
    }

    /// Look up a question snapshot by id.
    #[must_use]
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Answered/flagged counters.
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            answered: self.answers.len(),
            total: self.questions.len(),
            flagged: self.flagged.len(),
        }
    }
}

/// Persisted most-recent-first list of sessions of one kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionHistory {
    /// Sessions, newest first.
    pub sessions: Vec<Session>,
}
