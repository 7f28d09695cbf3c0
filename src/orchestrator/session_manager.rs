//! Session lifecycle management: create, answer, pause, resume, complete,
//! delete.
//!
//! [`SessionManager`] owns the in-memory exam and quiz histories and writes
//! the affected history back through the durable store after every
//! mutation. A failed write never rolls back memory: the mutation stays
//! applied and the storage error is returned so the caller can warn the
//! learner that it may not survive a reload.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use super::lifecycle::{self, Outcome, SessionCommand};
use crate::config::HistoryConfig;
use crate::models::answer::Answer;
use crate::models::preferences::Preferences;
use crate::models::question::Question;
use crate::models::session::{Progress, Session, SessionHistory, SessionKind, SessionStatus};
use crate::persistence::preferences_repo::PreferencesRepo;
use crate::persistence::session_repo::SessionRepo;
use crate::persistence::store::DurableStore;
use crate::Result;

/// Exam/quiz session service with injected persistence.
pub struct SessionManager {
    repo: SessionRepo,
    preferences_repo: PreferencesRepo,
    caps: HistoryConfig,
    exams: SessionHistory,
    quizzes: SessionHistory,
    preferences: Preferences,
}

#[derive(Serialize)]
struct SessionExport<'a> {
    session: &'a Session,
    status: SessionStatus,
    progress: Progress,
}

impl SessionManager {
    /// Load both histories and preferences from `store`.
    ///
    /// Undecodable documents load as empty; storage read failures propagate.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store cannot be read.
    pub async fn load(store: DurableStore, caps: HistoryConfig) -> Result<Self> {
        let repo = SessionRepo::new(store.clone());
        let preferences_repo = PreferencesRepo::new(store);

        let exams = repo.load(SessionKind::Exam).await?;
        let quizzes = repo.load(SessionKind::Quiz).await?;
        let preferences = preferences_repo.load().await?;

        info!(
            exams = exams.sessions.len(),
            quizzes = quizzes.sessions.len(),
            "session histories loaded"
        );

        Ok(Self {
            repo,
            preferences_repo,
            caps,
            exams,
            quizzes,
            preferences,
        })
    }

    /// Sessions of `kind`, newest first.
    #[must_use]
    pub fn list(&self, kind: SessionKind) -> &[Session] {
        &self.history(kind).sessions
    }

    /// Look up a session of either kind.
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.locate(session_id)
            .map(|(kind, index)| &self.history(kind).sessions[index])
    }

    /// The session the learner is currently working in, if any.
    #[must_use]
    pub fn active_session(&self) -> Option<&Session> {
        self.preferences
            .active_session_id
            .as_deref()
            .and_then(|id| self.get(id))
    }

    /// Point the active-session pointer at `session_id`, or clear it.
    ///
    /// Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the preferences write fails; the pointer
    /// is updated in memory regardless.
    pub async fn set_active(&mut self, session_id: Option<&str>) -> Result<()> {
        if let Some(id) = session_id {
            if self.locate(id).is_none() {
                debug!(session_id = id, "set_active on unknown session ignored");
                return Ok(());
            }
        }
        self.preferences.active_session_id = session_id.map(ToOwned::to_owned);
        self.persist_preferences().await
    }

    /// Start a new session from a generated question set.
    ///
    /// The session is prepended to its history; the oldest session beyond
    /// the kind's cap is evicted. The new session becomes active.
    ///
    /// # Errors
    ///
    /// Returns the storage error if persisting fails. The session is still
    /// created and reachable through [`Self::active_session`].
    pub async fn create(
        &mut self,
        kind: SessionKind,
        name: String,
        subject: Option<String>,
        questions: Vec<Question>,
    ) -> Result<Session> {
        let session = Session::new(kind, name, subject, questions, Utc::now());
        let span = info_span!("create_session", session_id = %session.id, ?kind);

        async {
            let cap = self.caps.cap_for(kind);
            let sessions = &mut self.history_mut(kind).sessions;
            let evicted = lifecycle::insert_capped(sessions, session.clone(), cap);
            for old in &evicted {
                info!(evicted_id = %old.id, cap, "evicted oldest session");
                if self.preferences.active_session_id.as_deref() == Some(old.id.as_str()) {
                    self.preferences.active_session_id = None;
                }
            }
            self.preferences.active_session_id = Some(session.id.clone());

            let history = self.persist_history(kind).await;
            let preferences = self.persist_preferences().await;
            info!(questions = session.questions.len(), "session created");
            history.and(preferences).map(|()| session)
        }
        .instrument(span)
        .await
    }

    /// Record or replace the answer for `answer.question_id`.
    ///
    /// Returns `Ok(None)` when the session does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::SessionCompleted` on a completed session,
    /// `AppError::InvalidAnswer` for a mismatched payload (no state change
    /// in either case), or a storage error after the answer was applied.
    pub async fn record_answer(
        &mut self,
        session_id: &str,
        answer: Answer,
    ) -> Result<Option<Session>> {
        self.dispatch(session_id, SessionCommand::RecordAnswer(answer)).await
    }

    /// Pause an active session. No-op when paused or completed.
    ///
    /// # Errors
    ///
    /// Returns a storage error after the pause was applied.
    pub async fn pause(&mut self, session_id: &str) -> Result<Option<Session>> {
        self.dispatch(session_id, SessionCommand::Pause).await
    }

    /// Resume a paused session. No-op otherwise.
    ///
    /// # Errors
    ///
    /// Returns a storage error after the resume was applied.
    pub async fn resume(&mut self, session_id: &str) -> Result<Option<Session>> {
        self.dispatch(session_id, SessionCommand::Resume).await
    }

    /// Complete a session, stamping `completed_at` and `total_time_seconds`.
    ///
    /// Completing an already-completed session leaves it untouched.
    ///
    /// # Errors
    ///
    /// Returns a storage error after completion was applied.
    pub async fn complete(&mut self, session_id: &str) -> Result<Option<Session>> {
        self.dispatch(session_id, SessionCommand::Complete).await
    }

    /// Move the navigation cursor. Out-of-range indices are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AppError::SessionCompleted` on a completed session, or a
    /// storage error after the move was applied.
    pub async fn navigate(&mut self, session_id: &str, index: usize) -> Result<Option<Session>> {
        self.dispatch(session_id, SessionCommand::Navigate(index)).await
    }

    /// Flag or unflag `question_id` for review.
    ///
    /// # Errors
    ///
    /// Returns `AppError::SessionCompleted` on a completed session, or a
    /// storage error after the flag was applied.
    pub async fn toggle_flag(
        &mut self,
        session_id: &str,
        question_id: &str,
    ) -> Result<Option<Session>> {
        self.dispatch(session_id, SessionCommand::ToggleFlag(question_id.to_owned())).await
    }

    /// Delete a session. Clears the active pointer when it referenced it.
    ///
    /// Returns whether a session was removed.
    ///
    /// # Errors
    ///
    /// Returns a storage error after the deletion was applied.
    pub async fn delete(&mut self, session_id: &str) -> Result<bool> {
        let Some((kind, index)) = self.locate(session_id) else {
            debug!(session_id, "delete on unknown session ignored");
            return Ok(false);
        };

        self.history_mut(kind).sessions.remove(index);
        info!(session_id, ?kind, "session deleted");

        let history = self.persist_history(kind).await;
        if self.preferences.active_session_id.as_deref() == Some(session_id) {
            self.preferences.active_session_id = None;
            self.persist_preferences().await?;
        }
        history.map(|()| true)
    }

    /// Render a session as a pretty JSON document.
    ///
    /// Returns `Ok(None)` when the session does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Serialization` if encoding fails.
    pub fn export(&self, session_id: &str) -> Result<Option<String>> {
        let Some(session) = self.get(session_id) else {
            return Ok(None);
        };
        let document = SessionExport {
            session,
            status: session.status(),
            progress: session.progress(),
        };
        Ok(Some(serde_json::to_string_pretty(&document)?))
    }

    async fn dispatch(
        &mut self,
        session_id: &str,
        command: SessionCommand,
    ) -> Result<Option<Session>> {
        let Some((kind, index)) = self.locate(session_id) else {
            debug!(session_id, command = command.name(), "command on unknown session ignored");
            return Ok(None);
        };

        let span = info_span!("session_command", session_id, command = command.name());
        async {
            let current = &self.history(kind).sessions[index];
            match lifecycle::apply(current, &command, Utc::now())? {
                Outcome::Unchanged => {
                    debug!("command left session unchanged");
                    Ok(Some(current.clone()))
                }
                Outcome::Changed(next) => {
                    self.history_mut(kind).sessions[index] = next.clone();
                    info!(
                        status = ?next.status(),
                        answered = next.answers.len(),
                        "session updated"
                    );
                    self.persist_history(kind).await.map(|()| Some(next))
                }
            }
        }
        .instrument(span)
        .await
    }

    fn locate(&self, session_id: &str) -> Option<(SessionKind, usize)> {
        SessionKind::ALL.into_iter().find_map(|kind| {
            self.history(kind)
                .sessions
                .iter()
                .position(|s| s.id == session_id)
                .map(|index| (kind, index))
        })
    }

    fn history(&self, kind: SessionKind) -> &SessionHistory {
        match kind {
            SessionKind::Exam => &self.exams,
            SessionKind::Quiz => &self.quizzes,
        }
    }

    fn history_mut(&mut self, kind: SessionKind) -> &mut SessionHistory {
        match kind {
            SessionKind::Exam => &mut self.exams,
            SessionKind::Quiz => &mut self.quizzes,
        }
    }

    async fn persist_history(&self, kind: SessionKind) -> Result<()> {
        let result = self.repo.save(kind, self.history(kind)).await;
        if let Err(err) = &result {
            warn!(?kind, %err, "session history not persisted; change kept in memory");
        }
        result
    }

    async fn persist_preferences(&self) -> Result<()> {
        let result = self.preferences_repo.save(&self.preferences).await;
        if let Err(err) = &result {
            warn!(%err, "preferences not persisted; change kept in memory");
        }
        result
    }
}
