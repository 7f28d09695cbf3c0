//! Pure session state transitions.
//!
//! [`apply`] maps `(session, command, now)` to an [`Outcome`] without
//! touching storage; [`insert_capped`] maintains a most-recent-first,
//! capped history. Persistence is layered on top by the session manager.

use chrono::{DateTime, Utc};

use crate::models::answer::Answer;
use crate::models::session::{Session, SessionStatus};
use crate::{AppError, Result};

/// A mutation requested against one session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Upsert the answer for `answer.question_id`.
    RecordAnswer(Answer),
    /// `Active -> Paused`.
    Pause,
    /// `Paused -> Active`.
    Resume,
    /// `Active | Paused -> Completed`.
    Complete,
    /// Move the navigation cursor.
    Navigate(usize),
    /// Flag or unflag a question for review.
    ToggleFlag(String),
}

impl SessionCommand {
    /// Short name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RecordAnswer(_) => "record_answer",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Complete => "complete",
            Self::Navigate(_) => "navigate",
            Self::ToggleFlag(_) => "toggle_flag",
        }
    }
}

/// Result of applying a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The command produced a new session value.
    Changed(Session),
    /// The command was a no-op in the current state.
    Unchanged,
}

/// Apply `command` to `session` at time `now`.
///
/// # Errors
///
/// Returns `AppError::SessionCompleted` for writes (answers, navigation,
/// flags) against a completed session, and `AppError::InvalidAnswer` when an
/// answer targets an unknown question or does not fit its type.
pub fn apply(
    session: &Session,
    command: &SessionCommand,
    now: DateTime<Utc>,
) -> Result<Outcome> {
    match command {
        SessionCommand::RecordAnswer(answer) => record_answer(session, answer),
        SessionCommand::Pause => Ok(pause(session, now)),
        SessionCommand::Resume => Ok(resume(session)),
        SessionCommand::Complete => Ok(complete(session, now)),
        SessionCommand::Navigate(index) => navigate(session, *index),
        SessionCommand::ToggleFlag(question_id) => toggle_flag(session, question_id),
    }
}

fn ensure_writable(session: &Session) -> Result<()> {
    if session.is_completed() {
        return Err(AppError::SessionCompleted(format!(
            "session {} no longer accepts writes",
            session.id
        )));
    }
    Ok(())
}

fn record_answer(session: &Session, answer: &Answer) -> Result<Outcome> {
    ensure_writable(session)?;

    let question = session.question(&answer.question_id).ok_or_else(|| {
        AppError::InvalidAnswer(format!(
            "question {} is not part of session {}",
            answer.question_id, session.id
        ))
    })?;

    if !answer.value.fits(&question.body) {
        return Err(AppError::InvalidAnswer(format!(
            "answer does not fit {} question {}",
            question.body.type_name(),
            question.id
        )));
    }

    if session.answers.get(&answer.question_id) == Some(answer) {
        return Ok(Outcome::Unchanged);
    }

    let mut next = session.clone();
    next.answers.insert(answer.question_id.clone(), answer.clone());
    Ok(Outcome::Changed(next))
}

fn pause(session: &Session, now: DateTime<Utc>) -> Outcome {
    if !session.can_transition_to(SessionStatus::Paused) {
        return Outcome::Unchanged;
    }
    let mut next = session.clone();
    next.is_paused = true;
    next.paused_at = Some(now);
    Outcome::Changed(next)
}

fn resume(session: &Session) -> Outcome {
    if session.status() != SessionStatus::Paused {
        return Outcome::Unchanged;
    }
    let mut next = session.clone();
    next.is_paused = false;
    next.paused_at = None;
    Outcome::Changed(next)
}

fn complete(session: &Session, now: DateTime<Utc>) -> Outcome {
    if !session.can_transition_to(SessionStatus::Completed) {
        return Outcome::Unchanged;
    }
    let mut next = session.clone();
    next.completed_at = Some(now);
    next.is_paused = false;
    next.paused_at = None;
    next.total_time_seconds = Some((now - session.started_at).num_seconds().max(0));
    Outcome::Changed(next)
}

fn navigate(session: &Session, index: usize) -> Result<Outcome> {
    ensure_writable(session)?;
    if index >= session.questions.len() || index == session.current_index {
        return Ok(Outcome::Unchanged);
    }
    let mut next = session.clone();
    next.current_index = index;
    Ok(Outcome::Changed(next))
}

fn toggle_flag(session: &Session, question_id: &str) -> Result<Outcome> {
    ensure_writable(session)?;
    if session.question(question_id).is_none() {
        return Ok(Outcome::Unchanged);
    }
    let mut next = session.clone();
    if !next.flagged.remove(question_id) {
        next.flagged.insert(question_id.to_owned());
    }
    Ok(Outcome::Changed(next))
}

/// Prepend `session` to a most-recent-first list and drop entries beyond
/// `cap` from the tail. Returns the evicted sessions, oldest last.
pub fn insert_capped(sessions: &mut Vec<Session>, session: Session, cap: usize) -> Vec<Session> {
    sessions.insert(0, session);
    if sessions.len() > cap {
        sessions.split_off(cap)
    } else {
        Vec::new()
    }
}
