//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when interacting with `SQLite`.
    Db(String),
    /// A stored or submitted document could not be (de)serialized.
    Serialization(String),
    /// The durable store refused a write because its hard quota is exhausted.
    QuotaExceeded(String),
    /// A sandbox interpreter failed to load; terminal for that instance.
    Bootstrap(String),
    /// A sandbox was asked to run before it reached `Ready`.
    NotReady(String),
    /// A sandbox already has a run in flight.
    Busy(String),
    /// The session is completed and accepts no further writes.
    SessionCompleted(String),
    /// An answer payload does not fit the question it targets.
    InvalidAnswer(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// Diagram export failure.
    Export(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl AppError {
    /// Whether this error is the distinguishable quota-exceeded condition.
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::Serialization(msg) => write!(f, "serialization: {msg}"),
            Self::QuotaExceeded(msg) => write!(f, "quota exceeded: {msg}"),
            Self::Bootstrap(msg) => write!(f, "bootstrap: {msg}"),
            Self::NotReady(msg) => write!(f, "not ready: {msg}"),
            Self::Busy(msg) => write!(f, "busy: {msg}"),
            Self::SessionCompleted(msg) => write!(f, "session completed: {msg}"),
            Self::InvalidAnswer(msg) => write!(f, "invalid answer: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Export(msg) => write!(f, "export: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        Self::Export(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
