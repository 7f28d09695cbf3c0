#![forbid(unsafe_code)]

//! Interactive assessment runtime: resumable exam/quiz sessions, isolated
//! per-question code sandboxes, a diagram editor with undo/redo, and a
//! versioned, quota-bounded local store.

pub mod cli;
pub mod config;
pub mod diagram;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod persistence;
pub mod sandbox;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
