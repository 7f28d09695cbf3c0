//! Session and deck orchestration.
//!
//! Covers the pure session state machine, the session manager that persists
//! it, and flashcard deck management.

pub mod deck_manager;
pub mod lifecycle;
pub mod session_manager;
