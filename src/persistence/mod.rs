//! Persistence layer modules.
//!
//! Everything durable lives in one key/value table; each concern owns one
//! key and a versioned JSON document under it.

pub mod db;
pub mod deck_repo;
pub mod preferences_repo;
pub mod retention;
pub mod schema;
pub mod session_repo;
pub mod store;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;
