//! Domain model module declarations.

pub mod answer;
pub mod deck;
pub mod preferences;
pub mod question;
pub mod runtime;
pub mod session;
pub mod shape;
