//! Flashcard deck model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One front/back card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Flashcard {
    /// Unique record identifier.
    pub id: String,
    /// Prompt side.
    pub front: String,
    /// Answer side.
    pub back: String,
}

impl Flashcard {
    /// Construct a card with a generated identifier.
    #[must_use]
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            front: front.into(),
            back: back.into(),
        }
    }
}

/// Named collection of flashcards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Deck {
    /// Unique record identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Cards in insertion order.
    #[serde(default)]
    pub cards: Vec<Flashcard>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Deck {
    /// Construct a deck with a generated identifier.
    #[must_use]
    pub fn new(name: String, cards: Vec<Flashcard>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            cards,
            created_at: Utc::now(),
        }
    }
}

/// Persisted list of decks, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeckCollection {
    /// Decks, newest first.
    pub decks: Vec<Deck>,
}
