//! Flashcard deck documents in the durable store.

use super::store::{keep_newest, Collection, DurableStore, StoreKey, Versioned};
use crate::models::deck::DeckCollection;
use crate::Result;

impl Versioned for DeckCollection {
    const SCHEMA_VERSION: u32 = 1;
}

impl Collection for DeckCollection {
    fn retain_newest(&mut self, max_entries: usize) -> usize {
        keep_newest(&mut self.decks, max_entries, |d| d.created_at)
    }
}

/// Repository wrapper for flashcard decks.
#[derive(Clone)]
pub struct DeckRepo {
    store: DurableStore,
}

impl DeckRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(store: DurableStore) -> Self {
        Self { store }
    }

    /// Load every deck.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the stored document cannot be read.
    pub async fn load(&self) -> Result<DeckCollection> {
        self.store.load(StoreKey::Decks).await
    }

    /// Replace every deck.
    ///
    /// # Errors
    ///
    /// Returns `AppError::QuotaExceeded` if the store is full, or another
    /// persistence error.
    pub async fn save(&self, decks: &DeckCollection) -> Result<()> {
        self.store.save(StoreKey::Decks, decks).await
    }
}
