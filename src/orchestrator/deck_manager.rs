//! Flashcard deck management.
//!
//! Same persistence contract as sessions: memory first, then a whole-value
//! write of every deck. Unknown deck or card ids are silent no-ops.

use tracing::{debug, info, warn};

use crate::models::deck::{Deck, DeckCollection, Flashcard};
use crate::persistence::deck_repo::DeckRepo;
use crate::persistence::store::DurableStore;
use crate::Result;

/// Flashcard deck service with injected persistence.
pub struct DeckManager {
    repo: DeckRepo,
    decks: DeckCollection,
}

impl DeckManager {
    /// Load every deck from `store`. An undecodable document loads as no
    /// decks.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store cannot be read.
    pub async fn load(store: DurableStore) -> Result<Self> {
        let repo = DeckRepo::new(store);
        let decks = repo.load().await?;
        debug!(decks = decks.decks.len(), "decks loaded");
        Ok(Self { repo, decks })
    }

    /// Decks, newest first.
    #[must_use]
    pub fn list(&self) -> &[Deck] {
        &self.decks.decks
    }

    /// Look up a deck.
    #[must_use]
    pub fn get(&self, deck_id: &str) -> Option<&Deck> {
        self.decks.decks.iter().find(|d| d.id == deck_id)
    }

    /// Create a deck from generated cards.
    ///
    /// # Errors
    ///
    /// Returns the storage error if persisting fails; the deck is kept in
    /// memory regardless.
    pub async fn create_deck(&mut self, name: String, cards: Vec<Flashcard>) -> Result<Deck> {
        let deck = Deck::new(name, cards);
        self.decks.decks.insert(0, deck.clone());
        info!(deck_id = %deck.id, cards = deck.cards.len(), "deck created");
        self.persist().await.map(|()| deck)
    }

    /// Append a card to a deck. Returns `Ok(None)` for an unknown deck.
    ///
    /// # Errors
    ///
    /// Returns the storage error after the card was added.
    pub async fn add_card(&mut self, deck_id: &str, card: Flashcard) -> Result<Option<Deck>> {
        let Some(deck) = self.decks.decks.iter_mut().find(|d| d.id == deck_id) else {
            debug!(deck_id, "add_card on unknown deck ignored");
            return Ok(None);
        };
        deck.cards.push(card);
        let updated = deck.clone();
        self.persist().await.map(|()| Some(updated))
    }

    /// Remove a card. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns the storage error after the card was removed.
    pub async fn remove_card(&mut self, deck_id: &str, card_id: &str) -> Result<bool> {
        let Some(deck) = self.decks.decks.iter_mut().find(|d| d.id == deck_id) else {
            return Ok(false);
        };
        let before = deck.cards.len();
        deck.cards.retain(|c| c.id != card_id);
        if deck.cards.len() == before {
            return Ok(false);
        }
        self.persist().await.map(|()| true)
    }

    /// Delete a deck. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns the storage error after the deck was removed.
    pub async fn delete_deck(&mut self, deck_id: &str) -> Result<bool> {
        let before = self.decks.decks.len();
        self.decks.decks.retain(|d| d.id != deck_id);
        if self.decks.decks.len() == before {
            return Ok(false);
        }
        info!(deck_id, "deck deleted");
        self.persist().await.map(|()| true)
    }

    async fn persist(&self) -> Result<()> {
        let result = self.repo.save(&self.decks).await;
        if let Err(err) = &result {
            warn!(%err, "decks not persisted; change kept in memory");
        }
        result
    }
}
