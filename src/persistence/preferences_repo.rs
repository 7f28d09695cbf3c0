//! Preferences document in the durable store.

use super::store::{DurableStore, StoreKey, Versioned};
use crate::models::preferences::Preferences;
use crate::Result;

impl Versioned for Preferences {
    const SCHEMA_VERSION: u32 = 1;
}

/// Repository wrapper for device preferences.
#[derive(Clone)]
pub struct PreferencesRepo {
    store: DurableStore,
}

impl PreferencesRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(store: DurableStore) -> Self {
        Self { store }
    }

    /// Load preferences, defaulting when absent.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the stored document cannot be read.
    pub async fn load(&self) -> Result<Preferences> {
        self.store.load(StoreKey::Preferences).await
    }

    /// Replace preferences.
    ///
    /// # Errors
    ///
    /// Returns `AppError::QuotaExceeded` if the store is full, or another
    /// persistence error.
    pub async fn save(&self, preferences: &Preferences) -> Result<()> {
        self.store.save(StoreKey::Preferences, preferences).await
    }
}
