//! Capacity-bounded retention for session histories.
//!
//! Complements the per-call cap applied on session creation: a sweep over
//! the persisted collections drops the oldest sessions beyond each cap, so
//! histories written by older builds or with larger caps converge.

use tracing::info;

use super::store::{DurableStore, StoreKey};
use crate::config::HistoryConfig;
use crate::models::session::{SessionHistory, SessionKind};
use crate::Result;

/// Enforce the configured cap on every session collection.
///
/// Returns the total number of sessions evicted.
///
/// # Errors
///
/// Returns a persistence error if a collection cannot be loaded or saved.
pub async fn enforce_caps(store: &DurableStore, caps: &HistoryConfig) -> Result<usize> {
    let mut evicted = 0;
    for kind in SessionKind::ALL {
        let cap = caps.cap_for(kind);
        evicted += store
            .evict_oldest::<SessionHistory>(StoreKey::for_sessions(kind), cap)
            .await?;
    }

    info!(evicted, "retention sweep completed");
    Ok(evicted)
}
