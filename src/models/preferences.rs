//! Per-device preferences.

use serde::{Deserialize, Serialize};

/// Small settings document persisted under the `preferences` key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Preferences {
    /// Session resumed after a reload, if any.
    #[serde(default)]
    pub active_session_id: Option<String>,
}
