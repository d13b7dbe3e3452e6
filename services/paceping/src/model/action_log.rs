//! Append-only audit record for administrative commands.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ActionLogEntry {
    pub subscriber_id: String,
    pub logged_at: DateTime<Utc>,
    /// Command name followed by its label argument, e.g. `pace_add Sprint_1`.
    pub action: String,
}

impl ActionLogEntry {
    pub fn now(subscriber_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            subscriber_id: subscriber_id.into(),
            logged_at: Utc::now(),
            action: action.into(),
        }
    }
}
