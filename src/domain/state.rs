//! Persisted per-channel monitoring state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-known state of one channel, persisted across restarts.
///
/// Invariant: `stream_id` is `Some` iff `is_live` is true. Construct through
/// [`ChannelState::live`] / [`ChannelState::offline`] to keep it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    pub is_live: bool,
    pub stream_id: Option<String>,
    pub last_checked_at: DateTime<Utc>,
    pub last_notified_at: Option<DateTime<Utc>>,
}

impl ChannelState {
    /// State for a channel observed live.
    pub fn live(
        stream_id: impl Into<String>,
        checked_at: DateTime<Utc>,
        notified_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            is_live: true,
            stream_id: Some(stream_id.into()),
            last_checked_at: checked_at,
            last_notified_at: notified_at,
        }
    }

    /// State for a channel observed offline. `last_notified_at` is carried
    /// over from the previous state so it is never regressed.
    pub fn offline(checked_at: DateTime<Utc>, last_notified_at: Option<DateTime<Utc>>) -> Self {
        Self {
            is_live: false,
            stream_id: None,
            last_checked_at: checked_at,
            last_notified_at,
        }
    }
}
