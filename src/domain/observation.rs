//! A single live-stream observation from a poll.

use chrono::{DateTime, Utc};

/// What the source saw for a channel at one poll: the currently live
/// broadcast, if any. Ephemeral; never persisted.
///
/// Identity is the stream id.
#[derive(Debug, Clone)]
pub struct StreamObservation {
    /// Video id of the live broadcast.
    pub stream_id: String,
    /// Broadcast title.
    pub title: String,
    /// Thumbnail image URL.
    pub thumbnail_url: String,
    /// Actual start time reported by the platform.
    pub started_at: DateTime<Utc>,
}

impl StreamObservation {
    /// Public watch URL for the broadcast.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.stream_id)
    }
}

impl PartialEq for StreamObservation {
    fn eq(&self, other: &Self) -> bool {
        self.stream_id == other.stream_id
    }
}

impl Eq for StreamObservation {}
