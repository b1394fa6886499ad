//! Rendered stream-start message.

use chrono::{DateTime, Utc};

use crate::domain::{Channel, StreamObservation};

/// A stream-start event rendered for delivery. Target-independent; the
/// per-target mention text is applied by the sender.
#[derive(Debug, Clone)]
pub struct StreamStartMessage {
    pub title: String,
    pub description: String,
    pub url: String,
    pub thumbnail_url: String,
    /// Embed accent color.
    pub color: u32,
    pub timestamp: DateTime<Utc>,
}

impl StreamStartMessage {
    /// Render the start-event for a channel and the observed broadcast.
    pub fn stream_started(channel: &Channel, observation: &StreamObservation, color: u32) -> Self {
        Self {
            title: format!("🔴 {} is now live!", channel.display_name()),
            description: observation.title.clone(),
            url: observation.watch_url(),
            thumbnail_url: observation.thumbnail_url.clone(),
            color,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelId, WebhookTarget};

    #[test]
    fn test_stream_started_rendering() {
        let channel = Channel::new(
            ChannelId::parse("UCxxxxxxxxxxxxxxxx111111").unwrap(),
            "Streamer A",
            vec![WebhookTarget::new("https://discord.com/api/webhooks/1/a", "").unwrap()],
        )
        .unwrap();
        let observation = StreamObservation {
            stream_id: "v1".to_string(),
            title: "Playing games".to_string(),
            thumbnail_url: "https://i.ytimg.com/vi/v1/hqdefault.jpg".to_string(),
            started_at: Utc::now(),
        };

        let message = StreamStartMessage::stream_started(&channel, &observation, 0xFF0000);
        assert!(message.title.contains("Streamer A"));
        assert_eq!(message.description, "Playing games");
        assert_eq!(message.url, "https://www.youtube.com/watch?v=v1");
        assert_eq!(message.color, 0xFF0000);
    }
}
