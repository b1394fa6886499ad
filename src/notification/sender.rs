//! Per-target webhook delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::domain::WebhookTarget;
use crate::notification::message::StreamStartMessage;
use crate::{Error, Result};

/// Bound on a single delivery attempt.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// One delivery to one webhook endpoint.
#[async_trait]
pub trait WebhookSender: Send + Sync {
    /// Deliver the message to the target. Failures include an HTTP status
    /// and body when available.
    async fn deliver(&self, target: &WebhookTarget, message: &StreamStartMessage) -> Result<()>;
}

/// Discord webhook sender.
pub struct DiscordWebhookSender {
    client: Client,
}

impl DiscordWebhookSender {
    /// Build a sender with the default delivery timeout. Fails if the HTTP
    /// client cannot be constructed; a client without the timeout would let
    /// a hung delivery stall the fan-out.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build webhook HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Build the Discord webhook payload: the mention as plain content plus
    /// one embed.
    fn build_payload(target: &WebhookTarget, message: &StreamStartMessage) -> serde_json::Value {
        json!({
            "content": target.mention(),
            "embeds": [{
                "title": message.title,
                "description": message.description,
                "url": message.url,
                "color": message.color,
                "image": { "url": message.thumbnail_url },
                "timestamp": message.timestamp.to_rfc3339(),
                "footer": { "text": "YouTube Live" },
            }],
        })
    }
}

#[async_trait]
impl WebhookSender for DiscordWebhookSender {
    async fn deliver(&self, target: &WebhookTarget, message: &StreamStartMessage) -> Result<()> {
        let payload = Self::build_payload(target, message);

        let response = self
            .client
            .post(target.url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::WebhookDelivery(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::WebhookDelivery(format!("{status} - {body}")));
        }

        debug!(url = target.url(), "Webhook delivered");
        Ok(())
    }
}
