//! Notification fan-out across a channel's webhook targets.
//!
//! Delivery is independent per target and never short-circuited: a failing
//! target does not abort the remaining ones. The fan-out succeeds if at
//! least one target accepted the message; it fails only when every target
//! failed. There are no retries within one fan-out call; a start event that
//! could not be delivered anywhere is retried on the next poll because the
//! caller leaves the channel state unchanged.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{Channel, StreamObservation};
use crate::notification::message::StreamStartMessage;
use crate::notification::sender::{DELIVERY_TIMEOUT, WebhookSender};
use crate::{Error, Result};

/// How much of a webhook URL is kept in logs and error details.
const URL_LOG_PREFIX_LEN: usize = 50;

/// Result of one delivery attempt to one target.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    /// Truncated target URL, safe for logs.
    pub url_prefix: String,
    /// `None` when delivered, otherwise the failure reason.
    pub error: Option<String>,
}

impl TargetOutcome {
    pub fn delivered(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated result of one fan-out call.
#[derive(Debug, Clone)]
pub struct FanoutReport {
    pub outcomes: Vec<TargetOutcome>,
}

impl FanoutReport {
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.delivered()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }
}

/// Fans a stream-start event out to every target of a channel.
pub struct NotificationFanout {
    sender: Arc<dyn WebhookSender>,
    color: u32,
}

impl NotificationFanout {
    pub fn new(sender: Arc<dyn WebhookSender>, color: u32) -> Self {
        Self { sender, color }
    }

    /// Deliver the start event to all targets of `channel`.
    ///
    /// Returns `Ok` with the per-target report when at least one target
    /// succeeded (failures are logged, not surfaced); returns
    /// [`Error::Notification`] listing every failure when all targets failed.
    pub async fn send_stream_start(
        &self,
        channel: &Channel,
        observation: &StreamObservation,
    ) -> Result<FanoutReport> {
        let message = StreamStartMessage::stream_started(channel, observation, self.color);

        info!(
            channel = %channel.id(),
            name = channel.display_name(),
            targets = channel.targets().len(),
            "Sending stream-start notification"
        );

        let attempts = channel.targets().iter().map(|target| {
            let message = &message;
            async move {
                let outcome =
                    tokio::time::timeout(DELIVERY_TIMEOUT, self.sender.deliver(target, message))
                        .await;
                let error = match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e.to_string()),
                    Err(_) => Some(format!(
                        "timed out after {}s",
                        DELIVERY_TIMEOUT.as_secs()
                    )),
                };
                TargetOutcome {
                    url_prefix: truncate_url(target.url()),
                    error,
                }
            }
        });

        let outcomes: Vec<TargetOutcome> = futures::future::join_all(attempts).await;

        for outcome in outcomes.iter().filter(|o| !o.delivered()) {
            warn!(
                channel = %channel.id(),
                target = %outcome.url_prefix,
                error = outcome.error.as_deref().unwrap_or(""),
                "Webhook delivery failed"
            );
        }

        let report = FanoutReport { outcomes };
        info!(
            channel = %channel.id(),
            delivered = report.delivered(),
            total = report.outcomes.len(),
            "Stream-start notification fan-out complete"
        );

        if report.delivered() == 0 {
            let details = report
                .outcomes
                .iter()
                .map(|o| {
                    format!(
                        "{}: {}",
                        o.url_prefix,
                        o.error.as_deref().unwrap_or("unknown error")
                    )
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::Notification {
                channel: channel.display_name().to_string(),
                details,
            });
        }

        Ok(report)
    }
}

fn truncate_url(url: &str) -> String {
    url.chars().take(URL_LOG_PREFIX_LEN).collect()
}
