//! Stream-start notifications.
//!
//! - Message rendering for the Discord embed payload
//! - Per-target webhook delivery
//! - Fan-out across a channel's targets with partial-failure aggregation

mod fanout;
mod message;
mod sender;

pub use fanout::{FanoutReport, NotificationFanout, TargetOutcome};
pub use message::StreamStartMessage;
pub use sender::{DELIVERY_TIMEOUT, DiscordWebhookSender, WebhookSender};
