//! Live-status sources.

mod youtube;

pub use youtube::YouTubeStreamSource;

use async_trait::async_trait;

use crate::Result;
use crate::domain::{Channel, StreamObservation};

/// Fetches the current live status of a channel.
///
/// Errors follow the crate taxonomy: [`crate::Error::TransientSource`] is
/// retryable, [`crate::Error::QuotaExceeded`] suspends polling until the
/// reset boundary, [`crate::Error::FatalSource`] is not retried.
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// `Ok(Some(_))` when the channel is live, `Ok(None)` when it is not.
    async fn fetch_live_stream(&self, channel: &Channel) -> Result<Option<StreamObservation>>;
}
