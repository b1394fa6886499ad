//! The monitor loop: fetch -> detect -> notify -> persist per channel, on a
//! wall-clock aligned timer with quota suspension and graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::{Channel, ChannelState};
use crate::notification::NotificationFanout;
use crate::source::StreamSource;
use crate::state::StateStore;
use crate::{Error, Result};

use super::detector;
use super::schedule;

/// Monitor loop configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Poll cadence in seconds; ticks align to multiples of this on the
    /// local wall clock.
    pub check_interval_secs: u32,
    /// Delay before the next attempt after a tick-level failure.
    pub retry_delay: Duration,
    /// Timezone used for grid alignment.
    pub timezone: Tz,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 300,
            retry_delay: Duration::from_secs(60),
            timezone: chrono_tz::Asia::Tokyo,
        }
    }
}

/// The monitor service.
///
/// Processes all channels sequentially within one tick; per-channel failures
/// are isolated, quota exhaustion suspends the whole loop until the reset
/// boundary. State is only advanced after a start notification succeeded, so
/// delivery is at-least-once across ticks.
pub struct MonitorService<S, P>
where
    S: StreamSource + Send + Sync + 'static,
    P: StateStore + Send + Sync + 'static,
{
    source: Arc<S>,
    store: Arc<P>,
    fanout: NotificationFanout,
    channels: Vec<Channel>,
    config: MonitorConfig,
    cancellation: CancellationToken,
}

impl<S, P> MonitorService<S, P>
where
    S: StreamSource + Send + Sync + 'static,
    P: StateStore + Send + Sync + 'static,
{
    pub fn new(
        source: Arc<S>,
        store: Arc<P>,
        fanout: NotificationFanout,
        channels: Vec<Channel>,
        config: MonitorConfig,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            source,
            store,
            fanout,
            channels,
            config,
            cancellation,
        }
    }

    /// Run the loop until cancelled. The first tick fires immediately;
    /// subsequent ticks align to the wall-clock grid.
    pub async fn run(&self) {
        info!(
            channels = self.channels.len(),
            interval_secs = self.config.check_interval_secs,
            timezone = %self.config.timezone,
            "Starting stream monitor"
        );
        for channel in &self.channels {
            info!(
                channel = %channel.id(),
                name = channel.display_name(),
                targets = channel.targets().len(),
                "Watching channel"
            );
        }

        while !self.cancellation.is_cancelled() {
            let wait = match self.tick().await {
                Ok(()) => {
                    let now = Utc::now().with_timezone(&self.config.timezone);
                    let secs =
                        schedule::seconds_until_next_tick(&now, self.config.check_interval_secs);
                    debug!(wait_secs = secs, "Tick complete, waiting for next boundary");
                    Duration::from_secs(secs)
                }
                Err(Error::QuotaExceeded { resets_at }) => {
                    let wait = (resets_at - Utc::now())
                        .to_std()
                        .unwrap_or(self.config.retry_delay);
                    warn!(
                        resets_at = %resets_at,
                        wait_secs = wait.as_secs(),
                        "API quota exceeded, suspending polling until reset"
                    );
                    wait
                }
                Err(e) => {
                    error!(error = %e, "Tick failed, retrying after delay");
                    self.config.retry_delay
                }
            };

            self.wait(wait).await;
        }

        info!("Stream monitor stopped");
    }

    /// One pass over all channels.
    ///
    /// Per-channel errors are logged and do not abort the batch; quota
    /// exhaustion aborts immediately since every further fetch would fail
    /// the same way.
    pub async fn tick(&self) -> Result<()> {
        debug!(channels = self.channels.len(), "Checking channels");

        for channel in &self.channels {
            match self.check_channel(channel).await {
                Ok(()) => {}
                Err(e @ Error::QuotaExceeded { .. }) => return Err(e),
                Err(e) => {
                    error!(
                        channel = %channel.id(),
                        name = channel.display_name(),
                        error = %e,
                        "Channel check failed"
                    );
                }
            }
        }

        Ok(())
    }

    /// Check one channel: fetch the live status, classify the transition
    /// against the persisted state, notify on start, persist the outcome.
    pub async fn check_channel(&self, channel: &Channel) -> Result<()> {
        debug!(channel = %channel.id(), "Checking channel");

        let observation = self.source.fetch_live_stream(channel).await?;
        let previous = self.store.get(channel.id()).await?;
        let now = Utc::now();

        if detector::is_stream_started(previous.as_ref(), observation.as_ref()) {
            // is_stream_started never holds without an observation.
            let Some(observation) = &observation else {
                return Ok(());
            };

            info!(
                channel = %channel.id(),
                name = channel.display_name(),
                stream = %observation.stream_id,
                title = %observation.title,
                "Stream started"
            );

            // Notify first; if every target failed the state stays untouched
            // so the next tick detects the start again and retries.
            self.fanout.send_stream_start(channel, observation).await?;

            let state = ChannelState::live(observation.stream_id.clone(), now, Some(now));
            self.store.put(channel.id(), state).await?;
        } else if let Some(observation) = &observation {
            // Continuing live: refresh the check time and stream id, keep
            // the notification time.
            if previous.as_ref().is_some_and(|p| p.is_live) {
                let last_notified = previous.as_ref().and_then(|p| p.last_notified_at);
                let state = ChannelState::live(observation.stream_id.clone(), now, last_notified);
                self.store.put(channel.id(), state).await?;
            }
        } else {
            if detector::is_stream_ended(previous.as_ref(), observation.as_ref()) {
                info!(
                    channel = %channel.id(),
                    name = channel.display_name(),
                    "Stream ended"
                );
            }

            match &previous {
                // Already offline: skip the redundant write.
                Some(p) if !p.is_live => {}
                _ => {
                    let last_notified = previous.as_ref().and_then(|p| p.last_notified_at);
                    self.store
                        .put(channel.id(), ChannelState::offline(now, last_notified))
                        .await?;
                }
            }
        }

        Ok(())
    }

    /// Sleep for `duration`, returning early on cancellation.
    async fn wait(&self, duration: Duration) {
        tokio::select! {
            _ = self.cancellation.cancelled() => {
                debug!("Wait interrupted by shutdown signal");
            }
            _ = tokio::time::sleep(duration) => {}
        }
    }
}
