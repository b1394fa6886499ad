use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use livewatch::config::Settings;
use livewatch::monitor::{MonitorConfig, MonitorService, QuotaResetPolicy};
use livewatch::notification::{DiscordWebhookSender, NotificationFanout};
use livewatch::source::YouTubeStreamSource;
use livewatch::state::JsonStateStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/config.json"));
    let settings = Settings::load(&config_path)?;

    let _guard = livewatch::logging::init(&settings.log_dir, settings.log_filter.as_deref())?;
    info!(config = %config_path.display(), "livewatch starting");

    let quota_reset = QuotaResetPolicy::new(settings.timezone, settings.quota_reset_hour)?;
    let source = Arc::new(YouTubeStreamSource::new(
        settings.youtube_api_key.clone(),
        quota_reset,
    )?);
    let store = Arc::new(JsonStateStore::open(&settings.state_file).await?);
    let sender = Arc::new(DiscordWebhookSender::new()?);
    let fanout = NotificationFanout::new(sender, settings.notification_color);

    let cancellation = CancellationToken::new();
    let monitor = MonitorService::new(
        source,
        store,
        fanout,
        settings.channels.clone(),
        MonitorConfig {
            check_interval_secs: settings.check_interval_secs,
            retry_delay: Duration::from_secs(60),
            timezone: settings.timezone,
        },
        cancellation.clone(),
    );

    let shutdown = cancellation.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                shutdown.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    monitor.run().await;

    info!("livewatch stopped");
    Ok(())
}
