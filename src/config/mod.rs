//! Application settings, loaded from a JSON config file plus environment.
//!
//! The API key comes from the environment (`YOUTUBE_API_KEY`, `.env`
//! supported); everything else lives in the config file. Webhook targets can
//! be declared in two ways, per channel or shared:
//!
//! ```json
//! {
//!   "channels": [
//!     {"id": "UC…", "name": "Streamer A",
//!      "webhooks": [{"url": "https://discord.com/api/webhooks/…", "mention": "@everyone"}]}
//!   ],
//!   "webhooks": [
//!     {"name": "main server", "url": "https://discord.com/api/webhooks/…",
//!      "mention": "<@&123>", "channels": ["UC…"]}
//!   ]
//! }
//! ```
//!
//! A channel's targets are the union of both forms, de-duplicated by URL.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::Deserialize;

use crate::domain::{Channel, ChannelId, WebhookTarget};
use crate::{Error, Result};

const DEFAULT_CHECK_INTERVAL_SECS: u32 = 300;
const DEFAULT_NOTIFICATION_COLOR: u32 = 0xFF0000;
const DEFAULT_QUOTA_RESET_HOUR: u32 = 18;
const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";

/// Resolved application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub youtube_api_key: String,
    pub check_interval_secs: u32,
    /// Embed accent color for start notifications.
    pub notification_color: u32,
    /// Timezone for tick alignment and the quota reset boundary.
    pub timezone: Tz,
    /// Local hour at which the API quota resets.
    pub quota_reset_hour: u32,
    pub state_file: PathBuf,
    pub log_dir: PathBuf,
    /// Optional tracing filter directive (`RUST_LOG` still wins).
    pub log_filter: Option<String>,
    pub channels: Vec<Channel>,
}

impl Settings {
    /// Load settings from the config file and environment.
    pub fn load(path: &Path) -> Result<Self> {
        let api_key = std::env::var("YOUTUBE_API_KEY")
            .map_err(|_| Error::config("YOUTUBE_API_KEY is not set"))?;

        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config file {}: {e}", path.display()))
        })?;

        Self::from_json(&raw, api_key)
    }

    /// Parse and validate settings from a JSON document.
    pub fn from_json(json: &str, youtube_api_key: String) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(json)?;
        Self::from_raw(raw, youtube_api_key)
    }

    fn from_raw(raw: RawConfig, youtube_api_key: String) -> Result<Self> {
        if raw.check_interval == 0 {
            return Err(Error::config("check_interval must be positive"));
        }
        if raw.quota_reset_hour >= 24 {
            return Err(Error::config(format!(
                "quota_reset_hour out of range: {}",
                raw.quota_reset_hour
            )));
        }
        let timezone: Tz = raw
            .timezone
            .parse()
            .map_err(|_| Error::config(format!("unknown timezone: {}", raw.timezone)))?;

        if raw.channels.is_empty() {
            return Err(Error::config("no channels configured"));
        }

        // Resolve shared webhooks to their channels.
        let known_ids: HashSet<&str> = raw.channels.iter().map(|c| c.id.as_str()).collect();
        let mut shared: HashMap<String, Vec<WebhookTarget>> = HashMap::new();
        for hook in &raw.webhooks {
            let target = WebhookTarget::new(&hook.url, &hook.mention)?;
            for id in &hook.channels {
                if !known_ids.contains(id.as_str()) {
                    return Err(Error::config(format!(
                        "webhook '{}' references unknown channel id {id}",
                        hook.name
                    )));
                }
                shared.entry(id.clone()).or_default().push(target.clone());
            }
        }

        let mut channels = Vec::with_capacity(raw.channels.len());
        for ch in raw.channels {
            let id = ChannelId::parse(&ch.id)?;

            let mut targets = ch
                .webhooks
                .iter()
                .map(|w| WebhookTarget::new(&w.url, &w.mention))
                .collect::<Result<Vec<_>>>()?;
            if let Some(extra) = shared.remove(id.as_str()) {
                targets.extend(extra);
            }

            channels.push(Channel::new(id, ch.name, targets)?);
        }

        Ok(Self {
            youtube_api_key,
            check_interval_secs: raw.check_interval,
            notification_color: raw.notification.color,
            timezone,
            quota_reset_hour: raw.quota_reset_hour,
            state_file: raw.state_file,
            log_dir: raw.log_dir,
            log_filter: raw.log_filter,
            channels,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_check_interval")]
    check_interval: u32,
    #[serde(default)]
    notification: RawNotification,
    #[serde(default = "default_timezone")]
    timezone: String,
    #[serde(default = "default_quota_reset_hour")]
    quota_reset_hour: u32,
    #[serde(default = "default_state_file")]
    state_file: PathBuf,
    #[serde(default = "default_log_dir")]
    log_dir: PathBuf,
    #[serde(default)]
    log_filter: Option<String>,
    #[serde(default)]
    webhooks: Vec<RawSharedWebhook>,
    #[serde(default)]
    channels: Vec<RawChannel>,
}

#[derive(Debug, Deserialize)]
struct RawNotification {
    #[serde(default = "default_color")]
    color: u32,
}

impl Default for RawNotification {
    fn default() -> Self {
        Self {
            color: DEFAULT_NOTIFICATION_COLOR,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    id: String,
    name: String,
    #[serde(default)]
    webhooks: Vec<RawWebhook>,
}

#[derive(Debug, Deserialize)]
struct RawWebhook {
    url: String,
    #[serde(default)]
    mention: String,
}

#[derive(Debug, Deserialize)]
struct RawSharedWebhook {
    #[serde(default)]
    name: String,
    url: String,
    #[serde(default)]
    mention: String,
    #[serde(default)]
    channels: Vec<String>,
}

fn default_check_interval() -> u32 {
    DEFAULT_CHECK_INTERVAL_SECS
}

fn default_color() -> u32 {
    DEFAULT_NOTIFICATION_COLOR
}

fn default_quota_reset_hour() -> u32 {
    DEFAULT_QUOTA_RESET_HOUR
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from("data/state.json")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}
