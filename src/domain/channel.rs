//! Channel and webhook target value objects.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

fn channel_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^UC[A-Za-z0-9_-]{22}$").unwrap())
}

fn webhook_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https://discord(?:app)?\.com/api/webhooks/\d+/[A-Za-z0-9_-]+$").unwrap()
    })
}

/// A validated YouTube channel identifier (`UC` followed by 22 id characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Parse and validate a channel id.
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if !channel_id_pattern().is_match(&value) {
            return Err(Error::config(format!("invalid channel id format: {value}")));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the uploads playlist id. YouTube convention: `UC…` -> `UU…`.
    pub fn uploads_playlist_id(&self) -> String {
        format!("UU{}", &self.0[2..])
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Discord webhook endpoint with its mention text.
///
/// Equality is by (url, mention); two targets with the same url but different
/// mentions are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WebhookTarget {
    url: String,
    mention: String,
}

impl WebhookTarget {
    /// Create a target, validating the Discord webhook URL shape.
    pub fn new(url: impl Into<String>, mention: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if !webhook_url_pattern().is_match(&url) {
            return Err(Error::config(format!("invalid webhook URL format: {url}")));
        }
        Ok(Self {
            url,
            mention: mention.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mention(&self) -> &str {
        &self.mention
    }
}

/// A monitored channel with its notification targets.
///
/// Immutable for the process lifetime; identity is the channel id.
#[derive(Debug, Clone)]
pub struct Channel {
    id: ChannelId,
    display_name: String,
    targets: Vec<WebhookTarget>,
}

impl Channel {
    /// Create a channel. Requires a non-empty display name and at least one
    /// webhook target; duplicate targets (same url) are dropped, keeping the
    /// first occurrence.
    pub fn new(
        id: ChannelId,
        display_name: impl Into<String>,
        targets: Vec<WebhookTarget>,
    ) -> Result<Self> {
        let display_name = display_name.into();
        if display_name.is_empty() {
            return Err(Error::config(format!("channel {id} has an empty name")));
        }

        let mut deduped: Vec<WebhookTarget> = Vec::with_capacity(targets.len());
        for target in targets {
            if !deduped.iter().any(|t| t.url() == target.url()) {
                deduped.push(target);
            }
        }

        if deduped.is_empty() {
            return Err(Error::config(format!(
                "channel '{display_name}' ({id}) has no webhook targets"
            )));
        }

        Ok(Self {
            id,
            display_name,
            targets: deduped,
        })
    }

    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn targets(&self) -> &[WebhookTarget] {
        &self.targets
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Channel {}

impl std::hash::Hash for Channel {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
