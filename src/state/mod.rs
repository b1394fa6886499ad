//! Channel state persistence.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::domain::{ChannelId, ChannelState};
use crate::{Error, Result};

/// Durable per-channel state, keyed by channel id.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, channel_id: &ChannelId) -> Result<Option<ChannelState>>;

    /// Persist the state. Failures surface as [`Error::Persistence`] and must
    /// never be reported as success.
    async fn put(&self, channel_id: &ChannelId, state: ChannelState) -> Result<()>;
}

/// JSON-file backed [`StateStore`].
///
/// The whole map lives in memory and is rewritten to disk on every `put`.
/// Channel counts are tens, not thousands; a full rewrite per transition is
/// cheap and keeps the file human-readable.
pub struct JsonStateStore {
    path: PathBuf,
    cache: Mutex<HashMap<String, ChannelState>>,
}

impl JsonStateStore {
    /// Open the store, loading any persisted state. A missing file starts
    /// empty; a corrupt file is logged and also starts empty rather than
    /// blocking startup.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let cache = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, ChannelState>>(&bytes) {
                Ok(map) => {
                    info!(
                        path = %path.display(),
                        channels = map.len(),
                        "Loaded persisted channel states"
                    );
                    map
                }
                Err(e) => {
                    error!(
                        path = %path.display(),
                        error = %e,
                        "State file is corrupt, starting with empty state"
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No state file yet, starting fresh");
                HashMap::new()
            }
            Err(e) => {
                return Err(Error::persistence(format!(
                    "failed to read state file {}: {e}",
                    path.display()
                )));
            }
        };

        Ok(Self {
            path,
            cache: Mutex::new(cache),
        })
    }

    async fn flush(&self, snapshot: &HashMap<String, ChannelState>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::persistence(format!(
                    "failed to create state directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let json = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&self.path, json).await.map_err(|e| {
            Error::persistence(format!(
                "failed to write state file {}: {e}",
                self.path.display()
            ))
        })
    }
}

#[async_trait]
impl StateStore for JsonStateStore {
    async fn get(&self, channel_id: &ChannelId) -> Result<Option<ChannelState>> {
        Ok(self.cache.lock().await.get(channel_id.as_str()).cloned())
    }

    async fn put(&self, channel_id: &ChannelId, state: ChannelState) -> Result<()> {
        let mut cache = self.cache.lock().await;

        // Write through a snapshot so a failed flush leaves the cache
        // matching what is actually on disk.
        let mut snapshot = cache.clone();
        snapshot.insert(channel_id.as_str().to_string(), state);
        self.flush(&snapshot).await?;
        *cache = snapshot;

        debug!(channel = %channel_id, "State persisted");
        Ok(())
    }
}
