//! YouTube Data API v3 live-status source.
//!
//! Cost-optimized lookup: one `playlistItems.list` call on the channel's
//! uploads playlist followed by one `videos.list` call over the returned
//! ids (2 quota units per poll, versus 100 for `search.list`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::domain::{Channel, StreamObservation};
use crate::monitor::QuotaResetPolicy;
use crate::{Error, Result};

use super::StreamSource;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// How many recent uploads are scanned for a live broadcast.
const MAX_RECENT_VIDEOS: &str = "20";

const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF_BASE_SECS: u64 = 2;

/// YouTube Data API implementation of [`StreamSource`].
pub struct YouTubeStreamSource {
    client: Client,
    api_key: String,
    quota_reset: QuotaResetPolicy,
}

impl YouTubeStreamSource {
    /// Build a source with a 30s request timeout. Fails if the HTTP client
    /// cannot be constructed; a client without the timeout could stall a
    /// tick on a hung request.
    pub fn new(api_key: impl Into<String>, quota_reset: QuotaResetPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::config(format!("failed to build YouTube HTTP client: {e}")))?;
        Ok(Self::with_client(client, api_key, quota_reset))
    }

    pub fn with_client(
        client: Client,
        api_key: impl Into<String>,
        quota_reset: QuotaResetPolicy,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            quota_reset,
        }
    }

    /// GET an API resource with exponential-backoff retries for transient
    /// failures. Quota and fatal errors are returned immediately.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        operation: &str,
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.request_once(path, query).await {
                Ok(value) => return Ok(value),
                Err(e @ (Error::QuotaExceeded { .. } | Error::FatalSource(_))) => return Err(e),
                Err(e) => {
                    if attempt >= MAX_RETRIES {
                        return Err(Error::transient(format!(
                            "{operation} failed after {MAX_RETRIES} attempts: {e}"
                        )));
                    }
                    let wait = RETRY_BACKOFF_BASE_SECS.pow(attempt - 1);
                    warn!(
                        operation,
                        attempt,
                        max_retries = MAX_RETRIES,
                        wait_secs = wait,
                        error = %e,
                        "API request failed, retrying"
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(wait)).await;
                }
            }
        }
    }

    async fn request_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .client
            .get(format!("{API_BASE}/{path}"))
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| Error::transient(format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| Error::transient(format!("invalid response body: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::FORBIDDEN if is_quota_exceeded(&body) => Err(Error::QuotaExceeded {
                resets_at: self.quota_reset.next_reset(Utc::now()),
            }),
            StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => Err(
                Error::fatal(format!("YouTube API rejected the request: {status} - {body}")),
            ),
            _ => Err(Error::transient(format!(
                "YouTube API error: {status} - {body}"
            ))),
        }
    }
}

#[async_trait]
impl StreamSource for YouTubeStreamSource {
    async fn fetch_live_stream(&self, channel: &Channel) -> Result<Option<StreamObservation>> {
        let playlist_id = channel.id().uploads_playlist_id();

        let playlist: PlaylistItemsResponse = self
            .get_json(
                "playlistItems",
                &[
                    ("part", "contentDetails"),
                    ("playlistId", playlist_id.as_str()),
                    ("maxResults", MAX_RECENT_VIDEOS),
                ],
                "playlistItems.list",
            )
            .await?;

        if playlist.items.is_empty() {
            debug!(channel = %channel.id(), "No uploads found");
            return Ok(None);
        }

        let video_ids = playlist
            .items
            .iter()
            .map(|item| item.content_details.video_id.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let videos: VideoListResponse = self
            .get_json(
                "videos",
                &[
                    ("part", "snippet,liveStreamingDetails"),
                    ("id", video_ids.as_str()),
                ],
                "videos.list",
            )
            .await?;

        for video in videos.items {
            if video.snippet.live_broadcast_content != "live" {
                continue;
            }

            let Video {
                id,
                snippet,
                live_streaming_details,
            } = video;

            let started_at = live_streaming_details
                .and_then(|d| d.actual_start_time)
                .unwrap_or(snippet.published_at);
            let thumbnail_url = snippet.thumbnails.best_url().unwrap_or_default();

            info!(
                channel = %channel.id(),
                stream = %id,
                title = %snippet.title,
                "Live broadcast detected"
            );

            return Ok(Some(StreamObservation {
                stream_id: id,
                title: snippet.title,
                thumbnail_url,
                started_at,
            }));
        }

        debug!(channel = %channel.id(), "Not live");
        Ok(None)
    }
}

fn is_quota_exceeded(body: &str) -> bool {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|envelope| {
            envelope
                .error
                .errors
                .iter()
                .any(|detail| detail.reason == "quotaExceeded")
        })
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Video {
    id: String,
    snippet: VideoSnippet,
    live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: String,
    published_at: DateTime<Utc>,
    #[serde(default)]
    live_broadcast_content: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveStreamingDetails {
    actual_start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best_url(&self) -> Option<String> {
        [&self.high, &self.medium, &self.default]
            .into_iter()
            .flatten()
            .next()
            .map(|t| t.url.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: String,
}
