//! End-to-end monitor loop behavior against in-memory fakes: the
//! start/continue/end lifecycle, at-least-once notification delivery,
//! per-channel error isolation and quota suspension.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use livewatch::domain::{Channel, ChannelId, ChannelState, StreamObservation, WebhookTarget};
use livewatch::monitor::{MonitorConfig, MonitorService};
use livewatch::notification::{NotificationFanout, StreamStartMessage, WebhookSender};
use livewatch::source::StreamSource;
use livewatch::state::StateStore;
use livewatch::{Error, Result};

const CHANNEL_1: &str = "UCxxxxxxxxxxxxxxxx111111";
const CHANNEL_2: &str = "UCxxxxxxxxxxxxxxxx222222";
const WEBHOOK_A: &str = "https://discord.com/api/webhooks/111/aaa";
const WEBHOOK_B: &str = "https://discord.com/api/webhooks/222/bbb";

/// Source that replays a scripted queue of results per channel.
struct ScriptedSource {
    responses: Mutex<HashMap<String, VecDeque<Result<Option<StreamObservation>>>>>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    fn script(&self, channel_id: &str, result: Result<Option<StreamObservation>>) {
        self.responses
            .lock()
            .unwrap()
            .entry(channel_id.to_string())
            .or_default()
            .push_back(result);
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamSource for ScriptedSource {
    async fn fetch_live_stream(&self, channel: &Channel) -> Result<Option<StreamObservation>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .get_mut(channel.id().as_str())
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Ok(None))
    }
}

/// In-memory state store.
#[derive(Default)]
struct InMemoryStore {
    states: Mutex<HashMap<String, ChannelState>>,
}

impl InMemoryStore {
    fn state(&self, channel_id: &str) -> Option<ChannelState> {
        self.states.lock().unwrap().get(channel_id).cloned()
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn get(&self, channel_id: &ChannelId) -> Result<Option<ChannelState>> {
        Ok(self.states.lock().unwrap().get(channel_id.as_str()).cloned())
    }

    async fn put(&self, channel_id: &ChannelId, state: ChannelState) -> Result<()> {
        self.states
            .lock()
            .unwrap()
            .insert(channel_id.as_str().to_string(), state);
        Ok(())
    }
}

/// Sender whose failure set can be flipped between ticks.
struct FlakySender {
    failing: Mutex<bool>,
    deliveries: Mutex<Vec<String>>,
}

impl FlakySender {
    fn new(failing: bool) -> Self {
        Self {
            failing: Mutex::new(failing),
            deliveries: Mutex::new(Vec::new()),
        }
    }

    fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    fn delivery_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

#[async_trait]
impl WebhookSender for FlakySender {
    async fn deliver(&self, target: &WebhookTarget, _message: &StreamStartMessage) -> Result<()> {
        if *self.failing.lock().unwrap() {
            return Err(Error::WebhookDelivery("503 - unavailable".to_string()));
        }
        self.deliveries
            .lock()
            .unwrap()
            .push(target.url().to_string());
        Ok(())
    }
}

fn channel(id: &str, name: &str) -> Channel {
    Channel::new(
        ChannelId::parse(id).unwrap(),
        name,
        vec![
            WebhookTarget::new(WEBHOOK_A, "@everyone").unwrap(),
            WebhookTarget::new(WEBHOOK_B, "").unwrap(),
        ],
    )
    .unwrap()
}

fn observation(stream_id: &str) -> StreamObservation {
    StreamObservation {
        stream_id: stream_id.to_string(),
        title: "Test Stream".to_string(),
        thumbnail_url: "https://i.ytimg.com/vi/x/hqdefault.jpg".to_string(),
        started_at: Utc::now(),
    }
}

struct Harness {
    source: Arc<ScriptedSource>,
    store: Arc<InMemoryStore>,
    sender: Arc<FlakySender>,
    service: MonitorService<ScriptedSource, InMemoryStore>,
}

fn harness(channels: Vec<Channel>, sender_failing: bool) -> Harness {
    let source = Arc::new(ScriptedSource::new());
    let store = Arc::new(InMemoryStore::default());
    let sender = Arc::new(FlakySender::new(sender_failing));
    let fanout = NotificationFanout::new(sender.clone(), 0xFF0000);
    let service = MonitorService::new(
        source.clone(),
        store.clone(),
        fanout,
        channels,
        MonitorConfig {
            check_interval_secs: 300,
            retry_delay: Duration::from_secs(1),
            timezone: chrono_tz::Asia::Tokyo,
        },
        CancellationToken::new(),
    );
    Harness {
        source,
        store,
        sender,
        service,
    }
}

#[tokio::test]
async fn test_stream_lifecycle_start_continue_end() {
    let h = harness(vec![channel(CHANNEL_1, "Streamer A")], false);
    h.source.script(CHANNEL_1, Ok(Some(observation("v1"))));
    h.source.script(CHANNEL_1, Ok(Some(observation("v1"))));
    h.source.script(CHANNEL_1, Ok(None));

    // Tick 1: no previous state, live -> notify and persist Live.
    h.service.tick().await.unwrap();
    let state = h.store.state(CHANNEL_1).unwrap();
    assert!(state.is_live);
    assert_eq!(state.stream_id.as_deref(), Some("v1"));
    assert!(state.last_notified_at.is_some());
    assert_eq!(h.sender.delivery_count(), 2); // both targets

    let notified_at = state.last_notified_at;
    let checked_at = state.last_checked_at;

    // Tick 2: same stream -> no new notification, check time refreshed,
    // notification time untouched.
    h.service.tick().await.unwrap();
    let state = h.store.state(CHANNEL_1).unwrap();
    assert!(state.is_live);
    assert_eq!(state.last_notified_at, notified_at);
    assert!(state.last_checked_at >= checked_at);
    assert_eq!(h.sender.delivery_count(), 2);

    // Tick 3: offline -> persisted as ended, notification time preserved.
    h.service.tick().await.unwrap();
    let state = h.store.state(CHANNEL_1).unwrap();
    assert!(!state.is_live);
    assert!(state.stream_id.is_none());
    assert_eq!(state.last_notified_at, notified_at);
    assert_eq!(h.sender.delivery_count(), 2);
}

#[tokio::test]
async fn test_continuing_tick_never_renotifies() {
    let h = harness(vec![channel(CHANNEL_1, "Streamer A")], false);
    for _ in 0..5 {
        h.source.script(CHANNEL_1, Ok(Some(observation("v1"))));
    }

    for _ in 0..5 {
        h.service.tick().await.unwrap();
    }

    // Only the first tick notified.
    assert_eq!(h.sender.delivery_count(), 2);
}

#[tokio::test]
async fn test_stream_id_change_renotifies() {
    let h = harness(vec![channel(CHANNEL_1, "Streamer A")], false);
    h.source.script(CHANNEL_1, Ok(Some(observation("v1"))));
    h.source.script(CHANNEL_1, Ok(Some(observation("v2"))));

    h.service.tick().await.unwrap();
    h.service.tick().await.unwrap();

    // Back-to-back streams without an offline poll: two notifications.
    assert_eq!(h.sender.delivery_count(), 4);
    let state = h.store.state(CHANNEL_1).unwrap();
    assert_eq!(state.stream_id.as_deref(), Some("v2"));
}

#[tokio::test]
async fn test_failed_notification_leaves_state_untouched_and_retries() {
    let h = harness(vec![channel(CHANNEL_1, "Streamer A")], true);
    h.source.script(CHANNEL_1, Ok(Some(observation("v1"))));
    h.source.script(CHANNEL_1, Ok(Some(observation("v1"))));

    // Tick 1: every target fails, the error stays channel-local and no
    // state is written.
    h.service.tick().await.unwrap();
    assert!(h.store.state(CHANNEL_1).is_none());
    assert_eq!(h.sender.delivery_count(), 0);

    // Tick 2: targets recover; the same stream is re-detected as started
    // and the notification goes out (at-least-once).
    h.sender.set_failing(false);
    h.service.tick().await.unwrap();
    let state = h.store.state(CHANNEL_1).unwrap();
    assert!(state.is_live);
    assert!(state.last_notified_at.is_some());
    assert_eq!(h.sender.delivery_count(), 2);
}

#[tokio::test]
async fn test_channel_errors_are_isolated() {
    let h = harness(
        vec![channel(CHANNEL_1, "Broken"), channel(CHANNEL_2, "Healthy")],
        false,
    );
    h.source
        .script(CHANNEL_1, Err(Error::transient("connection reset")));
    h.source.script(CHANNEL_2, Ok(Some(observation("v9"))));

    // The batch succeeds despite the first channel failing.
    h.service.tick().await.unwrap();

    assert!(h.store.state(CHANNEL_1).is_none());
    let state = h.store.state(CHANNEL_2).unwrap();
    assert!(state.is_live);
    assert_eq!(state.stream_id.as_deref(), Some("v9"));
}

#[tokio::test]
async fn test_quota_exhaustion_aborts_the_batch() {
    let h = harness(
        vec![channel(CHANNEL_1, "First"), channel(CHANNEL_2, "Second")],
        false,
    );
    h.source.script(
        CHANNEL_1,
        Err(Error::QuotaExceeded {
            resets_at: Utc::now() + chrono::Duration::hours(3),
        }),
    );
    h.source.script(CHANNEL_2, Ok(Some(observation("v1"))));

    let err = h.service.tick().await.unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded { .. }));

    // The second channel was never fetched.
    assert_eq!(h.source.fetch_count(), 1);
    assert!(h.store.state(CHANNEL_2).is_none());
}

#[tokio::test]
async fn test_first_offline_poll_persists_offline_state() {
    let h = harness(vec![channel(CHANNEL_1, "Streamer A")], false);
    h.source.script(CHANNEL_1, Ok(None));

    h.service.tick().await.unwrap();

    let state = h.store.state(CHANNEL_1).unwrap();
    assert!(!state.is_live);
    assert!(state.last_notified_at.is_none());
}

#[tokio::test]
async fn test_persisted_live_state_suppresses_restart_renotification() {
    // A restart that kept its state file must not re-notify for a stream
    // it already announced.
    let h = harness(vec![channel(CHANNEL_1, "Streamer A")], false);
    let notified = Utc::now() - chrono::Duration::minutes(30);
    h.store
        .put(
            &ChannelId::parse(CHANNEL_1).unwrap(),
            ChannelState::live("v1", notified, Some(notified)),
        )
        .await
        .unwrap();
    h.source.script(CHANNEL_1, Ok(Some(observation("v1"))));

    h.service.tick().await.unwrap();

    assert_eq!(h.sender.delivery_count(), 0);
    let state = h.store.state(CHANNEL_1).unwrap();
    assert_eq!(state.last_notified_at, Some(notified));
}
