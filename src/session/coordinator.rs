//! Session coordinator
//!
//! [`KeyboardHistory`] is the public entry point. It owns one event store,
//! one capture and one replay scheduler, and ties their lifecycles to the
//! recording session:
//!
//! - `start` / `stop` control capture; captured events land in the store
//! - `replay` replays either explicit events or the store's current contents
//! - every getter returns a copy

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::export::HistoryExport;
use super::types::RecordingSession;
use crate::capture::{CaptureSink, EventCapture, SignalSource};
use crate::clock::{MonotonicClock, SharedClock};
use crate::config::HistoryConfig;
use crate::error::Result;
use crate::replay::{EventSink, ReplayScheduler, ReplaySession};
use crate::store::EventStore;
use crate::types::KeyEvent;

/// Lifecycle fields of the recording session
#[derive(Debug, Default)]
struct RecordingState {
    is_recording: bool,
    start_time: Option<f64>,
}

/// Records keyboard activity and replays it
pub struct KeyboardHistory {
    config: HistoryConfig,
    clock: SharedClock,
    store: Arc<Mutex<EventStore>>,
    recording: RecordingState,
    capture: EventCapture,
    scheduler: ReplayScheduler,
}

impl std::fmt::Debug for KeyboardHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyboardHistory")
            .field("config", &self.config)
            .field("recording", &self.recording)
            .field("events", &self.get_event_count())
            .field("capture", &self.capture)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl KeyboardHistory {
    /// Create a coordinator using a monotonic clock started now
    pub fn new(
        config: HistoryConfig,
        source: Arc<dyn SignalSource>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self::with_clock(config, source, sink, Arc::new(MonotonicClock::new()))
    }

    /// Create a coordinator reading the host time from `clock`
    ///
    /// `clock` must share a time base with the instants carried by the
    /// source's signals.
    pub fn with_clock(
        config: HistoryConfig,
        source: Arc<dyn SignalSource>,
        sink: Arc<dyn EventSink>,
        clock: SharedClock,
    ) -> Self {
        let config = config.normalized();
        let capture = EventCapture::new(source, config.capture_repeats, config.timestamp_precision);
        let scheduler = ReplayScheduler::new(sink, Arc::clone(&clock), &config);

        Self {
            store: Arc::new(Mutex::new(EventStore::new(config.max_events))),
            recording: RecordingState::default(),
            capture,
            scheduler,
            clock,
            config,
        }
    }

    fn store(&self) -> MutexGuard<'_, EventStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Effective configuration
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Start a new recording, discarding previously recorded events
    ///
    /// Does nothing if already recording.
    pub fn start(&mut self) {
        if self.recording.is_recording {
            return;
        }

        self.store().clear();
        let start_time = self.clock.now_ms();

        let store = Arc::clone(&self.store);
        let sink: CaptureSink = Arc::new(move |event: KeyEvent| {
            let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = store.add_event(event) {
                tracing::debug!("Captured event not stored: {}", e);
            }
        });
        self.capture.start_capture(sink, start_time);

        self.recording = RecordingState {
            is_recording: true,
            start_time: Some(start_time),
        };
        tracing::info!("Recording started");
    }

    /// Stop recording; keys still held are discarded
    ///
    /// Does nothing if not recording.
    pub fn stop(&mut self) {
        if !self.recording.is_recording {
            return;
        }
        self.capture.stop_capture();
        self.recording.is_recording = false;
        tracing::info!("Recording stopped: {} events", self.get_event_count());
    }

    /// Check if recording
    pub fn is_recording(&self) -> bool {
        self.recording.is_recording
    }

    /// Stop everything and discard the recording
    pub fn clear(&mut self) {
        self.stop_replay();
        self.stop();
        self.store().clear();
        self.scheduler.set_stored_events(Vec::new());
        self.recording = RecordingState::default();
        tracing::debug!("History cleared");
    }

    /// Copy of the recording session
    pub fn get_session(&self) -> RecordingSession {
        RecordingSession {
            is_recording: self.recording.is_recording,
            start_time: self.recording.start_time,
            events: self.get_recorded_keys(),
        }
    }

    /// Copy of the recorded events, oldest first
    pub fn get_recorded_keys(&self) -> Vec<KeyEvent> {
        self.store().get_all_events()
    }

    /// Number of recorded events
    pub fn get_event_count(&self) -> usize {
        self.store().get_event_count()
    }

    /// Replay `events`, or the recorded events when `None`
    pub fn replay(&self, events: Option<Vec<KeyEvent>>) -> Result<()> {
        match events {
            Some(events) => self.scheduler.replay(Some(events)),
            None => {
                if !self.scheduler.is_replaying() {
                    self.scheduler.set_stored_events(self.get_recorded_keys());
                }
                self.scheduler.replay(None)
            }
        }
    }

    /// Replay untrusted JSON input; `null` replays the recorded events
    pub fn replay_value(&self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.replay(None),
            other => self.scheduler.replay_value(other),
        }
    }

    /// Cancel an active replay
    pub fn stop_replay(&self) {
        self.scheduler.stop_replay();
    }

    /// Check if a replay is active
    pub fn is_replaying(&self) -> bool {
        self.scheduler.is_replaying()
    }

    /// Copy of the replay session
    pub fn get_replay_session(&self) -> ReplaySession {
        self.scheduler.get_replay_session()
    }

    /// Wait until no replay is active
    pub async fn wait_until_idle(&self) {
        self.scheduler.wait_until_idle().await;
    }

    /// Channel replayed notifications are published on
    pub fn replay_channel(&self) -> &str {
        self.scheduler.channel()
    }

    /// Export the recorded events
    pub fn export(&self) -> HistoryExport {
        HistoryExport::new(self.get_recorded_keys(), self.recording.start_time)
    }

    /// Parse and validate events from an export document or bare array
    pub fn import_events(&self, json: &str) -> Result<Vec<KeyEvent>> {
        HistoryExport::events_from_json(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SignalHub;
    use crate::error::KeyHistoryError;
    use crate::replay::EventBus;

    fn history(config: HistoryConfig) -> (KeyboardHistory, Arc<SignalHub>, Arc<EventBus>) {
        let hub = Arc::new(SignalHub::new());
        let bus = Arc::new(EventBus::new());
        (KeyboardHistory::new(config, hub.clone(), bus.clone()), hub, bus)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_stop_are_idempotent() {
        let (mut history, hub, _bus) = history(HistoryConfig::default());

        history.stop();
        assert!(!history.is_recording());

        history.start();
        history.start();
        assert!(history.is_recording());
        assert_eq!(hub.subscriber_count(), 1);

        history.stop();
        history.stop();
        assert!(!history.is_recording());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_into_store() {
        let (mut history, hub, _bus) = history(HistoryConfig::default());
        tokio::time::advance(std::time::Duration::from_millis(1000)).await;
        history.start();
        let start = history.get_session().start_time.unwrap();

        hub.key_down("a", "KeyA", start + 100.0);
        hub.key_up("a", "KeyA", start + 150.0);
        history.stop();

        let keys = history.get_recorded_keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].timestamp, 100.0);
        assert_eq!(keys[0].duration, 50.0);

        let session = history.get_session();
        assert!(!session.is_recording);
        assert_eq!(session.events, keys);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timestamp_not_stored() {
        let (mut history, hub, _bus) = history(HistoryConfig::default());
        history.start();
        let start = history.get_session().start_time.unwrap();

        hub.key_down("a", "KeyA", start);
        hub.key_up("a", "KeyA", start + 10.0);

        assert_eq!(history.get_event_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_discards_previous_recording() {
        let (mut history, hub, _bus) = history(HistoryConfig::default());
        history.start();
        let start = history.get_session().start_time.unwrap();
        hub.key_down("a", "KeyA", start + 1.0);
        hub.key_up("a", "KeyA", start + 2.0);
        history.stop();
        assert_eq!(history.get_event_count(), 1);

        history.start();
        assert_eq!(history.get_event_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_recorded_events() {
        let (mut history, hub, bus) = history(HistoryConfig::default());
        let rx = bus.subscribe_channel(history.replay_channel().to_string());

        history.start();
        let start = history.get_session().start_time.unwrap();
        hub.key_down("a", "KeyA", start + 10.0);
        hub.key_up("a", "KeyA", start + 20.0);
        hub.key_down("b", "KeyB", start + 30.0);
        hub.key_up("b", "KeyB", start + 45.0);
        history.stop();

        history.replay(None).unwrap();
        assert!(history.is_replaying());
        history.wait_until_idle().await;

        let replayed: Vec<KeyEvent> = rx.try_iter().map(|n| n.to_event()).collect();
        assert_eq!(replayed, history.get_recorded_keys());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_explicit_events_and_exclusivity() {
        let (history, _hub, _bus) = history(HistoryConfig::default());
        let events = vec![KeyEvent::new("x", "KeyX", 5.0, 100.0)];

        history.replay(Some(events)).unwrap();
        assert!(matches!(
            history.replay(None),
            Err(KeyHistoryError::ReplayInProgress)
        ));

        history.stop_replay();
        history.stop_replay();
        assert!(!history.is_replaying());
        assert_eq!(history.get_replay_session(), ReplaySession::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_value_null_uses_recording() {
        let (history, _hub, _bus) = history(HistoryConfig::default());
        history.replay_value(&Value::Null).unwrap();
        assert!(!history.is_replaying());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_resets_everything() {
        let (mut history, hub, _bus) = history(HistoryConfig::default());
        history.start();
        let start = history.get_session().start_time.unwrap();
        hub.key_down("a", "KeyA", start + 1.0);
        hub.key_up("a", "KeyA", start + 2.0);
        history.replay(Some(vec![KeyEvent::new("x", "KeyX", 5.0, 100.0)])).unwrap();

        history.clear();
        assert!(!history.is_recording());
        assert!(!history.is_replaying());
        assert_eq!(history.get_session(), RecordingSession::default());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_and_import() {
        let (mut history, hub, _bus) = history(HistoryConfig::default());
        history.start();
        let start = history.get_session().start_time.unwrap();
        hub.key_down("a", "KeyA", start + 5.0);
        hub.key_up("a", "KeyA", start + 25.0);
        history.stop();

        let export = history.export();
        assert_eq!(export.metadata.total_events, 1);
        assert_eq!(export.metadata.session_start_time, Some(start));
        assert_eq!(export.metadata.recording_duration, 25.0);

        let json = export.to_json_pretty().unwrap();
        assert_eq!(history.import_events(&json).unwrap(), history.get_recorded_keys());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_from_config() {
        let (mut history, hub, _bus) = history(HistoryConfig::default().with_max_events(2));
        history.start();
        let start = history.get_session().start_time.unwrap();
        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            let code = format!("Key{}", key.to_uppercase());
            let t = start + 10.0 * (i as f64 + 1.0);
            hub.key_down(key, &code, t);
            hub.key_up(key, &code, t + 5.0);
        }

        let keys: Vec<String> = history.get_recorded_keys().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }
}
