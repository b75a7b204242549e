//! Harness construction helpers

use std::sync::Arc;

use crossbeam_channel::Receiver;
use keyhistory_rs::{
    EventBus, HistoryConfig, KeyboardHistory, RawKeySignal, ReplayNotification, SignalHub,
};

/// A coordinator wired to an in-process signal hub and event bus
pub struct Harness {
    pub history: KeyboardHistory,
    pub hub: Arc<SignalHub>,
    pub bus: Arc<EventBus>,
    pub replayed: Receiver<ReplayNotification>,
}

impl Harness {
    pub fn new(config: HistoryConfig) -> Self {
        let hub = Arc::new(SignalHub::new());
        let bus = Arc::new(EventBus::new());
        let history = KeyboardHistory::new(config, hub.clone(), bus.clone());
        let replayed = bus.subscribe_channel(history.replay_channel().to_string());
        Self {
            history,
            hub,
            bus,
            replayed,
        }
    }

    /// Host time the current recording started at
    pub fn start_time(&self) -> f64 {
        self.history
            .get_session()
            .start_time
            .expect("recording was never started")
    }

    /// Press and release a key, both offsets relative to the recording start
    pub fn tap(&self, key: &str, code: &str, down_at: f64, up_at: f64) {
        let start = self.start_time();
        self.hub.key_down(key, code, start + down_at);
        self.hub.key_up(key, code, start + up_at);
    }

    /// Deliver a raw signal with an offset relative to the recording start
    pub fn send(&self, mut signal: RawKeySignal) {
        signal.instant += self.start_time();
        self.hub.dispatch(&signal);
    }

    /// Drain all notifications delivered so far
    pub fn drain(&self) -> Vec<ReplayNotification> {
        self.replayed.try_iter().collect()
    }
}
