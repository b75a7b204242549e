//! Timed replay scheduler
//!
//! Re-emits a sequence of [`KeyEvent`]s with their original relative timing.
//! Each emission is a one-shot tokio timer; the handle of every outstanding
//! timer is kept in the session's pending set so [`ReplayScheduler::stop_replay`]
//! can cancel them all at once. When a timer fires it emits its event and then
//! schedules the next one, so at most one timer is pending at a time.
//!
//! # States
//!
//! ```text
//! Idle --replay(non-empty, valid)--> Active --(last event | stop_replay)--> Idle
//! ```
//!
//! `replay` while active fails with [`KeyHistoryError::ReplayInProgress`] and
//! leaves the running replay untouched.
//!
//! # Timing
//!
//! The first event is emitted `timestamp[0]` ms after `replay` is called. For
//! later events see [`ReplayTiming`]. All delays are divided by the configured
//! replay speed.
//!
//! # Re-entrancy
//!
//! The state lock is never held while observers run; an observer may call
//! `stop_replay` (or start a new replay) from inside its callback.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use super::sink::{EventSink, ReplayNotification};
use super::validate::{events_from_value, validate_sequence};
use crate::clock::SharedClock;
use crate::config::{HistoryConfig, ReplayTiming};
use crate::error::{KeyHistoryError, Result};
use crate::types::KeyEvent;

/// Identifier of a scheduled emission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Snapshot of the replay session
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplaySession {
    /// Whether a replay is active
    pub is_replaying: bool,
    /// Index of the next event to emit
    pub current_index: usize,
    /// Host time the replay started at (ms)
    pub start_time: Option<f64>,
    /// Timers scheduled but not yet fired
    pub pending_timers: Vec<TimerId>,
}

#[derive(Default)]
struct ReplayState {
    is_replaying: bool,
    current_index: usize,
    start_time: Option<f64>,
    /// Reference point for drift correction
    started_at: Option<Instant>,
    pending: HashMap<TimerId, AbortHandle>,
    /// Sequence being replayed
    events: Arc<Vec<KeyEvent>>,
    /// Default sequence for `replay(None)`
    stored: Vec<KeyEvent>,
    runtime: Option<Handle>,
    /// Bumped on every start and stop; stale timers compare against it
    generation: u64,
    next_timer: u64,
}

impl ReplayState {
    fn reset(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
        self.is_replaying = false;
        self.current_index = 0;
        self.start_time = None;
        self.started_at = None;
        self.events = Arc::default();
        self.runtime = None;
    }
}

struct Inner {
    state: Mutex<ReplayState>,
    sink: Arc<dyn EventSink>,
    clock: SharedClock,
    channel: String,
    timing: ReplayTiming,
    speed: f64,
    replaying: watch::Sender<bool>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ReplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delay before emitting `events[index]`
    fn delay_for(&self, state: &ReplayState, index: usize) -> Duration {
        let events = &state.events;
        let delay_ms = match (index, self.timing) {
            (0, _) => events[0].timestamp / self.speed,
            (_, ReplayTiming::PerGap) => {
                (events[index].timestamp - events[index - 1].timestamp) / self.speed
            }
            (_, ReplayTiming::DriftCorrecting) => {
                let elapsed_ms = state
                    .started_at
                    .map(|t| t.elapsed().as_secs_f64() * 1000.0)
                    .unwrap_or(0.0);
                events[index].timestamp / self.speed - elapsed_ms
            }
        };
        Duration::try_from_secs_f64(delay_ms.max(0.0) / 1000.0).unwrap_or(Duration::MAX)
    }

    /// Schedule the emission of `events[index]`, or finish if none is left
    fn schedule_step(self: &Arc<Self>, state: &mut ReplayState, index: usize) {
        if !state.is_replaying {
            return;
        }
        if index >= state.events.len() {
            tracing::info!("Replay completed: {} events", state.events.len());
            state.reset();
            self.replaying.send_replace(false);
            return;
        }
        let Some(runtime) = state.runtime.clone() else {
            state.reset();
            self.replaying.send_replace(false);
            return;
        };

        let delay = self.delay_for(state, index);
        let timer = TimerId(state.next_timer);
        state.next_timer += 1;
        let generation = state.generation;

        let inner = Arc::clone(self);
        // The lock is held until the handle is registered, so the timer can
        // never observe the pending set without itself in it
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            inner.fire(generation, timer, index);
        });
        state.pending.insert(timer, handle.abort_handle());
        tracing::trace!("Scheduled event {} in {:?}", index, delay);
    }

    fn fire(self: &Arc<Self>, generation: u64, timer: TimerId, index: usize) {
        let event = {
            let mut state = self.lock();
            state.pending.remove(&timer);
            if !state.is_replaying || state.generation != generation {
                return;
            }
            state.current_index = index + 1;
            state.events[index].clone()
        };

        let notification = ReplayNotification::from_event(&event, self.clock.now_ms());
        tracing::trace!("Replaying event {}: {:?}", index, notification.key);
        self.sink.publish(&self.channel, &notification);

        let mut state = self.lock();
        // An observer may have stopped this replay or started another one
        if state.generation != generation {
            return;
        }
        self.schedule_step(&mut state, index + 1);
    }
}

/// Replays key events on a named channel with their original timing
pub struct ReplayScheduler {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ReplayScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayScheduler")
            .field("channel", &self.inner.channel)
            .field("timing", &self.inner.timing)
            .field("speed", &self.inner.speed)
            .field("session", &self.get_replay_session())
            .finish()
    }
}

impl ReplayScheduler {
    /// Create a scheduler publishing to `sink`
    pub fn new(sink: Arc<dyn EventSink>, clock: SharedClock, config: &HistoryConfig) -> Self {
        let config = config.clone().normalized();
        let (replaying, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ReplayState::default()),
                sink,
                clock,
                channel: config.replay_event_name,
                timing: config.replay_timing,
                speed: config.replay_speed,
                replaying,
            }),
        }
    }

    /// Channel notifications are published on
    pub fn channel(&self) -> &str {
        &self.inner.channel
    }

    /// Replace the sequence used by `replay(None)`
    ///
    /// The sequence is validated when it is replayed, not here.
    pub fn set_stored_events(&self, events: Vec<KeyEvent>) {
        self.inner.lock().stored = events;
    }

    /// Start replaying `events`, or the stored sequence when `None`
    ///
    /// The whole sequence is validated before anything is scheduled. An empty
    /// sequence does nothing. Must be called from within a tokio runtime.
    pub fn replay(&self, events: Option<Vec<KeyEvent>>) -> Result<()> {
        let mut state = self.inner.lock();
        if state.is_replaying {
            return Err(KeyHistoryError::ReplayInProgress);
        }

        let events = match events {
            Some(events) => events,
            None => state.stored.clone(),
        };
        validate_sequence(&events)?;
        if events.is_empty() {
            tracing::debug!("Nothing to replay");
            return Ok(());
        }

        let runtime = Handle::try_current()
            .map_err(|e| KeyHistoryError::Runtime(format!("Replay needs a tokio runtime: {}", e)))?;

        state.generation += 1;
        state.is_replaying = true;
        state.current_index = 0;
        state.start_time = Some(self.inner.clock.now_ms());
        state.started_at = Some(Instant::now());
        state.pending.clear();
        state.events = Arc::new(events);
        state.runtime = Some(runtime);
        self.inner.replaying.send_replace(true);

        tracing::info!(
            "Replay started: {} events, {} timing",
            state.events.len(),
            self.inner.timing.display_name()
        );
        self.inner.schedule_step(&mut state, 0);
        Ok(())
    }

    /// Replay untrusted JSON input
    ///
    /// `null` replays the stored sequence; anything other than an array of
    /// event objects is rejected.
    pub fn replay_value(&self, value: &Value) -> Result<()> {
        if self.is_replaying() {
            return Err(KeyHistoryError::ReplayInProgress);
        }
        match value {
            Value::Null => self.replay(None),
            other => self.replay(Some(events_from_value(other)?)),
        }
    }

    /// Cancel every pending emission and return to idle
    pub fn stop_replay(&self) {
        let mut state = self.inner.lock();
        if !state.is_replaying {
            return;
        }
        let stopped_at = state.current_index;
        state.generation += 1;
        state.reset();
        self.inner.replaying.send_replace(false);
        tracing::info!("Replay stopped at event {}", stopped_at);
    }

    /// Check if a replay is active
    pub fn is_replaying(&self) -> bool {
        self.inner.lock().is_replaying
    }

    /// Copy of the current replay session
    pub fn get_replay_session(&self) -> ReplaySession {
        let state = self.inner.lock();
        let mut pending_timers: Vec<TimerId> = state.pending.keys().copied().collect();
        pending_timers.sort();
        ReplaySession {
            is_replaying: state.is_replaying,
            current_index: state.current_index,
            start_time: state.start_time,
            pending_timers,
        }
    }

    /// Wait until no replay is active
    pub async fn wait_until_idle(&self) {
        let mut rx = self.inner.replaying.subscribe();
        let _ = rx.wait_for(|replaying| !*replaying).await;
    }
}

impl Drop for ReplayScheduler {
    fn drop(&mut self) {
        self.stop_replay();
    }
}
