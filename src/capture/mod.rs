//! Keyboard event capture
//!
//! [`EventCapture`] turns raw key-down / key-up signals into finalized
//! [`KeyEvent`]s. A press is identified by its normalized key and physical
//! code; the down instant is remembered until the matching release arrives,
//! at which point the hold duration and the session-relative timestamp are
//! computed and the event is handed to the capture sink.
//!
//! # Boundary Conditions
//!
//! - Signals arriving while not capturing are ignored
//! - A release without a matching press (e.g. the key went down before
//!   capture started) is ignored
//! - Keys still held when capture stops are discarded; a half press has no
//!   duration
//! - With `capture_repeats` disabled, auto-repeat downs are ignored; the
//!   first non-repeat down still anchors the press
//!
//! None of these are errors. Signal handlers never fail.

pub mod normalize;
pub mod source;

pub use normalize::normalize_key;
pub use source::{SignalHandler, SignalHub, SignalSource};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::{round_to_precision, KeyEvent, KeyPhase, RawKeySignal, SubscriptionId};

/// Receiver of finalized key events
pub type CaptureSink = Arc<dyn Fn(KeyEvent) + Send + Sync>;

/// Pairing identity: (normalized key, physical code)
type KeyIdentity = (String, String);

struct CaptureState {
    capturing: bool,
    capture_repeats: bool,
    precision: u32,
    /// Host instant the recording session started at
    session_start: f64,
    /// Down instant of every key currently held
    pending: HashMap<KeyIdentity, f64>,
    sink: Option<CaptureSink>,
}

impl CaptureState {
    fn handle(&mut self, signal: &RawKeySignal) -> Option<(CaptureSink, KeyEvent)> {
        if !self.capturing {
            return None;
        }

        let code = signal.code.trim();
        if code.is_empty() || !signal.instant.is_finite() {
            tracing::trace!("Ignoring malformed signal {:?}", signal);
            return None;
        }

        let identity = (normalize_key(&signal.key, code), code.to_string());

        match signal.phase {
            KeyPhase::Down => {
                if signal.repeat && !self.capture_repeats {
                    return None;
                }
                self.pending.insert(identity, signal.instant);
                None
            }
            KeyPhase::Up => {
                let Some(down_instant) = self.pending.remove(&identity) else {
                    tracing::trace!("Ignoring release of {:?} without a press", identity.0);
                    return None;
                };

                let (key, code) = identity;
                let event = KeyEvent {
                    key,
                    code,
                    duration: round_to_precision(signal.instant - down_instant, self.precision),
                    timestamp: round_to_precision(down_instant - self.session_start, self.precision),
                };
                self.sink.clone().map(|sink| (sink, event))
            }
        }
    }
}

/// Pairs raw key signals into [`KeyEvent`]s
pub struct EventCapture {
    source: Arc<dyn SignalSource>,
    state: Arc<Mutex<CaptureState>>,
    subscription: Option<SubscriptionId>,
}

impl std::fmt::Debug for EventCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCapture")
            .field("capturing", &self.is_capturing())
            .field("pending", &self.pending_count())
            .field("subscription", &self.subscription)
            .finish()
    }
}

impl EventCapture {
    /// Create a capture bound to a signal source
    pub fn new(source: Arc<dyn SignalSource>, capture_repeats: bool, precision: u32) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(CaptureState {
                capturing: false,
                capture_repeats,
                precision,
                session_start: 0.0,
                pending: HashMap::new(),
                sink: None,
            })),
            subscription: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CaptureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Begin delivering finalized events to `sink`
    ///
    /// Timestamps are measured from `session_start`. Calling this while
    /// already capturing does nothing.
    pub fn start_capture(&mut self, sink: CaptureSink, session_start: f64) {
        {
            let mut state = self.lock();
            if state.capturing {
                return;
            }
            state.pending.clear();
            state.sink = Some(sink);
            state.session_start = session_start;
            state.capturing = true;
        }

        let state = Arc::clone(&self.state);
        let handler: SignalHandler = Box::new(move |signal| {
            let finalized = state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .handle(signal);
            // Deliver outside the lock so the sink may call back into capture
            if let Some((sink, event)) = finalized {
                tracing::trace!("Captured {:?} held {}ms", event.key, event.duration);
                sink(event);
            }
        });
        self.subscription = Some(self.source.subscribe(handler));
        tracing::debug!("Capture started at {}ms", session_start);
    }

    /// Stop capturing and discard keys still held
    pub fn stop_capture(&mut self) {
        {
            let mut state = self.lock();
            if !state.capturing {
                return;
            }
            state.capturing = false;
            if !state.pending.is_empty() {
                tracing::debug!("Discarding {} unreleased keys", state.pending.len());
            }
            state.pending.clear();
            state.sink = None;
        }

        if let Some(id) = self.subscription.take() {
            self.source.unsubscribe(id);
        }
        tracing::debug!("Capture stopped");
    }

    /// Check if capture is active
    pub fn is_capturing(&self) -> bool {
        self.lock().capturing
    }

    /// Number of keys currently held down
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }
}

impl Drop for EventCapture {
    fn drop(&mut self) {
        self.stop_capture();
    }
}
