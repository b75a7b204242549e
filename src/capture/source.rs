//! Host signal source
//!
//! The raw keyboard source lives outside this crate. [`SignalSource`] is the
//! seam the capture layer subscribes through; [`SignalHub`] is an in-process
//! implementation the host pushes signals into.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::{RawKeySignal, SubscriptionId};

/// Callback invoked for every raw signal while subscribed
pub type SignalHandler = Box<dyn Fn(&RawKeySignal) + Send + Sync>;

/// Producer of raw key-down / key-up notifications
#[cfg_attr(test, mockall::automock)]
pub trait SignalSource: Send + Sync {
    /// Start delivering signals to `handler`
    fn subscribe(&self, handler: SignalHandler) -> SubscriptionId;

    /// Stop delivering signals to the subscription
    fn unsubscribe(&self, id: SubscriptionId);
}

type SharedHandler = Arc<dyn Fn(&RawKeySignal) + Send + Sync>;

/// Broadcasts host signals to all current subscribers
#[derive(Default)]
pub struct SignalHub {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionId, SharedHandler)>>,
}

impl std::fmt::Debug for SignalHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalHub")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl SignalHub {
    /// Create a hub with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a signal to every subscriber
    ///
    /// Handlers run outside the internal lock, so they may subscribe or
    /// unsubscribe while being called.
    pub fn dispatch(&self, signal: &RawKeySignal) {
        let handlers: Vec<SharedHandler> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in handlers {
            handler(signal);
        }
    }

    /// Convenience for a key-down at `instant`
    pub fn key_down(&self, key: &str, code: &str, instant: f64) {
        self.dispatch(&RawKeySignal::down(key, code, instant));
    }

    /// Convenience for a key-up at `instant`
    pub fn key_up(&self, key: &str, code: &str, instant: f64) {
        self.dispatch(&RawKeySignal::up(key, code, instant));
    }

    /// Number of active subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl SignalSource for SignalHub {
    fn subscribe(&self, handler: SignalHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::from(handler)));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }
}
