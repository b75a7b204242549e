//! Replay notification delivery
//!
//! The scheduler publishes each replayed event on a named channel through
//! [`EventSink`]. [`EventBus`] is the in-process publish/subscribe
//! implementation: any number of observers per channel, delivered
//! synchronously in subscription order.

use crossbeam_channel::{unbounded, Receiver};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::{KeyEvent, SubscriptionId};

/// Payload of a replayed key event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayNotification {
    pub key: String,
    pub code: String,
    pub duration: f64,
    /// Timestamp of the source event
    pub timestamp: f64,
    /// Same as `timestamp`; kept for observers expecting the explicit name
    pub original_timestamp: f64,
    /// Host clock reading at emission
    pub replay_timestamp: f64,
}

impl ReplayNotification {
    /// Build the notification for `event` emitted at `replay_timestamp`
    pub fn from_event(event: &KeyEvent, replay_timestamp: f64) -> Self {
        Self {
            key: event.key.clone(),
            code: event.code.clone(),
            duration: event.duration,
            timestamp: event.timestamp,
            original_timestamp: event.timestamp,
            replay_timestamp,
        }
    }

    /// The replayed event without replay metadata
    pub fn to_event(&self) -> KeyEvent {
        KeyEvent::new(self.key.clone(), self.code.clone(), self.duration, self.original_timestamp)
    }
}

/// Destination of replay notifications
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    /// Deliver `notification` to every observer of `channel`
    fn publish(&self, channel: &str, notification: &ReplayNotification);
}

/// Observer callback
pub type Observer = Arc<dyn Fn(&ReplayNotification) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    channel: String,
    observer: Observer,
}

/// In-process broadcast bus keyed by channel name
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.lock().len())
            .finish()
    }
}

impl EventBus {
    /// Create a bus with no observers
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an observer on `channel`
    pub fn subscribe<F>(&self, channel: impl Into<String>, observer: F) -> SubscriptionId
    where
        F: Fn(&ReplayNotification) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push(Subscription {
            id,
            channel: channel.into(),
            observer: Arc::new(observer),
        });
        id
    }

    /// Register a channel-backed observer and return its receiving end
    ///
    /// The observer stays registered until unsubscribed; notifications sent
    /// after the receiver is dropped are discarded.
    pub fn subscribe_channel(&self, channel: impl Into<String>) -> Receiver<ReplayNotification> {
        let (tx, rx) = unbounded();
        self.subscribe(channel, move |notification| {
            let _ = tx.send(notification.clone());
        });
        rx
    }

    /// Remove an observer
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.lock().retain(|s| s.id != id);
    }

    /// Number of observers on `channel`
    pub fn observer_count(&self, channel: &str) -> usize {
        self.lock().iter().filter(|s| s.channel == channel).count()
    }
}

impl EventSink for EventBus {
    fn publish(&self, channel: &str, notification: &ReplayNotification) {
        // Snapshot so observers can (un)subscribe or stop a replay re-entrantly
        let observers: Vec<Observer> = self
            .lock()
            .iter()
            .filter(|s| s.channel == channel)
            .map(|s| Arc::clone(&s.observer))
            .collect();

        for observer in observers {
            observer(notification);
        }
    }
}
