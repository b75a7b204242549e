//! Bounded event store
//!
//! Holds the finalized [`KeyEvent`]s of the active recording in a ring
//! buffer. Inserts are validated; when the buffer is over capacity the oldest
//! events are evicted first. Readers always receive copies.

use std::collections::VecDeque;

use crate::error::Result;
use crate::types::{KeyEvent, TimestampRule};

/// Bounded, insertion-ordered buffer of key events
#[derive(Debug, Clone)]
pub struct EventStore {
    /// Ring buffer of events, oldest at the front
    events: VecDeque<KeyEvent>,
    /// Maximum number of retained events
    max_events: usize,
}

impl EventStore {
    /// Create an empty store with the given capacity
    pub fn new(max_events: usize) -> Self {
        Self {
            // Avoid reserving the full default capacity up front
            events: VecDeque::with_capacity(max_events.min(1024)),
            max_events,
        }
    }

    /// Maximum number of retained events
    pub fn capacity(&self) -> usize {
        self.max_events
    }

    /// Validate and append an event, evicting the oldest on overflow
    pub fn add_event(&mut self, event: KeyEvent) -> Result<()> {
        event.validate(TimestampRule::Positive)?;

        self.events.push_back(event);
        while self.events.len() > self.max_events {
            if let Some(evicted) = self.events.pop_front() {
                tracing::trace!("Evicted event {:?} at {}ms", evicted.key, evicted.timestamp);
            }
        }
        Ok(())
    }

    /// Copy of all events, oldest first
    pub fn get_all_events(&self) -> Vec<KeyEvent> {
        self.events.iter().cloned().collect()
    }

    /// Remove all events
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Number of retained events
    pub fn get_event_count(&self) -> usize {
        self.events.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
