//! Session data types

use serde::{Deserialize, Serialize};

use crate::types::KeyEvent;

/// State of the recording session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    /// Whether capture is active
    pub is_recording: bool,
    /// Host time recording started at (ms)
    pub start_time: Option<f64>,
    /// Recorded events, oldest first
    pub events: Vec<KeyEvent>,
}

impl RecordingSession {
    /// Check if the session holds any events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of recorded events
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Span from the session start to the last key release (ms)
    pub fn duration(&self) -> f64 {
        recording_duration(&self.events)
    }
}

/// Latest release time over `events`, 0 when empty
pub fn recording_duration(events: &[KeyEvent]) -> f64 {
    events
        .iter()
        .map(KeyEvent::end_time)
        .fold(0.0, f64::max)
}
