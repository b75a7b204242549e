//! Export format for recorded key histories
//!
//! ```json
//! {
//!   "metadata": {
//!     "exportTime": "2026-01-01T12:00:00Z",
//!     "totalEvents": 2,
//!     "sessionStartTime": 1532.4,
//!     "recordingDuration": 640.5
//!   },
//!   "events": [{ "key": "a", "code": "KeyA", "duration": 80.5, "timestamp": 120.0 }]
//! }
//! ```
//!
//! Loading validates every event the same way replay input is validated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use super::types::recording_duration;
use crate::error::{KeyHistoryError, Result, ResultExt};
use crate::replay::events_from_value;
use crate::types::KeyEvent;

/// Summary written alongside exported events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    /// When the export was produced
    pub export_time: DateTime<Utc>,
    /// Number of exported events
    pub total_events: usize,
    /// Host time recording started at (ms)
    pub session_start_time: Option<f64>,
    /// Latest key release relative to the session start (ms)
    pub recording_duration: f64,
}

/// A serialized key history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryExport {
    pub metadata: ExportMetadata,
    pub events: Vec<KeyEvent>,
}

impl HistoryExport {
    /// Build an export from recorded events
    pub fn new(events: Vec<KeyEvent>, session_start_time: Option<f64>) -> Self {
        Self {
            metadata: ExportMetadata {
                export_time: Utc::now(),
                total_events: events.len(),
                session_start_time,
                recording_duration: recording_duration(&events),
            },
            events,
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an export, validating every event
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Build an export from an already parsed JSON document
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(object) = value else {
            return Err(KeyHistoryError::InvalidInput(
                "expected an export object with metadata and events".to_string(),
            ));
        };

        let events = events_from_value(object.get("events").unwrap_or(&Value::Null))?;
        let metadata = match object.get("metadata") {
            Some(metadata) => serde_json::from_value::<ExportMetadata>(metadata.clone())
                .map_err(KeyHistoryError::from)
                .context("Invalid export metadata")?,
            None => HistoryExport::new(events.clone(), None).metadata,
        };

        if metadata.total_events != events.len() {
            tracing::warn!(
                "Export metadata lists {} events but {} were found",
                metadata.total_events,
                events.len()
            );
        }

        Ok(Self { metadata, events })
    }

    /// Parse either a full export or a bare event array
    pub fn events_from_json(json: &str) -> Result<Vec<KeyEvent>> {
        let value: Value = serde_json::from_str(json)?;
        match value {
            Value::Array(_) => events_from_value(&value),
            other => Self::from_value(&other).map(|export| export.events),
        }
    }

    /// Save the export to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json)
            .map_err(KeyHistoryError::from)
            .with_context(|| format!("Failed to write export {:?}", path))
    }

    /// Load an export from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(KeyHistoryError::from)
            .with_context(|| format!("Failed to read export {:?}", path))?;
        Self::from_json(&json)
    }
}
