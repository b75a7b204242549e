//! Replay input validation
//!
//! Replay input may come from storage or another process, so it is checked
//! element by element before anything is scheduled. The first invalid
//! element aborts the whole call with an error naming its index, the field,
//! and what was expected versus found.

use serde_json::{Map, Value};

use crate::error::{KeyHistoryError, Result};
use crate::types::{KeyEvent, TimestampRule};

/// JSON kind name used in error messages
fn kind(value: Option<&Value>) -> &'static str {
    match value {
        None => "missing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

fn string_field(object: &Map<String, Value>, field: &'static str) -> Result<String> {
    match object.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(KeyHistoryError::validation(
            field,
            "must be a non-empty string",
        )),
        other => Err(KeyHistoryError::validation(
            field,
            format!("expected string, got {}", kind(other)),
        )),
    }
}

fn number_field(object: &Map<String, Value>, field: &'static str) -> Result<f64> {
    let value = match object.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    };
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return Err(KeyHistoryError::validation(
            field,
            format!("expected finite number, got {}", kind(object.get(field))),
        ));
    };
    if value < 0.0 {
        return Err(KeyHistoryError::validation(
            field,
            format!("must be >= 0, got {}", value),
        ));
    }
    Ok(value)
}

/// Parse one untrusted element into a [`KeyEvent`]
pub fn event_from_value(value: &Value) -> Result<KeyEvent> {
    let Value::Object(object) = value else {
        return Err(KeyHistoryError::validation(
            "event",
            format!("expected object, got {}", kind(Some(value))),
        ));
    };

    Ok(KeyEvent {
        key: string_field(object, "key")?,
        code: string_field(object, "code")?,
        duration: number_field(object, "duration")?,
        timestamp: number_field(object, "timestamp")?,
    })
}

/// Parse an untrusted JSON array into replayable events
pub fn events_from_value(value: &Value) -> Result<Vec<KeyEvent>> {
    let Value::Array(items) = value else {
        return Err(KeyHistoryError::InvalidInput(format!(
            "expected an array of events, got {}",
            kind(Some(value))
        )));
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| event_from_value(item).map_err(|e| e.at_index(index)))
        .collect()
}

/// Check every event of a typed sequence against the replay rules
pub fn validate_sequence(events: &[KeyEvent]) -> Result<()> {
    for (index, event) in events.iter().enumerate() {
        event
            .validate(TimestampRule::NonNegative)
            .map_err(|e| e.at_index(index))?;
    }
    Ok(())
}
