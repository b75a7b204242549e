//! Core data types for keyhistory-rs
//!
//! This module contains the fundamental data structures used throughout the
//! crate:
//!
//! - [`KeyEvent`] - One completed key press with its hold duration
//! - [`RawKeySignal`] - A raw down/up notification from the host
//! - [`KeyPhase`] - Whether a raw signal is a press or a release
//!
//! # Time Values
//!
//! All time values are `f64` milliseconds. Captured events carry
//! session-relative timestamps (0 at the start of recording); events supplied
//! from outside for replay carry whatever timeline the caller chose.
//!
//! # Validation
//!
//! [`KeyEvent::validate`] enforces the invariants shared by every consumer.
//! The event store is stricter and additionally requires a positive
//! timestamp, see [`TimestampRule`].

use serde::{Deserialize, Serialize};

use crate::error::{KeyHistoryError, Result};

/// Default number of decimal places kept on captured time values
pub const DEFAULT_TIMESTAMP_PRECISION: u32 = 3;

/// A completed key press
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Normalized logical key identifier (e.g. `"a"`, `"Enter"`, `"Space"`)
    pub key: String,
    /// Physical key identifier (e.g. `"KeyA"`)
    pub code: String,
    /// How long the key was held, in milliseconds
    pub duration: f64,
    /// When the key went down, in milliseconds
    pub timestamp: f64,
}

/// Lower bound applied to [`KeyEvent::timestamp`] during validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampRule {
    /// Timestamp must be `>= 0` (replay input)
    NonNegative,
    /// Timestamp must be `> 0` (event store)
    Positive,
}

impl KeyEvent {
    /// Create a new key event
    pub fn new(key: impl Into<String>, code: impl Into<String>, duration: f64, timestamp: f64) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
            duration,
            timestamp,
        }
    }

    /// Time at which the key was released
    pub fn end_time(&self) -> f64 {
        self.timestamp + self.duration
    }

    /// Check the event invariants
    ///
    /// Returns a [`KeyHistoryError::Validation`] naming the first offending
    /// field. Call [`KeyHistoryError::at_index`] on the error to tag it with a
    /// sequence position.
    pub fn validate(&self, rule: TimestampRule) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(KeyHistoryError::validation(
                "key",
                "must be a non-empty string",
            ));
        }
        if self.code.trim().is_empty() {
            return Err(KeyHistoryError::validation(
                "code",
                "must be a non-empty string",
            ));
        }
        if !self.duration.is_finite() {
            return Err(KeyHistoryError::validation(
                "duration",
                format!("must be a finite number, got {}", self.duration),
            ));
        }
        if self.duration < 0.0 {
            return Err(KeyHistoryError::validation(
                "duration",
                format!("must be >= 0, got {}", self.duration),
            ));
        }
        if !self.timestamp.is_finite() {
            return Err(KeyHistoryError::validation(
                "timestamp",
                format!("must be a finite number, got {}", self.timestamp),
            ));
        }
        match rule {
            TimestampRule::NonNegative if self.timestamp < 0.0 => Err(KeyHistoryError::validation(
                "timestamp",
                format!("must be >= 0, got {}", self.timestamp),
            )),
            TimestampRule::Positive if self.timestamp <= 0.0 => Err(KeyHistoryError::validation(
                "timestamp",
                format!("must be > 0, got {}", self.timestamp),
            )),
            _ => Ok(()),
        }
    }
}

/// Whether a raw signal reports a press or a release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Down,
    Up,
}

/// A raw keyboard notification delivered by the host
#[derive(Debug, Clone, PartialEq)]
pub struct RawKeySignal {
    /// Press or release
    pub phase: KeyPhase,
    /// Logical label as reported by the host (may be empty or `"Unidentified"`)
    pub key: String,
    /// Physical code as reported by the host
    pub code: String,
    /// Auto-repeat flag
    pub repeat: bool,
    /// Host clock reading in milliseconds
    pub instant: f64,
}

impl RawKeySignal {
    /// Create a key-down signal
    pub fn down(key: impl Into<String>, code: impl Into<String>, instant: f64) -> Self {
        Self {
            phase: KeyPhase::Down,
            key: key.into(),
            code: code.into(),
            repeat: false,
            instant,
        }
    }

    /// Create a key-up signal
    pub fn up(key: impl Into<String>, code: impl Into<String>, instant: f64) -> Self {
        Self {
            phase: KeyPhase::Up,
            key: key.into(),
            code: code.into(),
            repeat: false,
            instant,
        }
    }

    /// Mark this signal as an auto-repeat
    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }
}

/// Handle returned by subscriptions to a signal source or event bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Round `value` to `precision` decimal places, half away from zero
pub fn round_to_precision(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (value * scale).round() / scale
}
