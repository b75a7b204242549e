//! Configuration module for keyhistory-rs
//!
//! [`HistoryConfig`] is supplied once when a
//! [`KeyboardHistory`](crate::session::KeyboardHistory) is constructed and
//! never changes afterwards. Every field is optional in serialized form and
//! defaulting happens once, at construction or deserialization.
//!
//! # Config File Location
//!
//! The library itself never reads files. The command line tool looks for a
//! TOML file in the platform-appropriate config directory:
//!
//! - **Linux**: `~/.config/keyhistory-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/keyhistory-rs/config.toml`
//! - **Windows**: `%APPDATA%\keyhistory-rs\config.toml`
//!
//! # Example
//!
//! ```toml
//! max_events = 500
//! capture_repeats = false
//! timestamp_precision = 1
//! replay_event_name = "keyReplay"
//! replay_timing = "per-gap"
//! replay_speed = 2.0
//! ```

use crate::error::{KeyHistoryError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "keyhistory-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default event store capacity
pub const DEFAULT_MAX_EVENTS: usize = 10_000;

/// Default channel name for replayed notifications
pub const DEFAULT_REPLAY_EVENT_NAME: &str = "keyboardHistoryReplay";

/// Slowest allowed replay speed multiplier
pub const MIN_REPLAY_SPEED: f64 = 0.1;

/// Fastest allowed replay speed multiplier
pub const MAX_REPLAY_SPEED: f64 = 10.0;

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// How the replay scheduler derives the delay before each emission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplayTiming {
    /// Wait the gap to the previous event; timer overhead accumulates
    PerGap,
    /// Aim every emission at `replay start + timestamp`, absorbing jitter
    ///
    /// The first delay is `timestamp[0]` and each later delay is
    /// `max(0, timestamp[i] - elapsed)` with `elapsed` measured from the
    /// replay start. The anchor is the replay start, not `timestamp[0]`:
    /// subtracting `timestamp[0]` after already waiting it would fire every
    /// later event early whenever `timestamp[1] - timestamp[0] < timestamp[0]`.
    /// Delays are divided by the replay speed.
    #[default]
    DriftCorrecting,
}

impl ReplayTiming {
    /// Display name for the mode
    pub fn display_name(&self) -> &'static str {
        match self {
            ReplayTiming::PerGap => "Per-gap",
            ReplayTiming::DriftCorrecting => "Drift-correcting",
        }
    }
}

/// Construction-time configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Event store capacity; 0 keeps nothing
    #[serde(default = "default_max_events")]
    pub max_events: usize,

    /// Whether auto-repeat key-downs refresh the press anchor
    #[serde(default = "default_true")]
    pub capture_repeats: bool,

    /// Decimal places kept on captured durations and timestamps
    #[serde(default = "default_timestamp_precision")]
    pub timestamp_precision: u32,

    /// Channel replayed notifications are published on
    #[serde(default = "default_replay_event_name")]
    pub replay_event_name: String,

    /// Delay computation used by the replay scheduler
    #[serde(default)]
    pub replay_timing: ReplayTiming,

    /// Replay speed multiplier (1.0 = original timing)
    #[serde(default = "default_replay_speed")]
    pub replay_speed: f64,
}

fn default_max_events() -> usize {
    DEFAULT_MAX_EVENTS
}

fn default_true() -> bool {
    true
}

fn default_timestamp_precision() -> u32 {
    crate::types::DEFAULT_TIMESTAMP_PRECISION
}

fn default_replay_event_name() -> String {
    DEFAULT_REPLAY_EVENT_NAME.to_string()
}

fn default_replay_speed() -> f64 {
    1.0
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
            capture_repeats: true,
            timestamp_precision: crate::types::DEFAULT_TIMESTAMP_PRECISION,
            replay_event_name: default_replay_event_name(),
            replay_timing: ReplayTiming::default(),
            replay_speed: 1.0,
        }
    }
}

impl HistoryConfig {
    /// Set the store capacity
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    /// Enable or disable repeat capture
    pub fn with_capture_repeats(mut self, capture_repeats: bool) -> Self {
        self.capture_repeats = capture_repeats;
        self
    }

    /// Set the rounding precision
    pub fn with_timestamp_precision(mut self, precision: u32) -> Self {
        self.timestamp_precision = precision;
        self
    }

    /// Set the replay channel name
    pub fn with_replay_event_name(mut self, name: impl Into<String>) -> Self {
        self.replay_event_name = name.into();
        self
    }

    /// Set the replay timing mode
    pub fn with_replay_timing(mut self, timing: ReplayTiming) -> Self {
        self.replay_timing = timing;
        self
    }

    /// Set the replay speed multiplier
    pub fn with_replay_speed(mut self, speed: f64) -> Self {
        self.replay_speed = speed;
        self
    }

    /// Apply clamps and fallbacks so every field holds a usable value
    ///
    /// Called once by the coordinator; components rely on the result.
    pub fn normalized(mut self) -> Self {
        if !self.replay_speed.is_finite() {
            self.replay_speed = 1.0;
        }
        self.replay_speed = self.replay_speed.clamp(MIN_REPLAY_SPEED, MAX_REPLAY_SPEED);
        // 10^p must stay representable
        self.timestamp_precision = self.timestamp_precision.min(15);
        if self.replay_event_name.trim().is_empty() {
            self.replay_event_name = default_replay_event_name();
        }
        self
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map(Self::normalized)
            .map_err(|e| KeyHistoryError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            KeyHistoryError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load the config from the default location, falling back to defaults
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }
}
