//! Error handling for keyhistory-rs
//!
//! This module defines the crate error type and a Result alias for use
//! throughout the library. Boundary conditions of a live UI (a key released
//! without a matching press, `stop` while already stopped) are not errors and
//! never surface here.

use thiserror::Error;

/// Main error type for keyhistory-rs operations
#[derive(Error, Debug)]
pub enum KeyHistoryError {
    /// A key event failed validation (store insert or replay input)
    #[error("{}", format_validation(.index, .field, .message))]
    Validation {
        /// Position of the offending element in the replay input, if any
        index: Option<usize>,
        /// Name of the offending field (`event` when the element itself is malformed)
        field: &'static str,
        /// Expected-vs-actual description
        message: String,
    },

    /// `replay` was called while another replay is active
    #[error("Replay already in progress; call stop_replay() first")]
    ReplayInProgress,

    /// Replay input was not a sequence of events
    #[error("Invalid replay input: {0}")]
    InvalidInput(String),

    /// No async runtime was available to schedule replay timers
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Errors related to configuration loading
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<KeyHistoryError>,
    },
}

fn format_validation(index: &Option<usize>, field: &str, message: &str) -> String {
    match index {
        Some(index) => format!("Invalid event at index {index}: field '{field}' {message}"),
        None => format!("Invalid event: field '{field}' {message}"),
    }
}

impl KeyHistoryError {
    /// Create a validation error for a standalone event
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        KeyHistoryError::Validation {
            index: None,
            field,
            message: message.into(),
        }
    }

    /// Attach the position of the offending element to a validation error
    pub fn at_index(self, position: usize) -> Self {
        match self {
            KeyHistoryError::Validation { field, message, .. } => KeyHistoryError::Validation {
                index: Some(position),
                field,
                message,
            },
            other => other,
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        KeyHistoryError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this is a validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, KeyHistoryError::Validation { .. })
    }
}

/// Result type alias for keyhistory-rs operations
pub type Result<T> = std::result::Result<T, KeyHistoryError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
