//! Recording sessions
//!
//! This module ties capture, storage and replay together behind
//! [`KeyboardHistory`] and defines the export format used to move recorded
//! histories in and out of the process.
//!
//! # Features
//!
//! - Start/stop recording with idempotent lifecycle calls
//! - Replay the current recording or externally supplied events
//! - Export recordings as JSON with summary metadata
//! - Import and validate previously exported histories

pub mod coordinator;
pub mod export;
pub mod types;

pub use coordinator::KeyboardHistory;
pub use export::{ExportMetadata, HistoryExport};
pub use types::RecordingSession;
