//! Event replay
//!
//! This module re-emits recorded or externally supplied key events as
//! synthetic notifications, reproducing the gaps between them.
//!
//! # Features
//!
//! - Cancelable per-event timers on the tokio runtime
//! - Drift-correcting or per-gap delay computation
//! - Full validation of untrusted input before anything is scheduled
//! - Pluggable notification delivery through [`EventSink`]

pub mod scheduler;
pub mod sink;
pub mod validate;

pub use scheduler::{ReplayScheduler, ReplaySession, TimerId};
pub use sink::{EventBus, EventSink, Observer, ReplayNotification};
pub use validate::{event_from_value, events_from_value, validate_sequence};
