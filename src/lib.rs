//! # keyhistory-rs: Keyboard History Capture and Replay
//!
//! Captures keyboard interaction delivered by a host UI, keeps it in a
//! bounded in-memory history, and replays it later as synthetic
//! notifications with the original relative timing.
//!
//! ## Architecture
//!
//! - **Capture**: pairs raw key-down / key-up signals into duration-bearing events
//! - **Store**: bounded ring buffer of finalized events, oldest evicted first
//! - **Replay**: cancelable per-event timers on the tokio runtime
//! - **Session**: [`KeyboardHistory`] orchestrates the lifecycle of all three
//!
//! The host supplies two collaborators: a [`SignalSource`] delivering raw key
//! signals and an [`EventSink`] receiving replayed notifications. In-process
//! implementations of both ([`SignalHub`], [`EventBus`]) are provided.
//!
//! ## Example
//!
//! ```ignore
//! use keyhistory_rs::{EventBus, HistoryConfig, KeyboardHistory, SignalHub};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> keyhistory_rs::Result<()> {
//!     let hub = Arc::new(SignalHub::new());
//!     let bus = Arc::new(EventBus::new());
//!     let replayed = bus.subscribe_channel("keyboardHistoryReplay");
//!
//!     let mut history = KeyboardHistory::new(HistoryConfig::default(), hub.clone(), bus);
//!     history.start();
//!     hub.key_down("a", "KeyA", 120.0);
//!     hub.key_up("a", "KeyA", 180.0);
//!     history.stop();
//!
//!     history.replay(None)?;
//!     history.wait_until_idle().await;
//!     for notification in replayed.try_iter() {
//!         println!("{} held {}ms", notification.key, notification.duration);
//!     }
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod clock;
pub mod config;
pub mod error;
pub mod replay;
pub mod session;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use capture::{EventCapture, SignalHub, SignalSource};
pub use clock::{Clock, MonotonicClock};
pub use config::{HistoryConfig, ReplayTiming};
pub use error::{KeyHistoryError, Result};
pub use replay::{EventBus, EventSink, ReplayNotification, ReplayScheduler, ReplaySession};
pub use session::{HistoryExport, KeyboardHistory, RecordingSession};
pub use store::EventStore;
pub use types::{KeyEvent, KeyPhase, RawKeySignal};
