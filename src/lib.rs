//! # Tonearm
//!
//! Synchronized playback controller for a single remote audio stream.
//!
//! **Purpose:** keep playback state consistent across three concurrent
//! signal sources — commands (play/pause/resume/stop/seek), OS
//! audio-focus/interruption callbacks, and periodic progress observation —
//! while mirroring the resulting state into an OS-level transport surface
//! (lock-screen/notification controls).
//!
//! **Architecture:** every signal source feeds typed events into one
//! tokio::mpsc queue consumed by a single controller task (the only
//! mutator of playback state). Engine calls are fire-and-forget; their
//! asynchronous completions re-enter the queue tagged with a session id so
//! completions for superseded sessions are dropped rather than misapplied.
//! Outcomes are broadcast to subscribers as [`events::PlayerEvent`]s.
//!
//! The media engine, the transport surface, and the audio-focus handle are
//! collaborators behind traits ([`engine::EngineAdapter`],
//! [`controller::TransportSurface`], [`controller::FocusBackend`]);
//! platform bindings and process lifecycle live outside this crate.

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod session;

pub use config::ControllerConfig;
pub use controller::{ControllerHandle, PlaybackController};
pub use error::{Error, Result};
