//! Event system for the playback controller
//!
//! # Architecture
//!
//! Tonearm uses hybrid communication: one queue in, one bus out.
//! - **Controller queue** (tokio::mpsc): every signal source — bridge
//!   commands, OS focus callbacks, route changes, engine completions,
//!   progress ticks — is funneled into one [`ControllerEvent`] queue and
//!   applied by the single controller task, strictly in arrival order.
//! - **EventBus** (tokio::broadcast): outcomes the embedder cares about are
//!   published as [`PlayerEvent`]s to any number of subscribers.
//!
//! Inbound user actions from the transport surface (lock-screen buttons)
//! map onto the same [`Command`] enum as programmatic commands and are
//! treated identically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::engine::EngineEvent;
use crate::error::{Error, Result};
use crate::session::TrackMetadata;

// ========================================
// Inbound commands
// ========================================

/// Playback commands, from the command bridge or the transport surface
#[derive(Debug, Clone)]
pub enum Command {
    /// Load and play a stream, replacing any current session
    Play { url: String, metadata: TrackMetadata },
    /// Resume the paused session
    Resume,
    /// Pause the playing session
    Pause,
    /// Stop and release the current session (idempotent)
    Stop,
    /// Seek to an absolute position in milliseconds
    SeekTo { position_ms: i64 },
    /// Relative seek forward by the configured skip interval
    SkipForward,
    /// Relative seek backward by the configured skip interval
    SkipBackward,
}

/// Wire form of a bridge command
///
/// `command` selects the operation; the remaining fields are its arguments.
/// Only `url` (for `play`) and `position_ms` (for `seek_to`) are required;
/// everything else is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub position_ms: Option<i64>,
}

impl CommandRequest {
    /// Validate the request into a typed [`Command`]
    ///
    /// A missing required argument is a caller-contract violation reported
    /// as [`Error::MissingArgument`]; nothing reaches the state machine.
    pub fn into_command(self) -> Result<Command> {
        match self.command.as_str() {
            "play" => {
                let url = self
                    .url
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| Error::MissingArgument("url".to_string()))?;
                Ok(Command::Play {
                    url,
                    metadata: TrackMetadata {
                        title: self.title,
                        artist: self.artist,
                        album: self.album,
                        artwork_url: self.artwork_url,
                    },
                })
            }
            "resume" => Ok(Command::Resume),
            "pause" => Ok(Command::Pause),
            "stop" => Ok(Command::Stop),
            "seek_to" => {
                let position_ms = self
                    .position_ms
                    .ok_or_else(|| Error::MissingArgument("position_ms".to_string()))?;
                Ok(Command::SeekTo { position_ms })
            }
            "skip_forward" => Ok(Command::SkipForward),
            "skip_backward" => Ok(Command::SkipBackward),
            other => Err(Error::BadRequest(format!("unknown command: {}", other))),
        }
    }
}

// ========================================
// OS signals
// ========================================

/// Audio-focus interruption signals, as translated from OS callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    /// Focus regained after a loss
    Gained,
    /// Permanent loss; playback must stop
    LostPermanent,
    /// Temporary loss; playback pauses and may resume on regain
    LostTransient,
    /// Temporary loss where continuing at reduced volume is allowed;
    /// no state transition, only a duck hint to the engine
    LostTransientDuckable,
}

// ========================================
// Controller queue
// ========================================

/// Everything that can enter the controller's single event queue
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// User or application command
    Command(Command),
    /// OS audio-focus signal
    Focus(FocusChange),
    /// The active audio route (headset/bluetooth) went away
    RouteDisconnected,
    /// Asynchronous engine completion, matched to its originating session
    /// by id
    Engine { session_id: Uuid, event: EngineEvent },
    /// Position probe from the progress monitor; `epoch` identifies the
    /// monitor generation that posted it, so a tick already in flight when
    /// the monitor is replaced (seek, resume) can be recognized and dropped
    Progress {
        session_id: Uuid,
        epoch: u64,
        position_ms: u64,
    },
}

// ========================================
// Outbound events
// ========================================

/// Externally visible playback events, broadcast on the [`EventBus`]
///
/// Exactly one terminal event (`Stopped`, `Completed`, or `Error`) is
/// emitted per session lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// The stream is ready; duration_ms is -1 for live streams
    Loaded {
        duration_ms: i64,
        timestamp: DateTime<Utc>,
    },

    /// Playback position changed
    ProgressChanged {
        position_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Playback resumed
    Resumed { timestamp: DateTime<Utc> },

    /// Playback paused
    Paused { timestamp: DateTime<Utc> },

    /// Session ended by stop (user, bridge, or permanent focus loss)
    Stopped { timestamp: DateTime<Utc> },

    /// Session ended at natural end of stream
    Completed { timestamp: DateTime<Utc> },

    /// Session ended by engine failure
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Play or resume could not acquire audio focus; informational,
    /// state unchanged, the caller may retry later
    FocusDenied { timestamp: DateTime<Utc> },
}

impl PlayerEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            PlayerEvent::Loaded { .. } => "Loaded",
            PlayerEvent::ProgressChanged { .. } => "ProgressChanged",
            PlayerEvent::Resumed { .. } => "Resumed",
            PlayerEvent::Paused { .. } => "Paused",
            PlayerEvent::Stopped { .. } => "Stopped",
            PlayerEvent::Completed { .. } => "Completed",
            PlayerEvent::Error { .. } => "Error",
            PlayerEvent::FocusDenied { .. } => "FocusDenied",
        }
    }
}

// ========================================
// Event bus
// ========================================

/// One-to-many broadcast of [`PlayerEvent`]s
///
/// Backed by tokio::broadcast: non-blocking publish, multiple concurrent
/// subscribers, automatic cleanup when subscribers drop.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the subscriber count, or an error if nobody is listening.
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the case where no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of currently attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
