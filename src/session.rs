//! Playback session and lifecycle state
//!
//! A [`PlaybackSession`] exists for exactly one loaded stream. It is owned
//! exclusively by the controller task: a new `Play` command replaces the
//! session (it is never mutated in place across loads), and stop,
//! completion, or failure destroys it. The session id is what late engine
//! callbacks are matched against, so a callback for a superseded session
//! can be recognized and dropped.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Playback lifecycle state
///
/// `Stopped` and `Error` are momentary: cleanup runs unconditionally on any
/// path into them and the controller returns to `Idle` (no session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
    Stopped,
    Error,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Loading => write!(f, "loading"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Error => write!(f, "error"),
        }
    }
}

/// Display metadata for the current stream
///
/// Opaque to the controller; only projected into the transport surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork_url: Option<String>,
}

/// One active load of a remote audio stream
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    /// Session identity, matched against inbound engine events
    pub id: Uuid,
    /// Source URL handed to the engine
    pub url: String,
    /// Display metadata supplied with the play command
    pub metadata: TrackMetadata,
    /// Duration in milliseconds; -1 until the engine reports readiness
    /// (and possibly forever, for live streams)
    pub duration_ms: i64,
    /// Current position in milliseconds
    pub position_ms: u64,
    /// Lifecycle state
    pub state: PlaybackState,
}

impl PlaybackSession {
    /// Create a fresh session in `Loading`, awaiting engine readiness
    pub fn new(url: String, metadata: TrackMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            metadata,
            duration_ms: -1,
            position_ms: 0,
            state: PlaybackState::Loading,
        }
    }
}
