//! Media engine collaborator interface
//!
//! The decode/render engine is a black box behind the [`EngineAdapter`]
//! trait. All methods are fire-and-forget from the controller's
//! perspective: the controller never blocks on the engine, and the engine's
//! asynchronous completions re-enter the controller queue as
//! [`EngineEvent`]s tagged with the session id they belong to. A completion
//! carrying a superseded session id is dropped by the controller instead of
//! being misapplied.

use uuid::Uuid;

/// Asynchronous engine completions and observations
///
/// Posted through [`ControllerHandle::engine_event`] together with the
/// originating session id.
///
/// [`ControllerHandle::engine_event`]: crate::controller::ControllerHandle::engine_event
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The stream is loaded and ready to render.
    ///
    /// `duration_ms` is -1 when no duration is available (live streams).
    Ready { duration_ms: i64 },

    /// Natural end of stream
    Completed,

    /// Load or playback failure; never retried automatically
    Failed { reason: String },
}

/// Contract for the underlying media engine
///
/// Implementations must be cheap to call and must not block: long-running
/// work happens on the engine's own threads, with outcomes reported back as
/// [`EngineEvent`]s.
pub trait EngineAdapter: Send + Sync {
    /// Begin loading `url` for the given session. Readiness (or failure)
    /// is reported asynchronously.
    fn load(&self, session_id: Uuid, url: &str);

    /// Start or resume rendering of the loaded stream
    fn play(&self);

    /// Pause rendering, keeping the stream loaded
    fn pause(&self);

    /// Stop rendering and reset the stream
    fn stop(&self);

    /// Seek to an absolute position in milliseconds
    fn seek(&self, position_ms: u64);

    /// Release all engine resources for the current stream
    fn release(&self);

    /// Duck (or restore) output volume during a duckable focus loss
    fn set_ducked(&self, ducked: bool);

    /// Probe the current playback position in milliseconds
    fn position_ms(&self) -> u64;
}
