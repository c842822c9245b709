//! Error types for tonearm
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the playback controller
///
/// Note that a denied focus request and a stale engine callback are *not*
/// errors: the first surfaces as an informational [`PlayerEvent::FocusDenied`]
/// and the second is silently discarded with a debug log.
///
/// [`PlayerEvent::FocusDenied`]: crate::events::PlayerEvent::FocusDenied
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required command argument missing (caller-contract violation,
    /// rejected before reaching the state machine)
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// Malformed or unknown command from the bridge
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Failure reported by the media engine
    #[error("Engine error: {0}")]
    Engine(String),

    /// The controller event queue is closed or full
    #[error("Controller unavailable: {0}")]
    Channel(String),
}

/// Convenience Result type using tonearm Error
pub type Result<T> = std::result::Result<T, Error>;
