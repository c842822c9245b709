//! The synchronized playback controller and its components
//!
//! [`PlaybackController`] (state machine) is the single writer; the other
//! components are either producers feeding its queue ([`ProgressMonitor`],
//! [`RouteWatcher`]) or owned projections/arbiters it drives
//! ([`TransportSync`], [`FocusArbiter`]).

pub mod focus;
pub mod progress;
pub mod route;
pub mod state_machine;
pub mod transport;

pub use focus::{FocusArbiter, FocusBackend, FocusGrant};
pub use progress::ProgressMonitor;
pub use route::RouteWatcher;
pub use state_machine::{ControllerHandle, PlaybackController};
pub use transport::{TransportSnapshot, TransportSurface, TransportSync};
