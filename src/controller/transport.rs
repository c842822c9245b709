//! Transport-surface projection
//!
//! [`TransportSync`] is the sole owner of the OS transport surface
//! (lock-screen/notification controls). It is a pure projection: after
//! every committed transition the controller hands it the freshly derived
//! [`TransportSnapshot`] (or `None` when no session is live) and the sync
//! diffs it against the previous one. Which surface call is made is driven
//! entirely by that equality diff, never by the raw event type, so
//! coalesced or duplicate events cannot flicker the surface:
//!
//! - nothing changed: no call at all;
//! - metadata or duration changed: full rebuild via `show`;
//! - only play/pause or position changed: cheap `update`;
//! - session appeared/disappeared: `show`/`hide`.

use tracing::debug;

use crate::session::{PlaybackSession, PlaybackState, TrackMetadata};

/// Derived view of the current session for the transport surface
///
/// Recomputed on every transition; `is_playing` always equals
/// `state == Playing` at the moment of projection (no torn reads, since
/// projection happens on the controller task).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSnapshot {
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: i64,
    pub metadata: TrackMetadata,
}

impl TransportSnapshot {
    /// Project a live session into its transport view
    pub fn of(session: &PlaybackSession) -> Self {
        Self {
            is_playing: session.state == PlaybackState::Playing,
            position_ms: session.position_ms,
            duration_ms: session.duration_ms,
            metadata: session.metadata.clone(),
        }
    }
}

/// OS-level transport surface (lock-screen/notification controls)
///
/// `show` builds or rebuilds the full surface (metadata, artwork,
/// actions); `update` refreshes only the play/pause affordance and
/// position. User-initiated actions from the surface flow back in as
/// ordinary [`Command`](crate::events::Command)s.
pub trait TransportSurface: Send {
    fn show(&mut self, snapshot: &TransportSnapshot);
    fn update(&mut self, snapshot: &TransportSnapshot);
    fn hide(&mut self);
}

/// Equality-diffed projection of controller state onto a [`TransportSurface`]
pub struct TransportSync {
    surface: Box<dyn TransportSurface>,
    last: Option<TransportSnapshot>,
}

impl TransportSync {
    pub fn new(surface: Box<dyn TransportSurface>) -> Self {
        Self { surface, last: None }
    }

    /// Reconcile the surface with the given snapshot
    ///
    /// `None` means no session is live (Idle, or just reached
    /// Stopped/Error): the surface is hidden.
    pub fn sync(&mut self, snapshot: Option<TransportSnapshot>) {
        match (&self.last, &snapshot) {
            (None, None) => {}
            (None, Some(next)) => {
                debug!("transport surface shown");
                self.surface.show(next);
            }
            (Some(_), None) => {
                debug!("transport surface hidden");
                self.surface.hide();
            }
            (Some(prev), Some(next)) if prev == next => {}
            (Some(prev), Some(next))
                if prev.metadata != next.metadata || prev.duration_ms != next.duration_ms =>
            {
                // New stream or newly discovered duration: full rebuild
                self.surface.show(next);
            }
            (Some(_), Some(next)) => {
                self.surface.update(next);
            }
        }
        self.last = snapshot;
    }
}
