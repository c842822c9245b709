//! Audio-route observation
//!
//! The [`RouteWatcher`] runs for the lifetime of the controller,
//! independent of playback state. The platform layer publishes route
//! presence (wired/bluetooth headset attached) into a
//! `tokio::sync::watch` channel; the watcher posts
//! [`ControllerEvent::RouteDisconnected`] on each present→absent edge and
//! nothing else — never repeatedly while the route stays absent, and
//! deliberately nothing on reconnect, so unplugging headphones never
//! auto-resumes on replug.
//!
//! [`ControllerEvent::RouteDisconnected`]: crate::events::ControllerEvent::RouteDisconnected

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::controller::state_machine::ControllerHandle;

/// Handle to the route-observation task
pub struct RouteWatcher {
    task: JoinHandle<()>,
}

impl RouteWatcher {
    /// Spawn the watcher over a route-presence channel
    ///
    /// `true` means some headset route is attached. The initial value is
    /// taken as the baseline; only subsequent edges produce events.
    pub fn spawn(mut route_rx: watch::Receiver<bool>, handle: ControllerHandle) -> Self {
        // Baseline is captured before the task exists; an edge that fires
        // before the task's first poll is still an edge.
        let mut present = *route_rx.borrow();
        let task = tokio::spawn(async move {
            debug!("route watcher started (route present: {})", present);

            while route_rx.changed().await.is_ok() {
                let now = *route_rx.borrow();
                if present && !now {
                    info!("audio route disconnected");
                    handle.route_disconnected();
                } else if !present && now {
                    // Observed, but by policy produces no transition
                    debug!("audio route restored");
                }
                present = now;
            }

            debug!("route watcher stopped: source channel closed");
        });

        Self { task }
    }

    /// Cancel the observation task
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for RouteWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
