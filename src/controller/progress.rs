//! Progress observation
//!
//! A [`ProgressMonitor`] lives exactly as long as one `Playing` interval:
//! started on entry to Playing, aborted on any exit (pause, stop, error).
//! Resuming or seeking creates a fresh monitor; no instance survives the
//! boundary.
//!
//! Each tick probes the engine position and posts it back into the
//! controller queue tagged with the owning session id and the monitor's
//! generation (`epoch`) — never mutating state directly. The controller
//! discards ticks from a superseded generation, so a probe posted just
//! before a seek can never land after it and drag the position backwards.
//! Positions identical to the previously posted one are suppressed, so
//! listeners and the transport surface see no redundant updates while the
//! stream is buffering or the engine quantizes coarsely.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;
use uuid::Uuid;

use crate::controller::state_machine::ControllerHandle;
use crate::engine::EngineAdapter;

/// Handle to the polling task for one `Playing` interval
pub struct ProgressMonitor {
    task: JoinHandle<()>,
}

impl ProgressMonitor {
    /// Spawn the polling task for `session_id` under generation `epoch`
    pub fn start(
        session_id: Uuid,
        epoch: u64,
        interval_ms: u64,
        engine: Arc<dyn EngineAdapter>,
        handle: ControllerHandle,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_millis(interval_ms.max(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut last_posted: Option<u64> = None;
            loop {
                ticker.tick().await;
                let position_ms = engine.position_ms();
                if last_posted == Some(position_ms) {
                    continue;
                }
                debug!("progress tick: {}ms", position_ms);
                handle.progress_tick(session_id, epoch, position_ms);
                last_posted = Some(position_ms);
            }
        });

        Self { task }
    }

    /// Cancel the polling task
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
