//! The playback state machine
//!
//! [`PlaybackController`] is the single writer: it owns the
//! [`PlaybackSession`], the [`FocusArbiter`], and the [`TransportSync`]
//! projection, and it is the only code that mutates any of them. Every
//! signal source — bridge commands, transport-surface actions, OS focus
//! and route callbacks, engine completions, progress ticks — enters as a
//! typed [`ControllerEvent`] on one mpsc queue and is applied strictly one
//! at a time, in arrival order.
//!
//! Engine calls made while applying an event are fire-and-forget; their
//! asynchronous completions re-enter the queue tagged with the originating
//! session id. A completion whose id no longer matches the live session is
//! discarded, which is what makes `Stop`-during-load and back-to-back
//! `Play` calls safe without locking the engine.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ControllerConfig;
use crate::controller::focus::{FocusArbiter, FocusBackend};
use crate::controller::progress::ProgressMonitor;
use crate::controller::transport::{TransportSurface, TransportSync};
use crate::engine::{EngineAdapter, EngineEvent};
use crate::error::{Error, Result};
use crate::events::{Command, CommandRequest, ControllerEvent, EventBus, FocusChange, PlayerEvent};
use crate::session::{PlaybackSession, PlaybackState, TrackMetadata};

/// Cloneable sender half of the controller queue
///
/// Commands use backpressured `send`; callback-thread producers (engine,
/// focus, route, progress) use non-blocking `try_send` so an OS callback
/// can never stall behind a full queue.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<ControllerEvent>,
}

impl ControllerHandle {
    /// Create the controller queue, returning the shared sender and the
    /// receiver to hand to [`PlaybackController::new`]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ControllerEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueue a typed command
    pub async fn command(&self, command: Command) -> Result<()> {
        self.tx
            .send(ControllerEvent::Command(command))
            .await
            .map_err(|_| Error::Channel("controller task has shut down".to_string()))
    }

    /// Validate a wire-form bridge request and enqueue it
    ///
    /// A missing required argument is rejected here, before the state
    /// machine ever sees it.
    pub async fn submit(&self, request: CommandRequest) -> Result<()> {
        let command = request.into_command()?;
        self.command(command).await
    }

    /// Post an asynchronous engine completion or observation
    pub fn engine_event(&self, session_id: Uuid, event: EngineEvent) {
        let queued = ControllerEvent::Engine { session_id, event };
        if self.tx.try_send(queued).is_err() {
            warn!("controller queue unavailable, dropping engine event");
        }
    }

    /// Post a position probe from a progress monitor generation
    pub fn progress_tick(&self, session_id: Uuid, epoch: u64, position_ms: u64) {
        let queued = ControllerEvent::Progress { session_id, epoch, position_ms };
        if self.tx.try_send(queued).is_err() {
            warn!("controller queue unavailable, dropping progress tick");
        }
    }

    /// Post an OS audio-focus change
    pub fn focus_changed(&self, change: FocusChange) {
        if self.tx.try_send(ControllerEvent::Focus(change)).is_err() {
            warn!("controller queue unavailable, dropping focus change {:?}", change);
        }
    }

    /// Post an audio-route disconnect edge
    pub fn route_disconnected(&self) {
        if self.tx.try_send(ControllerEvent::RouteDisconnected).is_err() {
            warn!("controller queue unavailable, dropping route disconnect");
        }
    }
}

/// How a session ended; drives the single terminal event
enum Terminal {
    Stopped,
    Completed,
    Failed(String),
}

/// Authoritative playback state machine
pub struct PlaybackController {
    config: ControllerConfig,
    engine: Arc<dyn EngineAdapter>,
    focus: FocusArbiter,
    transport: TransportSync,
    events: EventBus,
    handle: ControllerHandle,
    rx: mpsc::Receiver<ControllerEvent>,
    session: Option<PlaybackSession>,
    monitor: Option<ProgressMonitor>,
    /// Generation of the current monitor; ticks carrying an older value
    /// were posted by a superseded monitor and are discarded
    epoch: u64,
}

impl PlaybackController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ControllerConfig,
        engine: Arc<dyn EngineAdapter>,
        focus_backend: Box<dyn FocusBackend>,
        surface: Box<dyn TransportSurface>,
        events: EventBus,
        handle: ControllerHandle,
        rx: mpsc::Receiver<ControllerEvent>,
    ) -> Self {
        Self {
            config,
            engine,
            focus: FocusArbiter::new(focus_backend),
            transport: TransportSync::new(surface),
            events,
            handle,
            rx,
            session: None,
            monitor: None,
            epoch: 0,
        }
    }

    /// Run the event loop until every [`ControllerHandle`] is dropped
    ///
    /// A session still live at shutdown is stopped and cleaned up, so the
    /// engine handle, focus claim, and transport surface are never leaked.
    pub async fn run(mut self) {
        info!("playback controller started");

        while let Some(event) = self.rx.recv().await {
            self.apply(event);
        }

        if self.session.is_some() {
            self.stop_monitor();
            self.engine.stop();
            self.finish_session(Terminal::Stopped);
            self.sync_transport();
        }
        info!("playback controller stopped");
    }

    /// Apply one event, then re-project the transport surface
    ///
    /// TransportSync is equality-diffed, so calling it after every event is
    /// cheap and guarantees the surface is never stale relative to the last
    /// accepted command.
    fn apply(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Command(command) => self.handle_command(command),
            ControllerEvent::Focus(change) => self.handle_focus(change),
            ControllerEvent::RouteDisconnected => self.handle_route_disconnected(),
            ControllerEvent::Engine { session_id, event } => self.handle_engine(session_id, event),
            ControllerEvent::Progress { session_id, epoch, position_ms } => {
                self.handle_progress(session_id, epoch, position_ms)
            }
        }
        self.sync_transport();
    }

    fn state(&self) -> PlaybackState {
        self.session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(PlaybackState::Idle)
    }

    // ========================================
    // Commands
    // ========================================

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Play { url, metadata } => self.handle_play(url, metadata),
            Command::Resume => self.handle_resume(),
            Command::Pause => self.handle_pause(),
            Command::Stop => self.handle_stop(),
            Command::SeekTo { position_ms } => self.handle_seek(position_ms),
            Command::SkipForward => self.handle_skip(true),
            Command::SkipBackward => self.handle_skip(false),
        }
    }

    fn handle_play(&mut self, url: String, metadata: TrackMetadata) {
        info!("play command: {}", url);

        // Implicit stop of the prior session. Its pending engine callbacks
        // become stale the moment the session is released.
        if self.session.is_some() {
            self.stop_monitor();
            self.engine.stop();
            self.finish_session(Terminal::Stopped);
        }

        if !self.focus.acquire() {
            info!("play denied: could not acquire audio focus");
            self.emit(PlayerEvent::FocusDenied { timestamp: Utc::now() });
            return;
        }

        let session = PlaybackSession::new(url, metadata);
        self.engine.load(session.id, &session.url);
        info!("session {} loading", session.id);
        self.session = Some(session);
    }

    fn handle_resume(&mut self) {
        match self.state() {
            PlaybackState::Paused => self.do_resume(),
            state => warn!("resume ignored in state {}", state),
        }
    }

    fn handle_pause(&mut self) {
        match self.state() {
            PlaybackState::Playing => self.do_pause(false),
            PlaybackState::Paused => {
                // Already paused, but an explicit pause still overrides a
                // focus-induced one: focus regain must now stay paused.
                self.focus.clear_resume_on_regain();
                self.focus.release();
                self.emit(PlayerEvent::Paused { timestamp: Utc::now() });
            }
            state => warn!("pause ignored in state {}", state),
        }
    }

    fn handle_stop(&mut self) {
        if self.session.is_none() {
            debug!("stop ignored: no active session");
            return;
        }
        info!("stop command");
        self.stop_monitor();
        self.engine.stop();
        self.finish_session(Terminal::Stopped);
    }

    fn handle_seek(&mut self, requested_ms: i64) {
        let Some(session) = self.session.as_mut() else {
            warn!("seek ignored: no active session");
            return;
        };

        match session.state {
            PlaybackState::Playing | PlaybackState::Paused => {}
            state => {
                warn!("seek ignored in state {}", state);
                return;
            }
        }

        // Clamp to [0, duration] when the duration is known; live streams
        // (duration -1) clamp to [0, inf) and the engine may still reject.
        let target_ms = if session.duration_ms >= 0 {
            requested_ms.clamp(0, session.duration_ms) as u64
        } else {
            requested_ms.max(0) as u64
        };

        let playing = session.state == PlaybackState::Playing;
        let session_id = session.id;
        session.position_ms = target_ms;
        debug!("seek to {}ms (playing: {})", target_ms, playing);

        if playing {
            // One logical operation: the intermediate engine pause is never
            // surfaced, so the transport never flickers to "paused".
            self.engine.pause();
            self.engine.seek(target_ms);
            self.engine.play();
            // Fresh monitor generation: a probe posted before this seek must
            // not land after it and rewind the position.
            self.start_monitor(session_id);
        } else {
            self.engine.seek(target_ms);
        }
    }

    fn handle_skip(&mut self, forward: bool) {
        let Some(session) = self.session.as_ref() else {
            debug!("skip ignored: no active session");
            return;
        };

        let skip_ms = self.config.skip_interval_ms;
        if forward {
            // Only when the target stays short of the end of the stream
            if session.duration_ms >= 0
                && session.duration_ms - session.position_ms as i64 > skip_ms as i64
            {
                self.handle_seek((session.position_ms + skip_ms) as i64);
            } else {
                debug!("skip forward ignored near end of stream");
            }
        } else if session.position_ms > skip_ms {
            self.handle_seek((session.position_ms - skip_ms) as i64);
        } else {
            debug!("skip backward ignored near start of stream");
        }
    }

    // ========================================
    // Focus and route signals
    // ========================================

    fn handle_focus(&mut self, change: FocusChange) {
        match change {
            FocusChange::Gained => {
                self.focus.note_regained();
                if self.state() == PlaybackState::Paused && self.focus.resume_on_regain() {
                    info!("focus regained, resuming playback");
                    self.do_resume();
                } else if self.state() == PlaybackState::Playing {
                    // We kept playing through a duckable loss; restore volume
                    self.engine.set_ducked(false);
                } else if self.state() == PlaybackState::Loading {
                    // The interruption ended before the load finished; the
                    // coming readiness may start playback normally.
                    self.focus.clear_resume_on_regain();
                }
            }
            FocusChange::LostPermanent => {
                self.focus.note_lost();
                self.focus.clear_resume_on_regain();
                if self.session.is_some() {
                    info!("permanent focus loss, stopping playback");
                    self.stop_monitor();
                    self.engine.stop();
                    self.finish_session(Terminal::Stopped);
                }
            }
            FocusChange::LostTransient => {
                self.focus.note_lost();
                if self.state() == PlaybackState::Playing {
                    info!("transient focus loss, pausing playback");
                    self.do_pause(true);
                } else if self.state() == PlaybackState::Loading {
                    // Nothing is rendering yet, but readiness must not start
                    // audio mid-interruption; hold at paused until regain.
                    info!("transient focus loss during load, deferring start");
                    self.focus.set_resume_on_regain();
                }
            }
            FocusChange::LostTransientDuckable => {
                // Policy: state untouched, volume only
                if self.state() == PlaybackState::Playing {
                    debug!("duckable focus loss, reducing volume");
                    self.engine.set_ducked(true);
                }
            }
        }
    }

    fn handle_route_disconnected(&mut self) {
        // Policy: pause, never stop, and never auto-resume on reconnect —
        // so this is a plain (non-focus-induced) pause.
        if self.state() == PlaybackState::Playing {
            info!("audio route disconnected, pausing playback");
            self.do_pause(false);
        } else {
            debug!("route disconnect ignored in state {}", self.state());
        }
    }

    // ========================================
    // Engine completions
    // ========================================

    fn handle_engine(&mut self, session_id: Uuid, event: EngineEvent) {
        // A transient focus loss may have arrived while the load was in
        // flight; readiness must then hold at paused instead of starting.
        let interrupted = self.focus.resume_on_regain();
        let Some(session) = self.session.as_mut() else {
            debug!("discarding engine event for released session {}", session_id);
            return;
        };
        if session.id != session_id {
            debug!(
                "discarding stale engine event for superseded session {} (live: {})",
                session_id, session.id
            );
            return;
        }

        match event {
            EngineEvent::Ready { duration_ms } => {
                if session.state != PlaybackState::Loading {
                    warn!("engine ready ignored in state {}", session.state);
                    return;
                }
                session.duration_ms = duration_ms;
                if interrupted {
                    session.state = PlaybackState::Paused;
                    self.emit(PlayerEvent::Loaded {
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                    self.emit(PlayerEvent::Paused { timestamp: Utc::now() });
                    info!("playback state changed: loading -> paused (awaiting focus regain)");
                } else {
                    session.state = PlaybackState::Playing;
                    self.engine.play();
                    self.start_monitor(session_id);
                    self.emit(PlayerEvent::Loaded {
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                    info!("playback state changed: loading -> playing");
                }
            }
            EngineEvent::Completed => {
                info!("session {} completed", session_id);
                self.stop_monitor();
                self.engine.stop();
                self.finish_session(Terminal::Completed);
            }
            EngineEvent::Failed { reason } => {
                warn!("session {} failed: {}", session_id, reason);
                session.state = PlaybackState::Error;
                self.stop_monitor();
                self.engine.stop();
                self.finish_session(Terminal::Failed(reason));
            }
        }
    }

    fn handle_progress(&mut self, session_id: Uuid, epoch: u64, position_ms: u64) {
        if epoch != self.epoch {
            debug!("discarding progress tick from superseded monitor generation {}", epoch);
            return;
        }
        let Some(session) = self.session.as_mut() else {
            debug!("discarding progress tick for released session {}", session_id);
            return;
        };
        if session.id != session_id {
            debug!("discarding stale progress tick for superseded session {}", session_id);
            return;
        }
        if session.state != PlaybackState::Playing {
            debug!("position tick ignored in state {}", session.state);
            return;
        }
        session.position_ms = position_ms;
        self.emit(PlayerEvent::ProgressChanged {
            position_ms,
            timestamp: Utc::now(),
        });
    }

    // ========================================
    // Shared transitions
    // ========================================

    fn do_resume(&mut self) {
        if !self.focus.acquire() {
            info!("resume denied: could not acquire audio focus");
            self.emit(PlayerEvent::FocusDenied { timestamp: Utc::now() });
            return;
        }

        let Some(session) = self.session.as_mut() else { return };
        let session_id = session.id;
        let old_state = session.state;
        session.state = PlaybackState::Playing;

        self.focus.clear_resume_on_regain();
        self.engine.play();
        // Any duck hint left over from an interruption ends here: we hold
        // full focus again.
        self.engine.set_ducked(false);
        self.start_monitor(session_id);
        self.emit(PlayerEvent::Resumed { timestamp: Utc::now() });
        info!("playback state changed: {} -> playing", old_state);
    }

    /// Pause the playing session
    ///
    /// `focus_induced` marks the pause as system-initiated: the focus claim
    /// is kept and playback resumes when focus returns. A plain pause
    /// clears that intent and abandons focus.
    fn do_pause(&mut self, focus_induced: bool) {
        let Some(session) = self.session.as_mut() else { return };
        let old_state = session.state;
        session.state = PlaybackState::Paused;

        self.engine.pause();
        self.stop_monitor();

        if focus_induced {
            self.focus.set_resume_on_regain();
        } else {
            self.focus.clear_resume_on_regain();
            self.focus.release();
        }

        self.emit(PlayerEvent::Paused { timestamp: Utc::now() });
        info!("playback state changed: {} -> paused", old_state);
    }

    /// Unconditional end-of-session cleanup plus the single terminal event
    ///
    /// Every path into Stopped/Error/Idle funnels through here, so the
    /// engine handle, focus claim, and monitor can never leak.
    fn finish_session(&mut self, terminal: Terminal) {
        self.stop_monitor();
        self.focus.release();
        self.engine.release();

        match terminal {
            Terminal::Stopped => self.emit(PlayerEvent::Stopped { timestamp: Utc::now() }),
            Terminal::Completed => self.emit(PlayerEvent::Completed { timestamp: Utc::now() }),
            Terminal::Failed(message) => self.emit(PlayerEvent::Error {
                message,
                timestamp: Utc::now(),
            }),
        }

        if let Some(session) = self.session.take() {
            info!("session {} released, playback state changed: {} -> idle", session.id, session.state);
        }
    }

    // ========================================
    // Helpers
    // ========================================

    fn start_monitor(&mut self, session_id: Uuid) {
        self.stop_monitor();
        self.epoch += 1;
        self.monitor = Some(ProgressMonitor::start(
            session_id,
            self.epoch,
            self.config.progress_interval_ms,
            Arc::clone(&self.engine),
            self.handle.clone(),
        ));
    }

    fn stop_monitor(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
    }

    fn emit(&self, event: PlayerEvent) {
        debug!("emitting {}", event.event_type());
        self.events.emit_lossy(event);
    }

    fn sync_transport(&mut self) {
        let snapshot = self
            .session
            .as_ref()
            .map(crate::controller::transport::TransportSnapshot::of);
        self.transport.sync(snapshot);
    }
}
