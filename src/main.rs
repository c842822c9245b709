//! Tonearm demo player - main entry point
//!
//! Runs the playback controller against a simulated engine so the whole
//! pipeline (command -> state machine -> transport projection -> outbound
//! events) can be exercised from the command line without a real media
//! backend or OS bindings.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use tonearm::controller::{
    ControllerHandle, FocusBackend, FocusGrant, PlaybackController, RouteWatcher,
    TransportSnapshot, TransportSurface,
};
use tonearm::engine::{EngineAdapter, EngineEvent};
use tonearm::events::{Command, EventBus, PlayerEvent};
use tonearm::session::TrackMetadata;
use tonearm::ControllerConfig;

/// Command-line arguments for the tonearm demo player
#[derive(Parser, Debug)]
#[command(name = "tonearm")]
#[command(about = "Synchronized playback controller demo")]
#[command(version)]
struct Args {
    /// Stream URL to play
    #[arg(env = "TONEARM_URL")]
    url: String,

    /// Display title for the transport surface
    #[arg(short, long)]
    title: Option<String>,

    /// Display artist for the transport surface
    #[arg(short = 'a', long)]
    artist: Option<String>,

    /// Optional TOML configuration file
    #[arg(short, long, env = "TONEARM_CONFIG")]
    config: Option<PathBuf>,

    /// Simulated stream duration in seconds
    #[arg(short, long, default_value = "20")]
    duration_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tonearm=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = ControllerConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    let (handle, rx) = ControllerHandle::channel(config.command_capacity);
    let events = EventBus::new(config.event_capacity);
    let mut event_rx = events.subscribe();

    let engine = Arc::new(SimulatedEngine::new(
        handle.clone(),
        (args.duration_secs * 1000) as i64,
    ));

    // Route presence is static in the demo; real platforms publish
    // headset/bluetooth attach state here.
    let (_route_tx, route_rx) = tokio::sync::watch::channel(true);
    let _route_watcher = RouteWatcher::spawn(route_rx, handle.clone());

    let controller = PlaybackController::new(
        config,
        Arc::clone(&engine) as Arc<dyn EngineAdapter>,
        Box::new(AlwaysGranted),
        Box::new(LogSurface),
        events,
        handle.clone(),
        rx,
    );
    let controller_task = tokio::spawn(controller.run());
    info!("playback controller initialized");

    handle
        .command(Command::Play {
            url: args.url,
            metadata: TrackMetadata {
                title: args.title,
                artist: args.artist,
                ..Default::default()
            },
        })
        .await
        .context("Failed to enqueue play command")?;

    // Print outbound events until the session reaches its terminal event
    // or the user interrupts.
    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Ok(event) = event else { break };
                match &event {
                    PlayerEvent::Loaded { duration_ms, .. } => {
                        info!("event: loaded ({} ms)", duration_ms);
                    }
                    PlayerEvent::ProgressChanged { position_ms, .. } => {
                        info!("event: progress {} ms", position_ms);
                    }
                    PlayerEvent::Error { message, .. } => {
                        info!("event: error: {}", message);
                        break;
                    }
                    PlayerEvent::Stopped { .. } | PlayerEvent::Completed { .. } => {
                        info!("event: {}", event.event_type());
                        break;
                    }
                    other => info!("event: {}", other.event_type()),
                }
            }
            _ = signal::ctrl_c() => {
                info!("received Ctrl+C, stopping playback");
                handle.command(Command::Stop).await.ok();
            }
        }
    }

    drop(handle);
    controller_task.await.context("Controller task panicked")?;
    info!("shutdown complete");
    Ok(())
}

/// Focus backend that always grants (the demo has no competing apps)
struct AlwaysGranted;

impl FocusBackend for AlwaysGranted {
    fn request(&mut self) -> FocusGrant {
        FocusGrant::Granted
    }

    fn abandon(&mut self) {}
}

/// Transport surface that logs instead of driving OS widgets
struct LogSurface;

impl TransportSurface for LogSurface {
    fn show(&mut self, snapshot: &TransportSnapshot) {
        info!(
            "transport: show \"{}\" playing={} {}ms/{}ms",
            snapshot.metadata.title.as_deref().unwrap_or("<untitled>"),
            snapshot.is_playing,
            snapshot.position_ms,
            snapshot.duration_ms
        );
    }

    fn update(&mut self, snapshot: &TransportSnapshot) {
        info!(
            "transport: update playing={} {}ms",
            snapshot.is_playing, snapshot.position_ms
        );
    }

    fn hide(&mut self) {
        info!("transport: hide");
    }
}

/// Wall-clock simulated engine
///
/// Loads complete after a short delay, position advances in real time
/// while playing, and reaching the end of the stream posts a completion
/// event for the owning session.
struct SimulatedEngine {
    handle: ControllerHandle,
    duration_ms: i64,
    state: Arc<Mutex<SimState>>,
}

#[derive(Default)]
struct SimState {
    session: Option<Uuid>,
    playing: bool,
    base_ms: u64,
    resumed_at: Option<Instant>,
}

impl SimState {
    fn position_ms(&self) -> u64 {
        let running = self
            .resumed_at
            .map(|at| at.elapsed().as_millis() as u64)
            .unwrap_or(0);
        self.base_ms + running
    }
}

impl SimulatedEngine {
    fn new(handle: ControllerHandle, duration_ms: i64) -> Self {
        Self {
            handle,
            duration_ms,
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }
}

impl EngineAdapter for SimulatedEngine {
    fn load(&self, session_id: Uuid, url: &str) {
        info!("engine: loading {}", url);
        *self.state.lock().unwrap() = SimState {
            session: Some(session_id),
            ..Default::default()
        };

        // Readiness arrives asynchronously, like a real prepare call
        let handle = self.handle.clone();
        let duration_ms = self.duration_ms;
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            handle.engine_event(session_id, EngineEvent::Ready { duration_ms });
        });

        // End-of-stream watcher for this session; exits quietly when the
        // session is replaced or stopped.
        let handle = self.handle.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_millis(250)).await;
                let done = {
                    let state = state.lock().unwrap();
                    if state.session != Some(session_id) {
                        return;
                    }
                    state.playing && duration_ms >= 0 && state.position_ms() >= duration_ms as u64
                };
                if done {
                    state.lock().unwrap().session = None;
                    handle.engine_event(session_id, EngineEvent::Completed);
                    return;
                }
            }
        });
    }

    fn play(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.playing {
            state.playing = true;
            state.resumed_at = Some(Instant::now());
        }
    }

    fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        state.base_ms = state.position_ms();
        state.playing = false;
        state.resumed_at = None;
    }

    fn stop(&self) {
        *self.state.lock().unwrap() = SimState::default();
    }

    fn seek(&self, position_ms: u64) {
        let mut state = self.state.lock().unwrap();
        state.base_ms = position_ms;
        if state.playing {
            state.resumed_at = Some(Instant::now());
        }
    }

    fn release(&self) {
        self.stop();
    }

    fn set_ducked(&self, ducked: bool) {
        info!("engine: ducked={}", ducked);
    }

    fn position_ms(&self) -> u64 {
        let state = self.state.lock().unwrap();
        state.position_ms().min(self.duration_ms.max(0) as u64)
    }
}
