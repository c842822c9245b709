//! Shared test doubles for controller integration tests
//!
//! A recording engine, a recording transport surface, and a scriptable
//! focus backend, plus a `TestRig` that wires them to a running
//! controller and exposes assertion helpers over the outbound event bus.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use uuid::Uuid;

use tonearm::controller::{
    ControllerHandle, FocusBackend, FocusGrant, PlaybackController, TransportSnapshot,
    TransportSurface,
};
use tonearm::engine::{EngineAdapter, EngineEvent};
use tonearm::events::{Command, EventBus, PlayerEvent};
use tonearm::session::TrackMetadata;
use tonearm::ControllerConfig;

// ================================================================================================
// Recording engine
// ================================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Load(Uuid),
    Play,
    Pause,
    Stop,
    Seek(u64),
    Release,
    Duck(bool),
}

/// Engine double that records every call and reports a test-driven position
///
/// The position follows seeks, like a real engine; tests may also move it
/// directly with [`set_position`](Self::set_position).
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    position: AtomicU64,
}

impl RecordingEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            position: AtomicU64::new(0),
        })
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    /// Session id of the most recent load call
    pub fn last_load(&self) -> Option<Uuid> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|c| match c {
                EngineCall::Load(id) => Some(*id),
                _ => None,
            })
    }

    pub fn set_position(&self, position_ms: u64) {
        self.position.store(position_ms, Ordering::SeqCst);
    }
}

impl EngineAdapter for RecordingEngine {
    fn load(&self, session_id: Uuid, _url: &str) {
        self.calls.lock().unwrap().push(EngineCall::Load(session_id));
    }

    fn play(&self) {
        self.calls.lock().unwrap().push(EngineCall::Play);
    }

    fn pause(&self) {
        self.calls.lock().unwrap().push(EngineCall::Pause);
    }

    fn stop(&self) {
        self.calls.lock().unwrap().push(EngineCall::Stop);
    }

    fn seek(&self, position_ms: u64) {
        self.calls.lock().unwrap().push(EngineCall::Seek(position_ms));
        self.position.store(position_ms, Ordering::SeqCst);
    }

    fn release(&self) {
        self.calls.lock().unwrap().push(EngineCall::Release);
    }

    fn set_ducked(&self, ducked: bool) {
        self.calls.lock().unwrap().push(EngineCall::Duck(ducked));
    }

    fn position_ms(&self) -> u64 {
        self.position.load(Ordering::SeqCst)
    }
}

// ================================================================================================
// Scriptable focus backend
// ================================================================================================

/// Shared view into the focus backend handed to the controller
#[derive(Default)]
pub struct FocusProbe {
    scripted: Mutex<VecDeque<FocusGrant>>,
    requests: AtomicUsize,
    abandons: AtomicUsize,
}

impl FocusProbe {
    /// Queue an answer for the next focus request (default is Granted)
    pub fn script(&self, grant: FocusGrant) {
        self.scripted.lock().unwrap().push_back(grant);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn abandons(&self) -> usize {
        self.abandons.load(Ordering::SeqCst)
    }
}

pub struct ScriptedFocus {
    probe: Arc<FocusProbe>,
}

impl FocusBackend for ScriptedFocus {
    fn request(&mut self) -> FocusGrant {
        self.probe.requests.fetch_add(1, Ordering::SeqCst);
        self.probe
            .scripted
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FocusGrant::Granted)
    }

    fn abandon(&mut self) {
        self.probe.abandons.fetch_add(1, Ordering::SeqCst);
    }
}

// ================================================================================================
// Recording transport surface
// ================================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Show(TransportSnapshot),
    Update(TransportSnapshot),
    Hide,
}

#[derive(Clone, Default)]
pub struct SurfaceProbe {
    calls: Arc<Mutex<Vec<SurfaceCall>>>,
}

impl SurfaceProbe {
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Latest snapshot pushed to the surface, if it is currently visible
    pub fn visible_snapshot(&self) -> Option<TransportSnapshot> {
        match self.calls.lock().unwrap().last() {
            Some(SurfaceCall::Show(s)) | Some(SurfaceCall::Update(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// True if any snapshot ever reached the surface with the given
    /// play/pause flag
    pub fn ever_saw_playing(&self, is_playing: bool) -> bool {
        self.calls.lock().unwrap().iter().any(|c| match c {
            SurfaceCall::Show(s) | SurfaceCall::Update(s) => s.is_playing == is_playing,
            SurfaceCall::Hide => false,
        })
    }

    pub fn hide_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, SurfaceCall::Hide))
            .count()
    }
}

impl TransportSurface for SurfaceProbe {
    fn show(&mut self, snapshot: &TransportSnapshot) {
        self.calls.lock().unwrap().push(SurfaceCall::Show(snapshot.clone()));
    }

    fn update(&mut self, snapshot: &TransportSnapshot) {
        self.calls.lock().unwrap().push(SurfaceCall::Update(snapshot.clone()));
    }

    fn hide(&mut self) {
        self.calls.lock().unwrap().push(SurfaceCall::Hide);
    }
}

// ================================================================================================
// Test rig
// ================================================================================================

/// A running controller wired to recording doubles
pub struct TestRig {
    pub handle: ControllerHandle,
    pub engine: Arc<RecordingEngine>,
    pub focus: Arc<FocusProbe>,
    pub surface: SurfaceProbe,
    pub events: broadcast::Receiver<PlayerEvent>,
    _task: JoinHandle<()>,
}

impl TestRig {
    pub fn start() -> Self {
        // A long progress interval keeps monitor ticks out of the way of
        // event assertions; monitor behavior has its own unit tests.
        Self::start_with(ControllerConfig {
            progress_interval_ms: 3_600_000,
            ..Default::default()
        })
    }

    pub fn start_with(config: ControllerConfig) -> Self {
        let (handle, rx) = ControllerHandle::channel(config.command_capacity);
        let bus = EventBus::new(config.event_capacity);
        let events = bus.subscribe();

        let engine = RecordingEngine::new();
        let focus = Arc::new(FocusProbe::default());
        let surface = SurfaceProbe::default();

        let controller = PlaybackController::new(
            config,
            Arc::clone(&engine) as Arc<dyn EngineAdapter>,
            Box::new(ScriptedFocus { probe: Arc::clone(&focus) }),
            Box::new(surface.clone()),
            bus,
            handle.clone(),
            rx,
        );
        let task = tokio::spawn(controller.run());

        Self {
            handle,
            engine,
            focus,
            surface,
            events,
            _task: task,
        }
    }

    /// Send a play command and wait for the engine to receive the load,
    /// returning the new session id
    pub async fn play(&self, url: &str, title: Option<&str>) -> Uuid {
        let loads_before = self.engine.calls().iter().filter(|c| matches!(c, EngineCall::Load(_))).count();
        self.handle
            .command(Command::Play {
                url: url.to_string(),
                metadata: TrackMetadata {
                    title: title.map(|t| t.to_string()),
                    ..Default::default()
                },
            })
            .await
            .expect("controller should accept play");

        timeout(Duration::from_secs(1), async {
            loop {
                let loads: Vec<Uuid> = self
                    .engine
                    .calls()
                    .iter()
                    .filter_map(|c| match c {
                        EngineCall::Load(id) => Some(*id),
                        _ => None,
                    })
                    .collect();
                if loads.len() > loads_before {
                    return *loads.last().unwrap();
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("engine never saw the load call")
    }

    /// Report engine readiness for a session
    pub fn ready(&self, session_id: Uuid, duration_ms: i64) {
        self.handle.engine_event(session_id, EngineEvent::Ready { duration_ms });
    }

    /// Receive the next non-progress event, asserting its type
    pub async fn expect(&mut self, event_type: &str) -> PlayerEvent {
        let event = self.next_event().await.unwrap_or_else(|| {
            panic!("timed out waiting for {} event", event_type)
        });
        assert_eq!(event.event_type(), event_type, "unexpected event: {:?}", event);
        event
    }

    /// Next non-progress event within a second, or None on timeout
    pub async fn next_event(&mut self) -> Option<PlayerEvent> {
        timeout(Duration::from_secs(1), async {
            loop {
                match self.events.recv().await {
                    Ok(PlayerEvent::ProgressChanged { .. }) => continue,
                    Ok(event) => return Some(event),
                    Err(_) => return None,
                }
            }
        })
        .await
        .ok()
        .flatten()
    }

    /// Assert that no non-progress event arrives within the window
    pub async fn expect_quiet(&mut self, window: Duration) {
        let got = timeout(window, async {
            loop {
                match self.events.recv().await {
                    Ok(PlayerEvent::ProgressChanged { .. }) => continue,
                    Ok(event) => return Some(event),
                    Err(_) => return None,
                }
            }
        })
        .await;
        if let Ok(Some(event)) = got {
            panic!("expected quiet, got {:?}", event);
        }
    }

    /// Give the controller task time to drain already-queued events
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
