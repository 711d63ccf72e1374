// SPDX-License-Identifier: GPL-3.0-only

//! Scan session lifecycle
//!
//! A session ties one frame source to one decoder boundary and drives the
//! paced tick loop between them. Sessions move through a four-state
//! lifecycle:
//!
//! ```text
//!            start()                  stream ready
//!   Idle ──────────────▶ Starting ──────────────▶ Scanning
//!    ▲                      │                        │
//!    │                      │ acquire failed         │ stop()
//!    │                      ▼                        ▼
//!    └────────────────── (error) ◀─────────────── Stopping
//!         cleanup complete
//! ```
//!
//! `start` and `stop` are idempotent; calls that do not match the current
//! state are ignored. Every transition is broadcast over a watch channel
//! so reactive consumers re-render from snapshots, while imperative
//! consumers poll the getters or install callbacks.

pub mod builder;
pub mod callback;
pub mod scan_loop;
pub mod watch;

pub use builder::ScannerBuilder;
pub use callback::CallbackScanner;
pub use watch::WatchScanner;

use crate::config::ScannerConfig;
use crate::constants::scan;
use crate::decoder::{DecoderBoundary, Detection, FrameLease};
use crate::errors::{DecoderError, ScanError, ScanResult};
use crate::source::{FrameGrabber, FrameSource, StreamInfo};
use scan_loop::{ScanLoop, TickAction};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::watch::{Receiver, Sender, channel};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Lifecycle state of a scan session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No stream held, no ticks running
    #[default]
    Idle,
    /// `start` accepted; acquiring the stream
    Starting,
    /// Stream live, tick loop running
    Scanning,
    /// `stop` accepted; tearing down
    Stopping,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Scanning => "scanning",
            SessionState::Stopping => "stopping",
        };
        write!(f, "{}", name)
    }
}

/// Point-in-time view of a session, broadcast on every change
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// Most recent detection; earlier ones are overwritten
    pub last_detection: Option<Detection>,
}

impl SessionSnapshot {
    pub fn is_scanning(&self) -> bool {
        self.state == SessionState::Scanning
    }
}

/// Callback invoked for each detection, on the scan-loop thread
pub type DetectionCallback = Box<dyn FnMut(Detection) + Send>;

/// Callback invoked when starting a session fails
pub type ErrorCallback = Box<dyn FnMut(ScanError) + Send>;

/// Mutable session state behind the shared handle
#[derive(Default)]
struct EngineState {
    state: SessionState,
    last_detection: Option<Detection>,
    stream: Option<StreamInfo>,
}

/// State shared between the engine, the scan loop and the result sink
struct EngineShared {
    id: Uuid,
    state: Mutex<EngineState>,
    snapshot_tx: Sender<SessionSnapshot>,
    on_detected: Mutex<Option<DetectionCallback>>,
    on_error: Mutex<Option<ErrorCallback>>,
}

impl EngineShared {
    /// Send the current state to all snapshot subscribers
    fn broadcast(&self) {
        let snapshot = {
            let st = self.state.lock().unwrap();
            SessionSnapshot {
                state: st.state,
                last_detection: st.last_detection.clone(),
            }
        };
        self.snapshot_tx.send_replace(snapshot);
    }

    /// Record a detection and notify both presentation surfaces
    fn deliver(&self, detection: Detection) {
        debug!(
            session = %self.id,
            symbology = %detection.symbology,
            "Symbol detected"
        );
        {
            let mut st = self.state.lock().unwrap();
            st.last_detection = Some(detection.clone());
        }
        self.broadcast();
        if let Some(cb) = self.on_detected.lock().unwrap().as_mut() {
            cb(detection);
        }
    }

    fn deliver_error(&self, err: ScanError) {
        if let Some(cb) = self.on_error.lock().unwrap().as_mut() {
            cb(err);
        }
    }

    /// Final transition of every teardown path
    fn enter_idle(&self) {
        {
            let mut st = self.state.lock().unwrap();
            st.state = SessionState::Idle;
            st.stream = None;
        }
        self.broadcast();
        debug!(session = %self.id, "Session idle");
    }
}

/// Drives scan sessions over one frame source and one decoder boundary
///
/// The engine owns the source between sessions and hands it to the loop
/// thread while scanning; the loop's finalizer returns it, so the source
/// can be re-acquired by a later `start`. All methods take `&self` and the
/// engine is safe to share across threads.
pub struct SessionEngine {
    shared: Arc<EngineShared>,
    boundary: Arc<dyn DecoderBoundary>,
    /// Source parked here between sessions; empty while a loop owns it
    source_slot: Arc<Mutex<Option<Box<dyn FrameSource>>>>,
    scan_loop: Mutex<Option<ScanLoop>>,
    config: ScannerConfig,
    init_result: OnceLock<Result<(), DecoderError>>,
}

impl SessionEngine {
    pub fn new(
        source: Box<dyn FrameSource>,
        boundary: Arc<dyn DecoderBoundary>,
        config: ScannerConfig,
    ) -> Self {
        let id = Uuid::new_v4();
        let (snapshot_tx, _) = channel(SessionSnapshot {
            state: SessionState::Idle,
            last_detection: None,
        });
        debug!(session = %id, decoder = %config.decoder, "Created scan session");
        Self {
            shared: Arc::new(EngineShared {
                id,
                state: Mutex::new(EngineState::default()),
                snapshot_tx,
                on_detected: Mutex::new(None),
                on_error: Mutex::new(None),
            }),
            boundary,
            source_slot: Arc::new(Mutex::new(Some(source))),
            scan_loop: Mutex::new(None),
            config,
            init_result: OnceLock::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.lock().unwrap().state
    }

    pub fn is_scanning(&self) -> bool {
        self.state() == SessionState::Scanning
    }

    /// Most recent detection, surviving across stop/start
    pub fn last_detection(&self) -> Option<Detection> {
        self.shared.state.lock().unwrap().last_detection.clone()
    }

    /// Details of the active stream, if any
    pub fn stream_info(&self) -> Option<StreamInfo> {
        self.shared.state.lock().unwrap().stream.clone()
    }

    /// Subscribe to state and result changes
    pub fn subscribe(&self) -> Receiver<SessionSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Install the detection callback, replacing any previous one
    pub fn set_on_detected(&self, cb: impl FnMut(Detection) + Send + 'static) {
        *self.shared.on_detected.lock().unwrap() = Some(Box::new(cb));
    }

    /// Install the error callback, replacing any previous one
    pub fn set_on_error(&self, cb: impl FnMut(ScanError) + Send + 'static) {
        *self.shared.on_error.lock().unwrap() = Some(Box::new(cb));
    }

    /// Initialize the decoder boundary ahead of the first `start`
    ///
    /// The outcome is memoized: repeated calls return the first result
    /// without touching the backend again.
    pub fn init(&self) -> ScanResult<()> {
        let result = self.init_result.get_or_init(|| {
            debug!(session = %self.shared.id, "Initializing decoder boundary");
            self.boundary.init()
        });
        result.clone().map_err(ScanError::from)
    }

    /// Begin scanning
    ///
    /// Acquires the stream, installs the result sink and spawns the tick
    /// loop. A no-op unless the session is idle; in particular, calling
    /// `start` during teardown is ignored rather than queued. On failure
    /// the session returns to idle and the error is delivered to the
    /// error callback once, as well as returned.
    pub fn start(&self) -> ScanResult<()> {
        {
            let mut st = self.shared.state.lock().unwrap();
            if st.state != SessionState::Idle {
                debug!(
                    session = %self.shared.id,
                    state = %st.state,
                    "Start ignored, session not idle"
                );
                return Ok(());
            }
            st.state = SessionState::Starting;
        }
        self.shared.broadcast();
        info!(session = %self.shared.id, "Starting scan session");

        if let Err(e) = self.init() {
            self.abort_start(&e);
            return Err(e);
        }

        let source = self.source_slot.lock().unwrap().take();
        let Some(source) = source else {
            // Only possible when a racing start already owns the source
            let err = ScanError::Other("Frame source unavailable".to_string());
            self.abort_start(&err);
            return Err(err);
        };
        let mut grabber = FrameGrabber::new(source);

        let stream = match grabber.acquire(self.config.facing) {
            Ok(info) => info,
            Err(e) => {
                *self.source_slot.lock().unwrap() = Some(grabber.into_source());
                let err = ScanError::from(e);
                self.abort_start(&err);
                return Err(err);
            }
        };

        // Route detections into session state before the first tick can run
        let sink_shared = Arc::clone(&self.shared);
        self.boundary
            .set_sink(Some(Arc::new(move |detection| sink_shared.deliver(detection))));

        // The loop slot is held across the transition to Scanning and the
        // spawn, so a stop racing with this start always observes a
        // consistent pairing of state and loop.
        let mut loop_slot = self.scan_loop.lock().unwrap();
        {
            let mut st = self.shared.state.lock().unwrap();
            if st.state != SessionState::Starting {
                // A concurrent stop aborted this start mid-flight
                drop(st);
                drop(loop_slot);
                self.boundary.set_sink(None);
                let mut source = grabber.into_source();
                source.release();
                *self.source_slot.lock().unwrap() = Some(source);
                self.shared.enter_idle();
                debug!(session = %self.shared.id, "Start aborted by concurrent stop");
                return Ok(());
            }
            st.state = SessionState::Scanning;
            st.stream = Some(stream.clone());
        }
        self.shared.broadcast();
        info!(
            session = %self.shared.id,
            device = %stream.device,
            width = stream.width,
            height = stream.height,
            "Scan session active"
        );

        let boundary = Arc::clone(&self.boundary);
        let tick = move |grabber: &mut FrameGrabber| {
            // Per-tick failures are transient: log and wait for the next beat
            if let Err(e) = run_tick(grabber, boundary.as_ref()) {
                warn!(error = %e, "Scan tick failed");
            }
            TickAction::Continue
        };

        let fin_shared = Arc::clone(&self.shared);
        let fin_boundary = Arc::clone(&self.boundary);
        let fin_slot = Arc::clone(&self.source_slot);
        let finalize = move |grabber: FrameGrabber| {
            fin_boundary.set_sink(None);
            let mut source = grabber.into_source();
            source.release();
            *fin_slot.lock().unwrap() = Some(source);
            fin_shared.enter_idle();
            info!(session = %fin_shared.id, "Scan session stopped");
        };

        *loop_slot = Some(ScanLoop::start(
            scan::LOOP_NAME,
            self.config.sample_interval(),
            grabber,
            tick,
            finalize,
        ));
        Ok(())
    }

    /// End scanning
    ///
    /// Stops the tick loop and releases the stream. A no-op unless the
    /// session is starting or scanning. Safe to call from a detection
    /// callback: the loop then finishes the current tick and finalizes on
    /// its own thread instead of joining.
    pub fn stop(&self) {
        {
            let mut st = self.shared.state.lock().unwrap();
            if !matches!(st.state, SessionState::Starting | SessionState::Scanning) {
                debug!(
                    session = %self.shared.id,
                    state = %st.state,
                    "Stop ignored, session not active"
                );
                return;
            }
            st.state = SessionState::Stopping;
        }
        self.shared.broadcast();
        info!(session = %self.shared.id, "Stopping scan session");

        let taken = self.scan_loop.lock().unwrap().take();
        match taken {
            Some(mut scan_loop) => {
                if scan_loop.is_loop_thread() {
                    scan_loop.request_stop();
                    scan_loop.detach();
                } else {
                    scan_loop.stop();
                }
            }
            None => {
                // The starting thread observes Stopping and finishes the
                // teardown itself
                debug!(session = %self.shared.id, "Stop raced with start, deferring teardown");
            }
        }
    }

    /// Start when idle, stop when starting or scanning
    pub fn toggle(&self) -> ScanResult<()> {
        let state = self.state();
        if matches!(state, SessionState::Starting | SessionState::Scanning) {
            self.stop();
            Ok(())
        } else {
            self.start()
        }
    }

    /// Roll a failed start back to idle and report the error once
    fn abort_start(&self, err: &ScanError) {
        warn!(session = %self.shared.id, error = %err, "Failed to start scan session");
        self.shared.enter_idle();
        self.shared.deliver_error(err.clone());
    }
}

impl Drop for SessionEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One beat of the scan loop: capture, convert, lease, decode
///
/// Skips quietly when no frame is ready or the stream has no dimensions
/// yet. The lease releases the foreign buffer on every path out.
fn run_tick(grabber: &mut FrameGrabber, boundary: &dyn DecoderBoundary) -> ScanResult<()> {
    let Some(frame) = grabber.grab_gray()? else {
        trace!("No frame ready, skipping tick");
        return Ok(());
    };
    if frame.width == 0 || frame.height == 0 {
        trace!("Stream dimensions not yet known, skipping tick");
        return Ok(());
    }
    let captured_at = frame.captured_at;
    let mut lease = FrameLease::acquire(boundary, frame.width, frame.height)?;
    lease.write(frame.pixels)?;
    lease.scan()?;
    trace!(
        width = lease.width(),
        height = lease.height(),
        latency_ms = captured_at.elapsed().as_millis() as u64,
        "Frame submitted to decoder"
    );
    Ok(())
}
