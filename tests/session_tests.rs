// SPDX-License-Identifier: MPL-2.0

//! Integration tests for scan session lifecycle

use barcode_scanner::decoder::{BufferHandle, ResultSink};
use barcode_scanner::errors::{DecoderResult, SourceError, SourceResult};
use barcode_scanner::source::{RgbaFrame, StreamInfo};
use barcode_scanner::{
    DecoderBoundary, DecoderError, Detection, FacingMode, FrameSource, ScanError, ScannerBuilder,
    ScannerConfig, SessionEngine, SessionState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Counters shared between a test and its mocks
#[derive(Default)]
struct Counters {
    acquires: AtomicUsize,
    releases: AtomicUsize,
    creates: AtomicUsize,
    destroys: AtomicUsize,
    scans: AtomicUsize,
}

/// Frame source yielding a solid white 4x4 frame on every grab
struct MockSource {
    counters: Arc<Counters>,
    deny: bool,
}

impl FrameSource for MockSource {
    fn acquire(&mut self, _facing: FacingMode) -> SourceResult<StreamInfo> {
        if self.deny {
            return Err(SourceError::AccessDenied(
                "camera permission rejected".to_string(),
            ));
        }
        self.counters.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(StreamInfo {
            width: 4,
            height: 4,
            device: "mock".to_string(),
        })
    }

    fn grab(&mut self) -> SourceResult<Option<RgbaFrame>> {
        Ok(Some(RgbaFrame {
            width: 4,
            height: 4,
            stride: 16,
            data: Arc::from(vec![255u8; 64]),
            captured_at: Instant::now(),
        }))
    }

    fn release(&mut self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Decoder boundary that counts buffer traffic and can report one symbol
struct MockBoundary {
    counters: Arc<Counters>,
    sink: Mutex<Option<ResultSink>>,
    emit: Option<Detection>,
    fail_scan: bool,
}

impl MockBoundary {
    fn new(counters: &Arc<Counters>) -> Self {
        Self {
            counters: Arc::clone(counters),
            sink: Mutex::new(None),
            emit: None,
            fail_scan: false,
        }
    }

    fn emitting(counters: &Arc<Counters>, detection: Detection) -> Self {
        Self {
            emit: Some(detection),
            ..Self::new(counters)
        }
    }

    fn failing(counters: &Arc<Counters>) -> Self {
        Self {
            fail_scan: true,
            ..Self::new(counters)
        }
    }
}

impl DecoderBoundary for MockBoundary {
    fn init(&self) -> DecoderResult<()> {
        Ok(())
    }

    fn create_buffer(&self, _width: u32, _height: u32) -> DecoderResult<BufferHandle> {
        let id = self.counters.creates.fetch_add(1, Ordering::SeqCst);
        Ok(BufferHandle::new(id))
    }

    fn write(&self, _handle: BufferHandle, _pixels: &[u8]) -> DecoderResult<()> {
        Ok(())
    }

    fn scan(&self, _handle: BufferHandle, _width: u32, _height: u32) -> DecoderResult<()> {
        self.counters.scans.fetch_add(1, Ordering::SeqCst);
        if self.fail_scan {
            return Err(DecoderError::ScanFailed("injected".to_string()));
        }
        let sink = self.sink.lock().unwrap().clone();
        if let (Some(sink), Some(detection)) = (sink, &self.emit) {
            sink(detection.clone());
        }
        Ok(())
    }

    fn destroy_buffer(&self, _handle: BufferHandle) {
        self.counters.destroys.fetch_add(1, Ordering::SeqCst);
    }

    fn set_sink(&self, sink: Option<ResultSink>) {
        *self.sink.lock().unwrap() = sink;
    }
}

fn fast_config() -> ScannerConfig {
    ScannerConfig {
        sample_interval_ms: 5,
        ..ScannerConfig::default()
    }
}

fn build_engine(counters: &Arc<Counters>, boundary: MockBoundary, deny: bool) -> SessionEngine {
    ScannerBuilder::new()
        .with_config(fast_config())
        .source(MockSource {
            counters: Arc::clone(counters),
            deny,
        })
        .boundary(Arc::new(boundary))
        .build()
        .unwrap()
}

fn wait_until(deadline: Duration, check: impl Fn() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    check()
}

#[test]
fn test_double_start_holds_one_stream() {
    let counters = Arc::new(Counters::default());
    let engine = build_engine(&counters, MockBoundary::new(&counters), false);

    engine.start().unwrap();
    engine.start().unwrap();
    assert_eq!(engine.state(), SessionState::Scanning);
    assert_eq!(
        counters.acquires.load(Ordering::SeqCst),
        1,
        "A second start must not open a second stream"
    );

    engine.stop();
    engine.stop();
    assert_eq!(engine.state(), SessionState::Idle);
    assert_eq!(
        counters.releases.load(Ordering::SeqCst),
        1,
        "A second stop must not release twice"
    );
}

#[test]
fn test_stop_when_idle_is_noop() {
    let counters = Arc::new(Counters::default());
    let engine = build_engine(&counters, MockBoundary::new(&counters), false);

    engine.stop();
    assert_eq!(engine.state(), SessionState::Idle);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 0);
}

#[test]
fn test_buffer_traffic_is_balanced() {
    let counters = Arc::new(Counters::default());
    let engine = build_engine(&counters, MockBoundary::new(&counters), false);

    engine.start().unwrap();
    assert!(
        wait_until(Duration::from_secs(2), || {
            counters.scans.load(Ordering::SeqCst) >= 3
        }),
        "Expected several scan ticks"
    );
    engine.stop();

    let creates = counters.creates.load(Ordering::SeqCst);
    let destroys = counters.destroys.load(Ordering::SeqCst);
    assert!(creates >= 3);
    assert_eq!(
        creates, destroys,
        "Every tick must release the buffer it allocated"
    );
}

#[test]
fn test_buffer_traffic_balanced_when_scans_fail() {
    let counters = Arc::new(Counters::default());
    let engine = build_engine(&counters, MockBoundary::failing(&counters), false);

    engine.start().unwrap();
    assert!(
        wait_until(Duration::from_secs(2), || {
            counters.scans.load(Ordering::SeqCst) >= 3
        }),
        "Expected several scan ticks"
    );
    // Failing ticks do not end the session
    assert!(engine.is_scanning());
    engine.stop();

    let creates = counters.creates.load(Ordering::SeqCst);
    let destroys = counters.destroys.load(Ordering::SeqCst);
    assert!(creates >= 3);
    assert_eq!(
        creates, destroys,
        "Failed scans must still release their buffers"
    );
}

#[test]
fn test_denied_start_reports_once_and_stays_idle() {
    let counters = Arc::new(Counters::default());
    let engine = build_engine(&counters, MockBoundary::new(&counters), true);
    let errors: Arc<Mutex<Vec<ScanError>>> = Arc::new(Mutex::new(Vec::new()));
    let errors_clone = Arc::clone(&errors);
    engine.set_on_error(move |e| errors_clone.lock().unwrap().push(e));

    let result = engine.start();
    match result {
        Err(ScanError::Source(SourceError::AccessDenied(_))) => {}
        other => panic!("Expected AccessDenied, got {:?}", other),
    }
    assert_eq!(engine.state(), SessionState::Idle);
    assert_eq!(
        errors.lock().unwrap().len(),
        1,
        "A failed start must deliver its error exactly once"
    );
    assert_eq!(counters.acquires.load(Ordering::SeqCst), 0);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 0);

    // Each failed attempt reports once more
    assert!(engine.start().is_err());
    assert_eq!(errors.lock().unwrap().len(), 2);
    assert_eq!(engine.state(), SessionState::Idle);
}

#[test]
fn test_detection_updates_result_verbatim() {
    let counters = Arc::new(Counters::default());
    let payload = Detection::new("QR-Code", "WIFI:S:cafe;T:WPA;P:espresso;;");
    let engine = build_engine(
        &counters,
        MockBoundary::emitting(&counters, payload.clone()),
        false,
    );

    engine.start().unwrap();
    assert!(
        wait_until(Duration::from_secs(2), || engine.last_detection().is_some()),
        "Expected a detection within the deadline"
    );
    engine.stop();

    assert_eq!(
        engine.last_detection(),
        Some(payload),
        "The delivered payload must not be altered"
    );
    // The result survives the stop
    assert_eq!(engine.state(), SessionState::Idle);
    assert!(engine.last_detection().is_some());
}

#[test]
fn test_stop_from_detection_callback() {
    let counters = Arc::new(Counters::default());
    let engine = Arc::new(build_engine(
        &counters,
        MockBoundary::emitting(&counters, Detection::new("QR-Code", "one-shot")),
        false,
    ));
    let weak = Arc::downgrade(&engine);
    engine.set_on_detected(move |_| {
        if let Some(engine) = weak.upgrade() {
            engine.stop();
        }
    });

    engine.start().unwrap();
    assert!(
        wait_until(Duration::from_secs(2), || {
            engine.state() == SessionState::Idle
        }),
        "Stopping from the detection callback must terminate the session"
    );
    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
    assert_eq!(
        counters.creates.load(Ordering::SeqCst),
        counters.destroys.load(Ordering::SeqCst)
    );

    // The source is back in the engine's hands; a restart works
    engine.start().unwrap();
    assert!(
        wait_until(Duration::from_secs(2), || {
            engine.state() == SessionState::Idle
        }),
        "Second one-shot session must also terminate"
    );
    assert_eq!(counters.acquires.load(Ordering::SeqCst), 2);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_watch_surface_observes_lifecycle() {
    let counters = Arc::new(Counters::default());
    let scanner = ScannerBuilder::new()
        .with_config(fast_config())
        .source(MockSource {
            counters: Arc::clone(&counters),
            deny: false,
        })
        .boundary(Arc::new(MockBoundary::emitting(
            &counters,
            Detection::new("QR-Code", "reactive"),
        )))
        .build_watch()
        .unwrap();
    let mut rx = scanner.subscribe();
    assert_eq!(rx.borrow().state, SessionState::Idle);

    scanner.start().unwrap();
    let snapshot = tokio::time::timeout(Duration::from_secs(2), async {
        rx.wait_for(|s| s.is_scanning() && s.last_detection.is_some())
            .await
            .unwrap()
            .clone()
    })
    .await
    .expect("Timed out waiting for a scanning snapshot with a detection");
    assert_eq!(
        snapshot.last_detection,
        Some(Detection::new("QR-Code", "reactive"))
    );

    scanner.stop();
    let snapshot = tokio::time::timeout(Duration::from_secs(2), async {
        rx.wait_for(|s| s.state == SessionState::Idle)
            .await
            .unwrap()
            .clone()
    })
    .await
    .expect("Timed out waiting for the idle snapshot");
    // The last result is retained after the stop
    assert!(snapshot.last_detection.is_some());
}
