// SPDX-License-Identifier: GPL-3.0-only

//! Imperative presentation
//!
//! Wraps a [`SessionEngine`] for callers that think in terms of method
//! calls and callbacks rather than snapshot streams: install callbacks,
//! call `start`/`stop`/`toggle`, poll the getters.

use crate::decoder::Detection;
use crate::errors::ScanResult;
use crate::session::{SessionEngine, SessionState};
use tracing::debug;

/// Callback-driven scanner handle
///
/// Detections and start failures arrive through the callbacks installed
/// at build time; current state is available through the getters at any
/// time. Dropping the handle stops the session and releases the stream.
pub struct CallbackScanner {
    engine: SessionEngine,
}

impl CallbackScanner {
    pub fn new(engine: SessionEngine) -> Self {
        Self { engine }
    }

    /// Initialize the decoder ahead of the first `start`
    ///
    /// Optional; `start` performs the same initialization. Calling it
    /// early surfaces a broken decoder before any camera prompt.
    pub fn init(&self) -> ScanResult<()> {
        self.engine.init()
    }

    /// Begin scanning; a no-op if already active
    ///
    /// Failures are delivered to the error callback and also returned.
    pub fn start(&self) -> ScanResult<()> {
        self.engine.start()
    }

    /// End scanning; a no-op if not active
    pub fn stop(&self) {
        self.engine.stop();
    }

    /// Start when idle, stop when active
    pub fn toggle(&self) -> ScanResult<()> {
        self.engine.toggle()
    }

    pub fn state(&self) -> SessionState {
        self.engine.state()
    }

    pub fn is_scanning(&self) -> bool {
        self.engine.is_scanning()
    }

    /// Most recent detection, surviving across stop/start
    pub fn last_detection(&self) -> Option<Detection> {
        self.engine.last_detection()
    }

    /// Access the underlying engine
    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    /// Stop the session and release everything
    ///
    /// Dropping the handle does the same; `close` just makes the
    /// teardown point explicit.
    pub fn close(self) {
        debug!(session = %self.engine.id(), "Closing scanner");
        self.engine.stop();
    }
}
