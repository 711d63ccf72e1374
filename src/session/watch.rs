// SPDX-License-Identifier: GPL-3.0-only

//! Reactive presentation
//!
//! Wraps a [`SessionEngine`] for consumers that re-render from state:
//! every transition and detection is published as a [`SessionSnapshot`]
//! on a watch channel, and the getters read the latest published value.

use crate::decoder::Detection;
use crate::errors::ScanResult;
use crate::session::{SessionEngine, SessionSnapshot, SessionState};
use tokio::sync::watch::Receiver;

/// Snapshot-driven scanner handle
///
/// Intermediate values are coalesced the way watch channels do: a
/// consumer that falls behind sees the latest snapshot, not a backlog.
pub struct WatchScanner {
    engine: SessionEngine,
    receiver: Receiver<SessionSnapshot>,
}

impl WatchScanner {
    pub fn new(engine: SessionEngine) -> Self {
        let receiver = engine.subscribe();
        Self { engine, receiver }
    }

    /// Initialize the decoder ahead of the first `start`
    pub fn init(&self) -> ScanResult<()> {
        self.engine.init()
    }

    /// Begin scanning; a no-op if already active
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

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.receiver.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.snapshot().state
    }

    pub fn is_scanning(&self) -> bool {
        self.snapshot().is_scanning()
    }

    /// Most recent detection, surviving across stop/start
    pub fn last_detection(&self) -> Option<Detection> {
        self.snapshot().last_detection
    }

    /// Wait for the next change and return the new snapshot
    pub async fn changed(&mut self) -> SessionSnapshot {
        // The sender lives inside the engine this handle owns, so the
        // channel cannot close while we wait
        let _ = self.receiver.changed().await;
        self.receiver.borrow_and_update().clone()
    }

    /// An independent receiver for another consumer or task
    pub fn subscribe(&self) -> Receiver<SessionSnapshot> {
        self.engine.subscribe()
    }

    /// Access the underlying engine
    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }
}
