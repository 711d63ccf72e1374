// SPDX-License-Identifier: GPL-3.0-only

//! Result routing for decoders with a single process-wide callback
//!
//! The native decoder library reports results through one global callback
//! with no user-data pointer, so concurrent sessions would otherwise
//! trample each other's delivery. The registry keeps a sink per boundary
//! and remembers which boundary scanned most recently; the shared
//! callback dispatches to that one.

use crate::decoder::{Detection, ResultSink};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use tracing::debug;
use uuid::Uuid;

struct RegistryState {
    sinks: HashMap<Uuid, ResultSink>,
    /// Boundary whose scan call is (or was last) in flight
    active: Option<Uuid>,
}

static REGISTRY: OnceLock<Mutex<RegistryState>> = OnceLock::new();

fn state() -> &'static Mutex<RegistryState> {
    REGISTRY.get_or_init(|| {
        Mutex::new(RegistryState {
            sinks: HashMap::new(),
            active: None,
        })
    })
}

/// Register the sink for a boundary
pub fn install(id: Uuid, sink: ResultSink) {
    let mut state = state().lock().unwrap();
    state.sinks.insert(id, sink);
}

/// Remove a boundary's sink
///
/// Results arriving afterwards for this boundary are dropped.
pub fn uninstall(id: Uuid) {
    let mut state = state().lock().unwrap();
    state.sinks.remove(&id);
    if state.active == Some(id) {
        state.active = None;
    }
}

/// Mark a boundary as the one currently scanning
///
/// Called immediately before each decode pass; deliveries from the
/// shared callback route to the marked boundary.
pub fn mark_active(id: Uuid) {
    let mut state = state().lock().unwrap();
    state.active = Some(id);
}

/// Route a detection to the active boundary's sink
///
/// Returns whether a sink accepted it. The sink runs outside the
/// registry lock so it can re-enter the registry freely.
pub fn dispatch(detection: Detection) -> bool {
    let sink = {
        let state = state().lock().unwrap();
        state
            .active
            .and_then(|id| state.sinks.get(&id).cloned())
    };
    match sink {
        Some(sink) => {
            sink(detection);
            true
        }
        None => {
            debug!(
                symbology = %detection.symbology,
                "Dropping detection with no registered sink"
            );
            false
        }
    }
}
