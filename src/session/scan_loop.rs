// SPDX-License-Identifier: GPL-3.0-only

//! Thread lifecycle management for the scan tick loop
//!
//! One loop drives one session: a dedicated thread runs the tick closure
//! once per beat at a fixed interval, with loop state owned by the thread
//! and handed to a finalizer when the loop ends. Beats the tick overruns
//! are skipped, never queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Action returned by the tick closure to control loop behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Keep ticking
    Continue,
    /// End the loop after this tick
    Stop,
}

/// Controller for a paced scan loop running in a separate thread
///
/// The loop owns its state for its whole life: the state value moves onto
/// the thread at start and into the finalizer at the end, so resources
/// like the capture stream are always released on the loop thread
/// regardless of how the loop ends.
pub struct ScanLoop {
    /// Thread handle for joining
    thread_handle: Option<JoinHandle<()>>,
    /// Signal to stop the loop
    stop_signal: Arc<AtomicBool>,
    /// Name for logging
    name: String,
}

impl ScanLoop {
    /// Start a paced loop in a separate thread
    ///
    /// `tick_fn` is called once per beat with exclusive access to `state`
    /// until it returns [`TickAction::Stop`] or the controller's `stop()`
    /// is called. When the loop ends, on any path, `finalize` receives the
    /// state back on the loop thread.
    pub fn start<S, F, G>(
        name: &str,
        interval: Duration,
        state: S,
        mut tick_fn: F,
        finalize: G,
    ) -> Self
    where
        S: Send + 'static,
        F: FnMut(&mut S) -> TickAction + Send + 'static,
        G: FnOnce(S) + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, interval_ms = interval.as_millis() as u64, "Starting scan loop");

        let thread_handle = thread::spawn(move || {
            debug!(name = %name_clone, "Scan loop thread started");
            let mut state = state;
            let mut next_beat = Instant::now();

            loop {
                // Check stop signal first
                if stop_signal_clone.load(Ordering::SeqCst) {
                    debug!(name = %name_clone, "Stop signal received");
                    break;
                }

                // Execute one tick
                match tick_fn(&mut state) {
                    TickAction::Continue => {}
                    TickAction::Stop => {
                        debug!(name = %name_clone, "Loop requested stop");
                        break;
                    }
                }

                // A stop issued during the tick ends the loop without
                // waiting out the next beat
                if stop_signal_clone.load(Ordering::SeqCst) {
                    debug!(name = %name_clone, "Stop signal received during tick");
                    break;
                }

                // Pace to the next beat; beats the tick overran are skipped
                next_beat += interval;
                let now = Instant::now();
                if next_beat <= now {
                    let mut skipped = 0u32;
                    while next_beat <= now {
                        next_beat += interval;
                        skipped += 1;
                    }
                    trace!(name = %name_clone, skipped, "Tick overran, skipping beats");
                } else {
                    thread::sleep(next_beat - now);
                }
            }

            finalize(state);
            info!(name = %name_clone, "Scan loop thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Whether the calling thread is the loop thread
    ///
    /// A stop issued from inside the tick (e.g. from a detection callback)
    /// must not join, or it would wait on itself.
    pub fn is_loop_thread(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| h.thread().id() == thread::current().id())
            .unwrap_or(false)
    }

    /// Get a clone of the stop signal for external use
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_signal)
    }

    /// Signal the loop to stop (non-blocking)
    ///
    /// No tick starts after the flag is observed; an in-flight tick
    /// completes and the finalizer runs on the loop thread.
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting scan loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    ///
    /// When this returns, the finalizer has run and no further tick will
    /// execute. Must not be called from the loop thread; use
    /// `request_stop()` plus `detach()` there.
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending a stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Waiting for scan loop thread to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Scan loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Scan loop thread finished");
            }
        }
    }

    /// Give up the thread handle without joining
    ///
    /// Used when the loop is stopped from its own thread: the thread
    /// finishes the current tick, runs the finalizer, and exits on its
    /// own schedule.
    pub fn detach(&mut self) {
        if self.thread_handle.take().is_some() {
            debug!(name = %self.name, "Detaching scan loop thread");
        }
    }
}

impl Drop for ScanLoop {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "ScanLoop dropped, stopping loop");
            self.stop();
        }
    }
}
