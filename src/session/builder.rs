// SPDX-License-Identifier: GPL-3.0-only

//! Session assembly
//!
//! The builder wires a frame source, a decoder boundary and the two
//! result callbacks into a [`SessionEngine`], filling in defaults from
//! the config for anything not supplied explicitly.

use crate::config::{DecoderKind, ScannerConfig};
use crate::decoder::{DecoderBoundary, Detection, RqrrDecoder};
use crate::errors::{ScanError, ScanResult};
use crate::session::{CallbackScanner, DetectionCallback, ErrorCallback, SessionEngine, WatchScanner};
use crate::source::FrameSource;
use std::sync::Arc;

/// Builder for scan sessions
///
/// ```no_run
/// use barcode_scanner::{ScannerBuilder, StillSource};
///
/// # fn main() -> Result<(), barcode_scanner::ScanError> {
/// let scanner = ScannerBuilder::new()
///     .source(StillSource::new("ticket.png"))
///     .on_detected(|detection| println!("{}", detection))
///     .build_callback()?;
/// scanner.start()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ScannerBuilder {
    config: ScannerConfig,
    source: Option<Box<dyn FrameSource>>,
    boundary: Option<Arc<dyn DecoderBoundary>>,
    on_detected: Option<DetectionCallback>,
    on_error: Option<ErrorCallback>,
}

impl ScannerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given config instead of the defaults
    pub fn with_config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Supply the frame source explicitly
    ///
    /// Without this, the builder opens a capture device per the config
    /// (requires the `v4l` feature).
    pub fn source(mut self, source: impl FrameSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Supply the decoder boundary explicitly
    ///
    /// Without this, the builder constructs the backend named by
    /// `config.decoder`.
    pub fn boundary(mut self, boundary: Arc<dyn DecoderBoundary>) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Callback invoked for each detection
    pub fn on_detected(mut self, cb: impl FnMut(Detection) + Send + 'static) -> Self {
        self.on_detected = Some(Box::new(cb));
        self
    }

    /// Callback invoked when starting the session fails
    pub fn on_error(mut self, cb: impl FnMut(ScanError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(cb));
        self
    }

    /// Assemble the engine
    pub fn build(self) -> ScanResult<SessionEngine> {
        let boundary = match self.boundary {
            Some(boundary) => boundary,
            None => default_boundary(self.config.decoder)?,
        };
        let source = match self.source {
            Some(source) => source,
            None => default_source(&self.config)?,
        };
        let engine = SessionEngine::new(source, boundary, self.config);
        if let Some(cb) = self.on_detected {
            *engine.shared.on_detected.lock().unwrap() = Some(cb);
        }
        if let Some(cb) = self.on_error {
            *engine.shared.on_error.lock().unwrap() = Some(cb);
        }
        Ok(engine)
    }

    /// Assemble the imperative presentation
    pub fn build_callback(self) -> ScanResult<CallbackScanner> {
        Ok(CallbackScanner::new(self.build()?))
    }

    /// Assemble the reactive presentation
    pub fn build_watch(self) -> ScanResult<WatchScanner> {
        Ok(WatchScanner::new(self.build()?))
    }
}

/// Construct the decoder backend named by the config
fn default_boundary(kind: DecoderKind) -> ScanResult<Arc<dyn DecoderBoundary>> {
    match kind {
        DecoderKind::Rqrr => Ok(Arc::new(RqrrDecoder::new())),
        DecoderKind::Native => {
            #[cfg(feature = "native")]
            {
                Ok(Arc::new(crate::decoder::ffi::NativeDecoder::new()))
            }
            #[cfg(not(feature = "native"))]
            {
                Err(crate::errors::DecoderError::Unavailable(
                    "native decoder support is not built in; enable the native feature".to_string(),
                )
                .into())
            }
        }
    }
}

/// Open a capture device per the config
#[cfg(feature = "v4l")]
fn default_source(config: &ScannerConfig) -> ScanResult<Box<dyn FrameSource>> {
    let source = match &config.device_path {
        Some(path) => crate::source::v4l2::V4l2Source::with_device(path),
        None => crate::source::v4l2::V4l2Source::new(),
    };
    Ok(Box::new(source))
}

#[cfg(not(feature = "v4l"))]
fn default_source(_config: &ScannerConfig) -> ScanResult<Box<dyn FrameSource>> {
    tracing::warn!(
        "No frame source supplied and capture support is not built in; enable the v4l feature or pass a source"
    );
    Err(ScanError::Source(crate::errors::SourceError::NoDevice))
}
