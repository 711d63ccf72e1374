// SPDX-License-Identifier: MPL-2.0

//! Barcode scanner - live symbol scanning over an external decoder
//!
//! This library drives scan sessions: it acquires frames from a camera or
//! still image, converts them to the luma plane the decoder expects, and
//! feeds them across the decoder boundary on a fixed beat until symbols
//! are detected.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`session`]: Session lifecycle, the tick loop and the two presentations
//! - [`source`]: Frame acquisition (capture devices, still images) and
//!   grayscale conversion
//! - [`decoder`]: The boundary contract with the external decoder and the
//!   bundled backends
//! - [`config`]: User configuration handling
//! - [`errors`]: Error types for every layer
//!
//! # Example
//!
//! ```no_run
//! use barcode_scanner::{ScannerBuilder, StillSource};
//!
//! # fn main() -> Result<(), barcode_scanner::ScanError> {
//! let scanner = ScannerBuilder::new()
//!     .source(StillSource::new("ticket.png"))
//!     .on_detected(|detection| println!("{}", detection))
//!     .build_callback()?;
//! scanner.start()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod decoder;
pub mod errors;
pub mod session;
pub mod source;

// Re-export commonly used types
pub use config::{DecoderKind, ScannerConfig};
pub use decoder::{DecoderBoundary, Detection, FrameLease, ResultSink, RqrrDecoder};
pub use errors::{DecoderError, ScanError, ScanResult, SourceError};
pub use session::{
    CallbackScanner, ScannerBuilder, SessionEngine, SessionSnapshot, SessionState, WatchScanner,
};
pub use source::{FacingMode, FrameGrabber, FrameSource, StillSource};
