// SPDX-License-Identifier: MPL-2.0

//! Decoder boundary abstraction
//!
//! Recognition is delegated entirely to an external decoder. This module
//! models the narrow contract the scanner holds with it: allocate a pixel
//! buffer, copy luma bytes into it, run a scan over it, free it, and
//! receive decoded symbols back through an asynchronous result sink.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   Session engine    │
//! └──────────┬──────────┘
//!            │ one FrameLease per tick
//!            ▼
//! ┌─────────────────────┐
//! │ DecoderBoundary     │  ← create / write / scan / destroy
//! └──────────┬──────────┘
//!            │
//!      ┌─────┴──────┐
//!      ▼            ▼
//! ┌─────────┐ ┌───────────┐
//! │  rqrr   │ │  native   │  ← in-process crate / prebuilt library
//! └─────────┘ └───────────┘
//! ```
//!
//! Detections travel the other way: the boundary invokes the installed
//! [`ResultSink`], which the session engine wires to its own state.

pub mod registry;
pub mod rqrr;

#[cfg(feature = "native")]
pub mod ffi;

pub use rqrr::RqrrDecoder;

use crate::errors::{DecoderError, DecoderResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A decoded symbol reported by the decoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// Symbology name as reported by the decoder (e.g. "QR-Code")
    pub symbology: String,
    /// Decoded payload text
    pub text: String,
}

impl Detection {
    pub fn new(symbology: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            symbology: symbology.into(),
            text: text.into(),
        }
    }
}

impl std::fmt::Display for Detection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.symbology, self.text)
    }
}

/// Callback receiving detections from the boundary
///
/// Invoked on whichever thread the decoder reports from; for the bundled
/// backends that is the scan-loop thread, during the scan call itself.
pub type ResultSink = Arc<dyn Fn(Detection) + Send + Sync>;

/// Opaque handle to one foreign pixel buffer
///
/// Only meaningful to the boundary that issued it. Handles are never
/// reused across ticks; the [`FrameLease`] guard owns each one for
/// exactly one decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) usize);

impl BufferHandle {
    /// Wrap a raw backend identifier
    pub fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// The raw backend identifier
    pub fn raw(&self) -> usize {
        self.0
    }
}

/// Contract with the external decoder
///
/// Implementations own the foreign memory behind [`BufferHandle`]s and
/// report decoded symbols through the installed sink. `scan` is
/// synchronous from the caller's side; result delivery may happen during
/// the call or later, depending on the backend.
pub trait DecoderBoundary: Send + Sync {
    /// One-shot backend initialization; memoized by the implementation
    fn init(&self) -> DecoderResult<()>;

    /// Allocate a buffer for a `width` x `height` single-channel image
    fn create_buffer(&self, width: u32, height: u32) -> DecoderResult<BufferHandle>;

    /// Copy luma bytes into the buffer verbatim
    fn write(&self, handle: BufferHandle, pixels: &[u8]) -> DecoderResult<()>;

    /// Run a decode pass over the buffer
    fn scan(&self, handle: BufferHandle, width: u32, height: u32) -> DecoderResult<()>;

    /// Release the buffer
    ///
    /// Must tolerate being called exactly once per handle; the lease
    /// guard guarantees it is.
    fn destroy_buffer(&self, handle: BufferHandle);

    /// Install or remove the result sink for this boundary
    fn set_sink(&self, sink: Option<ResultSink>);
}

/// RAII lease over one foreign buffer
///
/// Acquiring the lease allocates the buffer; dropping it releases the
/// buffer on every exit path, including scan failures. No buffer
/// outlives its tick.
pub struct FrameLease<'a> {
    boundary: &'a dyn DecoderBoundary,
    handle: Option<BufferHandle>,
    width: u32,
    height: u32,
}

impl<'a> FrameLease<'a> {
    /// Allocate a buffer sized `width` x `height` from the boundary
    pub fn acquire(
        boundary: &'a dyn DecoderBoundary,
        width: u32,
        height: u32,
    ) -> DecoderResult<Self> {
        if width == 0 || height == 0 {
            return Err(DecoderError::InvalidDimensions { width, height });
        }
        let handle = boundary.create_buffer(width, height)?;
        Ok(Self {
            boundary,
            handle: Some(handle),
            width,
            height,
        })
    }

    /// Copy a luma plane into the leased buffer
    ///
    /// The payload length must be exactly `width * height` bytes.
    pub fn write(&mut self, pixels: &[u8]) -> DecoderResult<()> {
        let expected = self.width as usize * self.height as usize;
        if pixels.len() != expected {
            return Err(DecoderError::SizeMismatch {
                expected,
                got: pixels.len(),
            });
        }
        match self.handle {
            Some(handle) => self.boundary.write(handle, pixels),
            None => Err(DecoderError::AllocationFailed),
        }
    }

    /// Run a decode pass over the leased buffer
    pub fn scan(&mut self) -> DecoderResult<()> {
        match self.handle {
            Some(handle) => self.boundary.scan(handle, self.width, self.height),
            None => Err(DecoderError::AllocationFailed),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl std::fmt::Debug for FrameLease<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLease")
            .field("handle", &self.handle)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Drop for FrameLease<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.boundary.destroy_buffer(handle);
        }
    }
}
