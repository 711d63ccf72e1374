// SPDX-License-Identifier: MPL-2.0

//! Frame acquisition abstraction
//!
//! Sources hand the session RGBA frames; the grabber folds each one down
//! to the tightly-packed luma plane the decoder consumes, reusing one
//! scratch allocation across ticks.

pub mod gray;
pub mod still;

#[cfg(feature = "v4l")]
pub mod v4l2;

pub use still::StillSource;

use crate::errors::SourceResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Which camera to prefer when a device offers several
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, the scanning default
    #[default]
    Environment,
    /// Front camera
    User,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::User => write!(f, "user"),
        }
    }
}

/// A single RGBA frame from a source
#[derive(Debug, Clone)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    /// Bytes per row, may include padding beyond `width * 4`
    pub stride: u32,
    pub data: Arc<[u8]>,
    /// When the frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

/// Details of an acquired stream, for logging and display
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Human-readable origin (device path, card name, file path)
    pub device: String,
}

/// Provider of frames for a scanning session
///
/// `grab` returning `Ok(None)` means no new frame was ready; the caller
/// skips that tick. `release` must tolerate being called without a
/// matching `acquire`, and a released source may be acquired again.
pub trait FrameSource: Send {
    /// Open the stream, preferring the given facing
    fn acquire(&mut self, facing: FacingMode) -> SourceResult<StreamInfo>;

    /// Fetch the most recent frame, if one is ready
    fn grab(&mut self) -> SourceResult<Option<RgbaFrame>>;

    /// Close the stream and release the device
    fn release(&mut self);
}

/// Borrowed view of one converted luma plane
#[derive(Debug)]
pub struct GrayFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub captured_at: Instant,
    pub pixels: &'a [u8],
}

/// Pulls frames from a source and converts them to luma
///
/// Owns the conversion scratch buffer so steady-state ticks allocate
/// nothing.
pub struct FrameGrabber {
    source: Box<dyn FrameSource>,
    gray: Vec<u8>,
}

impl FrameGrabber {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            source,
            gray: Vec::new(),
        }
    }

    pub fn acquire(&mut self, facing: FacingMode) -> SourceResult<StreamInfo> {
        self.source.acquire(facing)
    }

    /// Grab the next frame and convert it, or `None` if no frame is ready
    pub fn grab_gray(&mut self) -> SourceResult<Option<GrayFrame<'_>>> {
        let Some(frame) = self.source.grab()? else {
            return Ok(None);
        };
        gray::rgba_to_luma_into(
            &frame.data,
            frame.stride as usize,
            frame.width,
            frame.height,
            &mut self.gray,
        )?;
        Ok(Some(GrayFrame {
            width: frame.width,
            height: frame.height,
            captured_at: frame.captured_at,
            pixels: &self.gray,
        }))
    }

    /// Close the stream and hand the source back
    pub fn into_source(self) -> Box<dyn FrameSource> {
        self.source
    }
}
