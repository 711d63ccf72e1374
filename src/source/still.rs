// SPDX-License-Identifier: GPL-3.0-only

//! Still-image frame source
//!
//! Loads one image file and replays it every tick. Used by the `scan`
//! subcommand and handy for tests: a session over a still behaves
//! exactly like a live one, detection loop included.

use crate::constants::file_formats;
use crate::errors::{SourceError, SourceResult};
use crate::source::{FacingMode, FrameSource, RgbaFrame, StreamInfo};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub struct StillSource {
    path: PathBuf,
    frame: Option<RgbaFrame>,
}

impl StillSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frame: None,
        }
    }

    fn load(path: &Path) -> SourceResult<RgbaFrame> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if !file_formats::is_image_extension(extension) {
            return Err(SourceError::Decode(format!(
                "Unsupported image format: '{}'",
                extension
            )));
        }

        info!(path = %path.display(), "Loading image file");
        let img = image::open(path).map_err(|e| {
            SourceError::Decode(format!("Failed to load image '{}': {}", path.display(), e))
        })?;
        let rgba = img.to_rgba8();
        let width = rgba.width();
        let height = rgba.height();
        let data: Vec<u8> = rgba.into_raw();
        info!(width, height, "Image loaded successfully");

        Ok(RgbaFrame {
            data: Arc::from(data.into_boxed_slice()),
            width,
            height,
            stride: width * 4, // RGBA = 4 bytes per pixel
            captured_at: Instant::now(),
        })
    }
}

impl FrameSource for StillSource {
    fn acquire(&mut self, _facing: FacingMode) -> SourceResult<StreamInfo> {
        let frame = Self::load(&self.path)?;
        let info = StreamInfo {
            width: frame.width,
            height: frame.height,
            device: self.path.display().to_string(),
        };
        self.frame = Some(frame);
        Ok(info)
    }

    fn grab(&mut self) -> SourceResult<Option<RgbaFrame>> {
        Ok(self.frame.clone())
    }

    fn release(&mut self) {
        self.frame = None;
    }
}
