// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 webcam frame source
//!
//! Captures from `/dev/video*` via memory-mapped streaming and converts
//! the packed 4:2:2 formats webcams deliver (YUYV, UYVY) to RGBA on the
//! CPU. Device selection maps the facing hint onto card names, falling
//! back to the first capture device when nothing matches.

use crate::constants::capture;
use crate::errors::{SourceError, SourceResult};
use crate::source::{FacingMode, FrameSource, RgbaFrame, StreamInfo};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// A capture device found during enumeration
#[derive(Debug, Clone)]
pub struct CaptureDevice {
    /// Device node, e.g. `/dev/video0`
    pub path: String,
    /// Card name reported by the driver
    pub card: String,
    /// Driver name reported by the driver
    pub driver: String,
}

/// Enumerate V4L2 video capture devices
///
/// Scans `/dev/video*`, keeping only nodes that report the video-capture
/// capability (webcams expose metadata nodes under the same prefix).
pub fn enumerate_devices() -> Vec<CaptureDevice> {
    let mut devices = Vec::new();

    let entries = match std::fs::read_dir("/dev") {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Failed to read /dev");
            return devices;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let path_str = path.to_string_lossy().to_string();
        if !path_str.starts_with(capture::DEVICE_PREFIX) {
            continue;
        }

        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            continue;
        }

        debug!(path = %path_str, card = %caps.card, "Found capture device");
        devices.push(CaptureDevice {
            path: path_str,
            card: caps.card,
            driver: caps.driver,
        });
    }

    // read_dir order is arbitrary; sort by the node number
    devices.sort_by_key(|d| {
        d.path
            .strip_prefix(capture::DEVICE_PREFIX)
            .and_then(|n| n.parse::<u32>().ok())
            .unwrap_or(u32::MAX)
    });

    devices
}

/// Pick the device whose card name best matches the facing hint
///
/// Falls back to the first device when no card name matches, mirroring
/// the platform behaviour of a facing constraint that cannot be honoured.
pub fn select_device(devices: &[CaptureDevice], facing: FacingMode) -> Option<&CaptureDevice> {
    let hints = match facing {
        FacingMode::Environment => capture::REAR_FACING_HINTS,
        FacingMode::User => capture::FRONT_FACING_HINTS,
    };

    devices
        .iter()
        .find(|d| {
            let card = d.card.to_lowercase();
            hints.iter().any(|hint| card.contains(hint))
        })
        .or_else(|| devices.first())
}

struct LiveStream {
    stream: Stream<'static>,
    width: u32,
    height: u32,
    stride: u32,
    fourcc: FourCC,
    device: String,
}

/// Webcam frame source over the `v4l` crate
pub struct V4l2Source {
    /// Explicit device path; `None` enumerates and selects by facing
    device_path: Option<String>,
    live: Option<LiveStream>,
}

impl V4l2Source {
    /// Source that enumerates devices and selects by facing hint
    pub fn new() -> Self {
        Self {
            device_path: None,
            live: None,
        }
    }

    /// Source bound to an explicit device node
    pub fn with_device(path: impl Into<String>) -> Self {
        Self {
            device_path: Some(path.into()),
            live: None,
        }
    }

    fn open(&self, facing: FacingMode) -> SourceResult<LiveStream> {
        let path = match &self.device_path {
            Some(path) => path.clone(),
            None => {
                let devices = enumerate_devices();
                let device = select_device(&devices, facing).ok_or(SourceError::NoDevice)?;
                info!(path = %device.path, card = %device.card, facing = %facing, "Selected capture device");
                device.path.clone()
            }
        };

        let dev = Device::with_path(&path).map_err(SourceError::from)?;

        // Webcams deliver packed 4:2:2; try YUYV first, then UYVY
        let requested = Format::new(640, 480, FourCC::new(b"YUYV"));
        let actual = match dev.set_format(&requested) {
            Ok(f) if f.fourcc == FourCC::new(b"YUYV") => f,
            _ => {
                let requested = Format::new(640, 480, FourCC::new(b"UYVY"));
                dev.set_format(&requested).map_err(SourceError::from)?
            }
        };

        if actual.fourcc != FourCC::new(b"YUYV") && actual.fourcc != FourCC::new(b"UYVY") {
            return Err(SourceError::Decode(format!(
                "Device {} negotiated unsupported pixel format {}",
                path, actual.fourcc
            )));
        }

        info!(
            path = %path,
            width = actual.width,
            height = actual.height,
            fourcc = %actual.fourcc,
            "Capture format configured"
        );

        let stream = Stream::with_buffers(&dev, Type::VideoCapture, capture::STREAM_BUFFERS)
            .map_err(SourceError::from)?;

        // 4:2:2 packs two pixels into four bytes
        let stride = if actual.stride > 0 {
            actual.stride
        } else {
            actual.width * 2
        };

        Ok(LiveStream {
            stream,
            width: actual.width,
            height: actual.height,
            stride,
            fourcc: actual.fourcc,
            device: path,
        })
    }
}

impl Default for V4l2Source {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for V4l2Source {
    fn acquire(&mut self, facing: FacingMode) -> SourceResult<StreamInfo> {
        if self.live.is_some() {
            self.release();
        }
        let live = self.open(facing)?;
        let info = StreamInfo {
            width: live.width,
            height: live.height,
            device: live.device.clone(),
        };
        self.live = Some(live);
        Ok(info)
    }

    fn grab(&mut self) -> SourceResult<Option<RgbaFrame>> {
        let Some(live) = self.live.as_mut() else {
            return Ok(None);
        };

        let (buf, _meta) = live.stream.next().map_err(SourceError::from)?;

        let rgba = if live.fourcc == FourCC::new(b"YUYV") {
            yuyv_to_rgba(buf, live.stride as usize, live.width, live.height)
        } else {
            uyvy_to_rgba(buf, live.stride as usize, live.width, live.height)
        };

        Ok(Some(RgbaFrame {
            width: live.width,
            height: live.height,
            stride: live.width * 4,
            data: Arc::from(rgba.into_boxed_slice()),
            captured_at: Instant::now(),
        }))
    }

    fn release(&mut self) {
        if let Some(live) = self.live.take() {
            debug!(device = %live.device, "Releasing capture stream");
            // Dropping the stream stops streaming and unmaps the buffers
            drop(live);
        }
    }
}

#[inline]
fn push_yuv_pixel(rgba: &mut Vec<u8>, y: f32, u: f32, v: f32) {
    // BT.601 YUV to RGB
    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
    rgba.push(r);
    rgba.push(g);
    rgba.push(b);
    rgba.push(255);
}

/// Convert packed YUYV (Y0 U Y1 V) to RGBA, honouring row stride
pub fn yuyv_to_rgba(data: &[u8], stride: usize, width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    // Each 4-byte group carries two pixels; odd widths round up
    let row_bytes = w.div_ceil(2) * 4;
    let mut rgba = Vec::with_capacity(w * h * 4);

    for row in 0..h {
        let start = row * stride;
        let end = (start + row_bytes).min(data.len());
        for chunk in data[start..end].chunks_exact(4) {
            let y0 = chunk[0] as f32;
            let u = chunk[1] as f32 - 128.0;
            let y1 = chunk[2] as f32;
            let v = chunk[3] as f32 - 128.0;

            push_yuv_pixel(&mut rgba, y0, u, v);
            if rgba.len() < (row * w + w) * 4 {
                push_yuv_pixel(&mut rgba, y1, u, v);
            }
        }
    }

    rgba
}

/// Convert packed UYVY (U Y0 V Y1) to RGBA, honouring row stride
pub fn uyvy_to_rgba(data: &[u8], stride: usize, width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let row_bytes = w.div_ceil(2) * 4;
    let mut rgba = Vec::with_capacity(w * h * 4);

    for row in 0..h {
        let start = row * stride;
        let end = (start + row_bytes).min(data.len());
        for chunk in data[start..end].chunks_exact(4) {
            let u = chunk[0] as f32 - 128.0;
            let y0 = chunk[1] as f32;
            let v = chunk[2] as f32 - 128.0;
            let y1 = chunk[3] as f32;

            push_yuv_pixel(&mut rgba, y0, u, v);
            if rgba.len() < (row * w + w) * 4 {
                push_yuv_pixel(&mut rgba, y1, u, v);
            }
        }
    }

    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_white_and_black() {
        // Two pixels sharing chroma: Y=255 then Y=0, U=V=128 (no colour)
        let yuyv = [255u8, 128, 0, 128];
        let rgba = yuyv_to_rgba(&yuyv, 4, 2, 1);

        assert_eq!(rgba.len(), 8);
        assert!(rgba[0] > 250 && rgba[1] > 250 && rgba[2] > 250);
        assert_eq!(rgba[3], 255);
        assert!(rgba[4] < 5 && rgba[5] < 5 && rgba[6] < 5);
        assert_eq!(rgba[7], 255);
    }

    #[test]
    fn test_uyvy_matches_yuyv_reordering() {
        let yuyv = [200u8, 100, 50, 160];
        let uyvy = [100u8, 200, 160, 50];
        assert_eq!(
            yuyv_to_rgba(&yuyv, 4, 2, 1),
            uyvy_to_rgba(&uyvy, 4, 2, 1)
        );
    }

    #[test]
    fn test_stride_padding_skipped() {
        // 2x2 frame with 2 padding bytes per row (stride 6)
        let yuyv = [
            255u8, 128, 255, 128, 9, 9, // row 0: two white pixels + padding
            0, 128, 0, 128, 9, 9, // row 1: two black pixels + padding
        ];
        let rgba = yuyv_to_rgba(&yuyv, 6, 2, 2);

        assert_eq!(rgba.len(), 16);
        assert!(rgba[0] > 250, "Row 0 should be white");
        assert!(rgba[8] < 5, "Row 1 should be black");
    }

    #[test]
    fn test_odd_width_drops_partial_pair() {
        // Width 1 still emits exactly one pixel from the shared pair
        let yuyv = [255u8, 128, 0, 128];
        let rgba = yuyv_to_rgba(&yuyv, 4, 1, 1);
        assert_eq!(rgba.len(), 4);
    }

    fn device(path: &str, card: &str) -> CaptureDevice {
        CaptureDevice {
            path: path.to_string(),
            card: card.to_string(),
            driver: "uvcvideo".to_string(),
        }
    }

    #[test]
    fn test_select_prefers_matching_facing() {
        let devices = vec![
            device("/dev/video0", "Integrated Camera"),
            device("/dev/video2", "USB Rear Camera"),
        ];
        let selected = select_device(&devices, FacingMode::Environment).unwrap();
        assert_eq!(selected.path, "/dev/video2");

        let selected = select_device(&devices, FacingMode::User).unwrap();
        assert_eq!(selected.path, "/dev/video0");
    }

    #[test]
    fn test_select_falls_back_to_first_device() {
        let devices = vec![
            device("/dev/video0", "Generic Webcam"),
            device("/dev/video1", "Another Webcam"),
        ];
        let selected = select_device(&devices, FacingMode::Environment).unwrap();
        assert_eq!(selected.path, "/dev/video0");
    }

    #[test]
    fn test_select_empty_list() {
        assert!(select_device(&[], FacingMode::Environment).is_none());
    }
}
