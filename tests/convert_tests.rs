// SPDX-License-Identifier: MPL-2.0

//! Integration tests for grayscale conversion

use barcode_scanner::errors::{SourceError, SourceResult};
use barcode_scanner::source::gray::{luma, rgba_to_luma, rgba_to_luma_into};
use barcode_scanner::source::{RgbaFrame, StreamInfo};
use barcode_scanner::{FacingMode, FrameGrabber, FrameSource};
use std::sync::Arc;
use std::time::Instant;

#[test]
fn test_video_range_endpoints() {
    // The fixed-point weights map to video range, not full range
    assert_eq!(luma(255, 255, 255), 235, "White maps to 235");
    assert_eq!(luma(0, 0, 0), 16, "Black maps to 16");
}

#[test]
fn test_channel_weights() {
    // Green dominates, then red, then blue
    assert_eq!(luma(255, 0, 0), 81);
    assert_eq!(luma(0, 255, 0), 144);
    assert_eq!(luma(0, 0, 255), 40);
}

#[test]
fn test_output_stays_in_video_range() {
    for value in [0u8, 1, 16, 64, 128, 200, 235, 254, 255] {
        let y = luma(value, value, value);
        assert!(
            (16..=235).contains(&y),
            "luma({0}, {0}, {0}) = {1} out of range",
            value,
            y
        );
    }
}

#[test]
fn test_alpha_is_ignored() {
    // Same pixel, opposite alpha
    let opaque = rgba_to_luma(&[10, 200, 30, 255], 1, 1).unwrap();
    let transparent = rgba_to_luma(&[10, 200, 30, 0], 1, 1).unwrap();
    assert_eq!(opaque, transparent);
}

#[test]
fn test_two_pixel_plane() {
    // One white pixel, one black pixel
    let rgba = [255, 255, 255, 255, 0, 0, 0, 255];
    let plane = rgba_to_luma(&rgba, 2, 1).unwrap();
    assert_eq!(plane, vec![235, 16]);
}

#[test]
fn test_stride_padding_is_skipped() {
    // 2x2 image with 4 bytes of padding per row; padding is 0xAA noise
    let mut rgba = Vec::new();
    for _ in 0..2 {
        rgba.extend_from_slice(&[255, 255, 255, 255, 0, 0, 0, 255]);
        rgba.extend_from_slice(&[0xAA; 4]);
    }
    let mut out = Vec::new();
    rgba_to_luma_into(&rgba, 12, 2, 2, &mut out).unwrap();
    assert_eq!(out, vec![235, 16, 235, 16]);
}

#[test]
fn test_truncated_input_is_rejected() {
    let err = rgba_to_luma(&[255, 255, 255], 1, 1).unwrap_err();
    match err {
        SourceError::InvalidFrame(_) => {}
        other => panic!("Expected InvalidFrame, got {:?}", other),
    }
}

/// Source handing out one fixed frame forever
struct FixedSource {
    frame: RgbaFrame,
}

impl FrameSource for FixedSource {
    fn acquire(&mut self, _facing: FacingMode) -> SourceResult<StreamInfo> {
        Ok(StreamInfo {
            width: self.frame.width,
            height: self.frame.height,
            device: "fixed".to_string(),
        })
    }

    fn grab(&mut self) -> SourceResult<Option<RgbaFrame>> {
        Ok(Some(self.frame.clone()))
    }

    fn release(&mut self) {}
}

#[test]
fn test_grabber_converts_through_the_pipeline() {
    let frame = RgbaFrame {
        width: 2,
        height: 2,
        stride: 8,
        data: Arc::from(vec![
            255, 255, 255, 255, 0, 0, 0, 255, // white, black
            0, 255, 0, 255, 255, 0, 0, 255, // green, red
        ]),
        captured_at: Instant::now(),
    };
    let mut grabber = FrameGrabber::new(Box::new(FixedSource { frame }));
    grabber.acquire(FacingMode::Environment).unwrap();

    let gray = grabber.grab_gray().unwrap().expect("Expected a frame");
    assert_eq!(gray.width, 2);
    assert_eq!(gray.height, 2);
    assert_eq!(gray.pixels, &[235, 16, 144, 81]);
}
