// SPDX-License-Identifier: GPL-3.0-only

//! RGBA to grayscale conversion for decoder submission
//!
//! The decoder boundary consumes single-channel luma planes, one byte per
//! pixel, tightly packed in row-major order. Conversion uses fixed-point
//! BT.601 luma weights:
//!
//! ```text
//! luma = (r*66 + g*129 + b*25 + 4096) >> 8
//! ```
//!
//! The weights are video-range: all-black input maps to 16 and all-white
//! to 235. Alpha is ignored.

use crate::errors::{SourceError, SourceResult};

/// Convert one RGBA pixel to its luma value
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 66 + g as u32 * 129 + b as u32 * 25 + 4096) >> 8) as u8
}

/// Convert an RGBA plane to luma, writing into a reusable scratch buffer
///
/// `stride` is the number of bytes per source row and may exceed
/// `width * 4` when rows carry padding; padding bytes are skipped.
/// On success `out` holds exactly `width * height` bytes.
pub fn rgba_to_luma_into(
    rgba: &[u8],
    stride: usize,
    width: u32,
    height: u32,
    out: &mut Vec<u8>,
) -> SourceResult<()> {
    let w = width as usize;
    let h = height as usize;
    let row_bytes = w * 4;

    if stride < row_bytes {
        return Err(SourceError::InvalidFrame(format!(
            "stride {} shorter than row of {} RGBA pixels",
            stride, w
        )));
    }
    // The final row does not need to carry stride padding
    let needed = if h == 0 {
        0
    } else {
        stride * (h - 1) + row_bytes
    };
    if rgba.len() < needed {
        return Err(SourceError::InvalidFrame(format!(
            "frame of {} bytes too small for {}x{} at stride {}",
            rgba.len(),
            width,
            height,
            stride
        )));
    }

    out.clear();
    out.reserve(w * h);

    for y in 0..h {
        let row = &rgba[y * stride..y * stride + row_bytes];
        for px in row.chunks_exact(4) {
            out.push(luma(px[0], px[1], px[2]));
        }
    }

    Ok(())
}

/// Convert a tightly packed RGBA plane to a freshly allocated luma plane
pub fn rgba_to_luma(rgba: &[u8], width: u32, height: u32) -> SourceResult<Vec<u8>> {
    let mut out = Vec::new();
    rgba_to_luma_into(rgba, width as usize * 4, width, height, &mut out)?;
    Ok(out)
}


#[cfg(test)]
mod props {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // The fixed-point weights sum to 220, so output always stays in
        // the video range regardless of input.
        #[test]
        fn luma_stays_in_video_range(r: u8, g: u8, b: u8) {
            let y = luma(r, g, b);
            prop_assert!((16..=235).contains(&y));
        }

        #[test]
        fn luma_monotone_per_channel(r: u8, g: u8, b: u8) {
            prop_assert!(luma(r.saturating_add(1), g, b) >= luma(r, g, b));
            prop_assert!(luma(r, g.saturating_add(1), b) >= luma(r, g, b));
            prop_assert!(luma(r, g, b.saturating_add(1)) >= luma(r, g, b));
        }

        #[test]
        fn output_length_matches_geometry(
            width in 1u32..32,
            height in 1u32..32,
        ) {
            let rgba = vec![128u8; (width * height * 4) as usize];
            let gray = rgba_to_luma(&rgba, width, height).unwrap();
            prop_assert_eq!(gray.len(), (width * height) as usize);
        }
    }
}
