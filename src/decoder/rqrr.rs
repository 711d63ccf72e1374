// SPDX-License-Identifier: GPL-3.0-only

//! In-process QR decoder backed by the `rqrr` crate
//!
//! Implements the same buffer-oriented contract as the native library so
//! sessions run unchanged without any prebuilt decoder present. Buffers
//! live in a slab keyed by handle; a scan hands the bytes to `rqrr` and
//! reports every successfully decoded grid through the sink.

use crate::constants::scan;
use crate::decoder::{BufferHandle, DecoderBoundary, Detection, ResultSink};
use crate::errors::{DecoderError, DecoderResult};
use rqrr::PreparedImage;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

struct Buffer {
    data: Vec<u8>,
}

#[derive(Default)]
struct Slab {
    buffers: HashMap<usize, Buffer>,
    next_id: usize,
}

/// Pure-Rust decoder boundary, the default backend
#[derive(Default)]
pub struct RqrrDecoder {
    slab: Mutex<Slab>,
    sink: Mutex<Option<ResultSink>>,
}

impl RqrrDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecoderBoundary for RqrrDecoder {
    fn init(&self) -> DecoderResult<()> {
        // Nothing to bring up; the crate is linked in
        Ok(())
    }

    fn create_buffer(&self, width: u32, height: u32) -> DecoderResult<BufferHandle> {
        if width == 0 || height == 0 {
            return Err(DecoderError::InvalidDimensions { width, height });
        }
        let len = width as usize * height as usize;
        let mut slab = self.slab.lock().unwrap();
        slab.next_id = slab.next_id.wrapping_add(1);
        let id = slab.next_id;
        slab.buffers.insert(id, Buffer { data: vec![0; len] });
        Ok(BufferHandle(id))
    }

    fn write(&self, handle: BufferHandle, pixels: &[u8]) -> DecoderResult<()> {
        let mut slab = self.slab.lock().unwrap();
        let buffer = slab
            .buffers
            .get_mut(&handle.0)
            .ok_or(DecoderError::AllocationFailed)?;
        if pixels.len() != buffer.data.len() {
            return Err(DecoderError::SizeMismatch {
                expected: buffer.data.len(),
                got: pixels.len(),
            });
        }
        buffer.data.copy_from_slice(pixels);
        Ok(())
    }

    fn scan(&self, handle: BufferHandle, width: u32, height: u32) -> DecoderResult<()> {
        // Copy the bytes out so the slab lock is not held across the
        // decode or the sink invocation
        let data = {
            let slab = self.slab.lock().unwrap();
            let buffer = slab
                .buffers
                .get(&handle.0)
                .ok_or(DecoderError::AllocationFailed)?;
            buffer.data.clone()
        };
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(DecoderError::SizeMismatch {
                expected,
                got: data.len(),
            });
        }

        let img = image::GrayImage::from_raw(width, height, data).ok_or_else(|| {
            DecoderError::ScanFailed("buffer does not match image dimensions".to_string())
        })?;
        let mut prepared = PreparedImage::prepare(img);
        let grids = prepared.detect_grids();
        debug!(grids = grids.len(), "Decode pass complete");

        let sink = self.sink.lock().unwrap().clone();
        for grid in grids {
            match grid.decode() {
                Ok((_, content)) => {
                    if let Some(sink) = &sink {
                        sink(Detection::new(scan::SYMBOLOGY_QR, content));
                    }
                }
                Err(e) => {
                    debug!("Grid decode failed: {:?}", e);
                }
            }
        }
        Ok(())
    }

    fn destroy_buffer(&self, handle: BufferHandle) {
        let mut slab = self.slab.lock().unwrap();
        if slab.buffers.remove(&handle.0).is_none() {
            debug!(handle = handle.0, "Ignoring destroy of unknown buffer");
        }
    }

    fn set_sink(&self, sink: Option<ResultSink>) {
        *self.sink.lock().unwrap() = sink;
    }
}
