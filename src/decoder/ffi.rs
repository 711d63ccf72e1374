// SPDX-License-Identifier: GPL-3.0-only

//! Bindings to the prebuilt native decoder library
//!
//! The library owns the pixel memory: every frame is copied into a buffer
//! it allocates, and decoded symbols come back through a single
//! process-wide callback registered once at startup. Per-boundary
//! delivery goes through [`registry`], since the callback carries no
//! user-data pointer.
//!
//! # Safety
//!
//! Raw pointers never leave this module. Handles carry the pointer as an
//! integer; a size table validates every write before it touches foreign
//! memory, and the lease guard upstream guarantees each allocation is
//! freed exactly once.

use crate::decoder::{BufferHandle, DecoderBoundary, Detection, ResultSink, registry};
use crate::errors::{DecoderError, DecoderResult};
use libc::{c_char, c_int};
use std::collections::HashMap;
use std::ffi::CStr;
use std::sync::{Mutex, OnceLock};
use tracing::{debug, warn};
use uuid::Uuid;

type NativeResultCallback = extern "C" fn(symbology: *const c_char, text: *const c_char);

unsafe extern "C" {
    fn create_buffer(width: c_int, height: c_int) -> *mut u8;
    fn scan_image(buf: *mut u8, width: c_int, height: c_int);
    fn destroy_buffer(buf: *mut u8);
    fn scan_set_result_callback(cb: NativeResultCallback);
}

/// Shared callback the library reports through
///
/// Runs on whichever thread called `scan_image`. Routes into the
/// registry, which knows which boundary scanned last.
extern "C" fn result_trampoline(symbology: *const c_char, text: *const c_char) {
    let Some(symbology) = cstr_to_string(symbology) else {
        warn!("Native decoder reported a result with no symbology");
        return;
    };
    let Some(text) = cstr_to_string(text) else {
        warn!(symbology = %symbology, "Native decoder reported a result with no text");
        return;
    };
    registry::dispatch(Detection::new(symbology, text));
}

fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let s = unsafe { CStr::from_ptr(ptr) };
    Some(s.to_string_lossy().into_owned())
}

static CALLBACK_INSTALLED: OnceLock<()> = OnceLock::new();

fn ensure_callback_installed() {
    CALLBACK_INSTALLED.get_or_init(|| {
        unsafe { scan_set_result_callback(result_trampoline) };
        debug!("Installed native decoder result callback");
    });
}

/// Boundary over the linked native decoder library
pub struct NativeDecoder {
    id: Uuid,
    /// Live allocations: pointer (as integer) to byte length
    allocs: Mutex<HashMap<usize, usize>>,
}

impl NativeDecoder {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            allocs: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for NativeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderBoundary for NativeDecoder {
    fn init(&self) -> DecoderResult<()> {
        ensure_callback_installed();
        Ok(())
    }

    fn create_buffer(&self, width: u32, height: u32) -> DecoderResult<BufferHandle> {
        if width == 0 || height == 0 {
            return Err(DecoderError::InvalidDimensions { width, height });
        }
        let ptr = unsafe { create_buffer(width as c_int, height as c_int) };
        if ptr.is_null() {
            return Err(DecoderError::AllocationFailed);
        }
        let len = width as usize * height as usize;
        self.allocs.lock().unwrap().insert(ptr as usize, len);
        Ok(BufferHandle(ptr as usize))
    }

    fn write(&self, handle: BufferHandle, pixels: &[u8]) -> DecoderResult<()> {
        let allocs = self.allocs.lock().unwrap();
        let len = *allocs
            .get(&handle.0)
            .ok_or(DecoderError::AllocationFailed)?;
        if pixels.len() != len {
            return Err(DecoderError::SizeMismatch {
                expected: len,
                got: pixels.len(),
            });
        }
        unsafe {
            std::ptr::copy_nonoverlapping(pixels.as_ptr(), handle.0 as *mut u8, pixels.len());
        }
        Ok(())
    }

    fn scan(&self, handle: BufferHandle, width: u32, height: u32) -> DecoderResult<()> {
        {
            let allocs = self.allocs.lock().unwrap();
            if !allocs.contains_key(&handle.0) {
                return Err(DecoderError::AllocationFailed);
            }
        }
        // Results fired during this call route back to our sink
        registry::mark_active(self.id);
        unsafe {
            scan_image(handle.0 as *mut u8, width as c_int, height as c_int);
        }
        Ok(())
    }

    fn destroy_buffer(&self, handle: BufferHandle) {
        if self.allocs.lock().unwrap().remove(&handle.0).is_none() {
            debug!(handle = handle.0, "Ignoring destroy of unknown buffer");
            return;
        }
        unsafe {
            destroy_buffer(handle.0 as *mut u8);
        }
    }

    fn set_sink(&self, sink: Option<ResultSink>) {
        match sink {
            Some(sink) => registry::install(self.id, sink),
            None => registry::uninstall(self.id),
        }
    }
}

impl Drop for NativeDecoder {
    fn drop(&mut self) {
        registry::uninstall(self.id);
        // Free anything a panicking caller left behind
        let allocs: Vec<usize> = self.allocs.lock().unwrap().drain().map(|(p, _)| p).collect();
        for ptr in allocs {
            unsafe {
                destroy_buffer(ptr as *mut u8);
            }
        }
    }
}
