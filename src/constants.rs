// SPDX-License-Identifier: GPL-3.0-only

//! Crate-wide constants

use std::time::Duration;

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Default interval between scan ticks
    ///
    /// One frame is captured, converted, and submitted to the decoder per
    /// tick. Missed beats are skipped, never queued.
    pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(250);

    /// Lower bound enforced on configured sample intervals
    pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);
}

/// Scan loop constants
pub mod scan {
    /// Thread name for session scan loops
    pub const LOOP_NAME: &str = "scan-loop";

    /// Symbology name reported for QR detections from the built-in decoder
    pub const SYMBOLOGY_QR: &str = "QR-Code";
}

/// Configuration storage constants
pub mod config {
    /// Directory name under the user config dir
    pub const APP_DIR: &str = "barcode-scanner";

    /// Config file name inside [`APP_DIR`]
    pub const FILE_NAME: &str = "config.json";
}

/// Capture device constants
pub mod capture {
    /// Device path prefix scanned for cameras
    pub const DEVICE_PREFIX: &str = "/dev/video";

    /// Number of memory-mapped buffers for V4L2 streams
    pub const STREAM_BUFFERS: u32 = 4;

    /// Card-name fragments that indicate a rear-facing camera
    pub const REAR_FACING_HINTS: &[&str] = &["back", "rear", "world", "environment"];

    /// Card-name fragments that indicate a front-facing camera
    pub const FRONT_FACING_HINTS: &[&str] = &["front", "user", "integrated", "selfie"];
}

/// Supported file formats for the still-image frame source
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
