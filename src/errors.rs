// SPDX-License-Identifier: MPL-2.0

//! Error types for the scanner crate

use std::fmt;

/// Result type alias using ScanError
pub type ScanResult<T> = Result<T, ScanError>;

/// Result type alias for frame source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type alias for decoder boundary operations
pub type DecoderResult<T> = Result<T, DecoderError>;

/// Top-level error type for scanner sessions
#[derive(Debug, Clone)]
pub enum ScanError {
    /// Frame source errors (camera access, capture)
    Source(SourceError),
    /// Decoder boundary errors (init, allocation, scan)
    Decoder(DecoderError),
    /// Configuration errors
    Config(String),
    /// Generic error with message
    Other(String),
}

/// Frame-source specific errors
#[derive(Debug, Clone)]
pub enum SourceError {
    /// Camera access was denied
    AccessDenied(String),
    /// No capture device found
    NoDevice,
    /// Device is busy or in use
    Busy,
    /// Stream disconnected during capture
    Disconnected,
    /// Frame data did not match the negotiated geometry
    InvalidFrame(String),
    /// Failed to decode a source file
    Decode(String),
    /// I/O error while opening or reading the device
    Io(String),
}

/// Decoder boundary errors
#[derive(Debug, Clone)]
pub enum DecoderError {
    /// Decoder backend is not available in this build
    Unavailable(String),
    /// Decoder initialization failed
    InitFailed(String),
    /// Foreign buffer allocation failed
    AllocationFailed,
    /// Pixel payload did not match the leased buffer size
    SizeMismatch { expected: usize, got: usize },
    /// Requested buffer dimensions are not scannable
    InvalidDimensions { width: u32, height: u32 },
    /// Scan invocation failed
    ScanFailed(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Source(e) => write!(f, "Source error: {}", e),
            ScanError::Decoder(e) => write!(f, "Decoder error: {}", e),
            ScanError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ScanError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::AccessDenied(msg) => write!(f, "Camera access denied: {}", msg),
            SourceError::NoDevice => write!(f, "No capture device found"),
            SourceError::Busy => write!(f, "Capture device is busy"),
            SourceError::Disconnected => write!(f, "Stream disconnected"),
            SourceError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            SourceError::Decode(msg) => write!(f, "Decode failed: {}", msg),
            SourceError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for DecoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderError::Unavailable(msg) => write!(f, "Decoder unavailable: {}", msg),
            DecoderError::InitFailed(msg) => write!(f, "Initialization failed: {}", msg),
            DecoderError::AllocationFailed => write!(f, "Buffer allocation failed"),
            DecoderError::SizeMismatch { expected, got } => {
                write!(f, "Payload size mismatch: expected {}, got {}", expected, got)
            }
            DecoderError::InvalidDimensions { width, height } => {
                write!(f, "Invalid buffer dimensions: {}x{}", width, height)
            }
            DecoderError::ScanFailed(msg) => write!(f, "Scan failed: {}", msg),
        }
    }
}

impl std::error::Error for ScanError {}
impl std::error::Error for SourceError {}
impl std::error::Error for DecoderError {}

// Conversions from sub-errors to ScanError
impl From<SourceError> for ScanError {
    fn from(err: SourceError) -> Self {
        ScanError::Source(err)
    }
}

impl From<DecoderError> for ScanError {
    fn from(err: DecoderError) -> Self {
        ScanError::Decoder(err)
    }
}

impl From<String> for ScanError {
    fn from(msg: String) -> Self {
        ScanError::Other(msg)
    }
}

impl From<&str> for ScanError {
    fn from(msg: &str) -> Self {
        ScanError::Other(msg.to_string())
    }
}

// Conversions for I/O errors
impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => SourceError::AccessDenied(err.to_string()),
            std::io::ErrorKind::NotFound => SourceError::NoDevice,
            _ => SourceError::Io(err.to_string()),
        }
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::Source(SourceError::from(err))
    }
}
