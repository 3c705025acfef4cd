use crate::models::ScanSource;
use std::time::Duration;
use thiserror::Error;

/// Faults reported by a scanner backend
#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("Scanner {0} not found")]
    DeviceNotFound(String),

    #[error("Scanner {0} was disconnected")]
    Disconnected(String),

    #[error("Scanner backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors recovered at the preview controller boundary
///
/// Each one is turned into exactly one error status event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreviewError {
    #[error("No scanner device id was given")]
    InvalidDeviceId,

    #[error("A preview scan is already in progress")]
    Busy,

    #[error("Unable to open scanner {device_id}: {reason}")]
    DeviceResolution { device_id: String, reason: String },

    #[error("The selected scanner does not report to be equipped with a {0}.")]
    UnsupportedSource(ScanSource),

    #[error("The selected scanner does not support preview from {0}.")]
    PreviewUnsupported(ScanSource),

    #[error("Failed to preview from {0}.")]
    OperationFailed(ScanSource),

    #[error("Preview timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to write preview image: {0}")]
    Sink(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PreviewError {
    /// Classify a backend fault raised while resolving `device_id`
    pub fn from_resolution(device_id: &str, err: ScannerError) -> Self {
        PreviewError::DeviceResolution {
            device_id: device_id.to_string(),
            reason: err.to_string(),
        }
    }

    /// Classify a backend fault raised anywhere after resolution
    pub fn from_scanner(err: ScannerError) -> Self {
        PreviewError::Unexpected(err.to_string())
    }
}
