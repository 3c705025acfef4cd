use crate::models::{DeviceInfo, ScanSource};
use crate::services::ScannerError;
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of a preview scan that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewScanResult {
    pub succeeded: bool,
}

/// A resolved scanning device
///
/// Capability queries are synchronous facts about the device. The scan itself
/// writes image bytes into `buffer` and may be dropped mid-flight when the
/// preview is cancelled.
#[async_trait]
pub trait ImageScanner: Send + Sync {
    fn device_id(&self) -> &str;

    fn is_scan_source_supported(&self, source: ScanSource) -> bool;

    fn is_preview_supported(&self, source: ScanSource) -> bool;

    async fn scan_preview(
        &self,
        source: ScanSource,
        buffer: &mut Vec<u8>,
    ) -> Result<PreviewScanResult, ScannerError>;
}

/// Looks up scanning devices by id
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    async fn resolve(&self, device_id: &str) -> Result<Arc<dyn ImageScanner>, ScannerError>;

    /// List the devices currently attached
    async fn enumerate(&self) -> Result<Vec<DeviceInfo>, ScannerError>;
}
