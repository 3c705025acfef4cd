//! Simulated scanner backend.
//!
//! Serves the devices listed in the user configuration. Each scanner renders
//! a grayscale PNG page after its configured latency, so the whole preview
//! workflow can run without scanner hardware.

use crate::models::{DeviceInfo, ScanSource, SimulatedDeviceConfig};
use crate::services::{DeviceDirectory, ImageScanner, PreviewScanResult, ScannerError};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;

/// Directory of simulated scanners keyed by device id
#[derive(Debug, Clone, Default)]
pub struct SimulatedDirectory {
    devices: IndexMap<String, SimulatedDeviceConfig>,
}

impl SimulatedDirectory {
    pub fn new(devices: IndexMap<String, SimulatedDeviceConfig>) -> Self {
        Self { devices }
    }

    pub fn with_device(mut self, id: impl Into<String>, device: SimulatedDeviceConfig) -> Self {
        self.devices.insert(id.into(), device);
        self
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[async_trait]
impl DeviceDirectory for SimulatedDirectory {
    async fn resolve(&self, device_id: &str) -> Result<Arc<dyn ImageScanner>, ScannerError> {
        let config = self
            .devices
            .get(device_id)
            .ok_or_else(|| ScannerError::DeviceNotFound(device_id.to_string()))?;

        tracing::debug!("Resolved simulated scanner {} ({})", device_id, config.name);
        Ok(Arc::new(SimulatedScanner::new(device_id, config.clone())))
    }

    async fn enumerate(&self) -> Result<Vec<DeviceInfo>, ScannerError> {
        Ok(self
            .devices
            .iter()
            .map(|(id, device)| DeviceInfo {
                id: id.clone(),
                name: device.name.clone(),
            })
            .collect())
    }
}

/// A single simulated scanner
#[derive(Debug, Clone)]
pub struct SimulatedScanner {
    device_id: String,
    config: SimulatedDeviceConfig,
}

impl SimulatedScanner {
    pub fn new(device_id: impl Into<String>, config: SimulatedDeviceConfig) -> Self {
        Self {
            device_id: device_id.into(),
            config,
        }
    }

    /// Render the preview page as an 8-bit grayscale PNG
    ///
    /// White paper with a light gradient and a darker block where a document
    /// would sit on the glass.
    pub fn render_preview(&self) -> Result<Vec<u8>, ScannerError> {
        let (width, height) = self.config.preview_size();
        let (w, h) = (u64::from(width), u64::from(height));

        let mut pixels = Vec::with_capacity((w * h) as usize);
        for y in 0..h {
            for x in 0..w {
                let in_document = x > w / 8 && x < w * 7 / 8 && y > h / 8 && y < h / 2;
                let shade = 255 - ((x + y) * 40 / (w + h)) as u8;
                pixels.push(if in_document { shade / 2 } else { shade });
            }
        }

        let mut png_bytes = Vec::new();
        let mut encoder = png::Encoder::new(&mut png_bytes, width, height);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| ScannerError::Backend(format!("PNG header: {}", e)))?;
        writer
            .write_image_data(&pixels)
            .map_err(|e| ScannerError::Backend(format!("PNG data: {}", e)))?;
        writer
            .finish()
            .map_err(|e| ScannerError::Backend(format!("PNG finish: {}", e)))?;

        Ok(png_bytes)
    }
}

#[async_trait]
impl ImageScanner for SimulatedScanner {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn is_scan_source_supported(&self, source: ScanSource) -> bool {
        self.config.sources.contains(&source)
    }

    fn is_preview_supported(&self, source: ScanSource) -> bool {
        self.is_scan_source_supported(source) && self.config.preview_sources.contains(&source)
    }

    async fn scan_preview(
        &self,
        source: ScanSource,
        buffer: &mut Vec<u8>,
    ) -> Result<PreviewScanResult, ScannerError> {
        if !self.is_preview_supported(source) {
            return Err(ScannerError::Backend(format!(
                "{} cannot preview from {}",
                self.device_id, source
            )));
        }

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        let image = self.render_preview()?;

        if self.config.report_failure {
            // A failed scan still leaves a partial page behind
            buffer.extend_from_slice(&image[..image.len() / 2]);
            tracing::debug!("Simulated scanner {} reporting failure", self.device_id);
            return Ok(PreviewScanResult { succeeded: false });
        }

        buffer.extend_from_slice(&image);
        tracing::debug!(
            "Simulated scanner {} produced {} byte preview",
            self.device_id,
            image.len()
        );
        Ok(PreviewScanResult { succeeded: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn directory() -> SimulatedDirectory {
        SimulatedDirectory::default()
            .with_device("flatbed", SimulatedDeviceConfig::flatbed("Flatbed"))
            .with_device(
                "feeder",
                SimulatedDeviceConfig {
                    sources: vec![ScanSource::Feeder],
                    preview_sources: vec![ScanSource::Feeder],
                    ..SimulatedDeviceConfig::flatbed("Feeder")
                },
            )
    }

    #[tokio::test]
    async fn test_resolve_unknown_device() {
        let result = directory().resolve("missing").await;
        assert!(matches!(result, Err(ScannerError::DeviceNotFound(ref id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_enumerate_keeps_config_order() {
        let devices = directory().enumerate().await.unwrap();
        let ids: Vec<_> = devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["flatbed", "feeder"]);
    }

    #[tokio::test]
    async fn test_capabilities() {
        let scanner = directory().resolve("feeder").await.unwrap();
        assert_eq!(scanner.device_id(), "feeder");
        assert!(scanner.is_scan_source_supported(ScanSource::Feeder));
        assert!(!scanner.is_scan_source_supported(ScanSource::Flatbed));
        assert!(!scanner.is_preview_supported(ScanSource::Flatbed));
    }

    #[tokio::test]
    async fn test_preview_is_valid_png() {
        let scanner = directory().resolve("flatbed").await.unwrap();
        let mut buffer = Vec::new();

        let result = scanner
            .scan_preview(ScanSource::Flatbed, &mut buffer)
            .await
            .unwrap();
        assert!(result.succeeded);

        let decoder = png::Decoder::new(Cursor::new(buffer));
        let reader = decoder.read_info().unwrap();
        assert_eq!(reader.info().width, 170);
        assert_eq!(reader.info().height, 220);
    }

    #[test]
    fn test_render_clamps_oversized_dimensions() {
        let scanner = SimulatedScanner::new(
            "wide",
            SimulatedDeviceConfig {
                preview_width: u32::MAX,
                preview_height: 2,
                ..SimulatedDeviceConfig::flatbed("Wide")
            },
        );

        let png_bytes = scanner.render_preview().unwrap();
        let reader = png::Decoder::new(Cursor::new(png_bytes)).read_info().unwrap();
        assert_eq!(reader.info().width, crate::models::MAX_PREVIEW_DIMENSION);
        assert_eq!(reader.info().height, 2);
    }

    #[tokio::test]
    async fn test_reported_failure_leaves_partial_bytes() {
        let scanner = SimulatedScanner::new(
            "broken",
            SimulatedDeviceConfig {
                report_failure: true,
                ..SimulatedDeviceConfig::flatbed("Broken")
            },
        );
        let mut buffer = Vec::new();

        let result = scanner
            .scan_preview(ScanSource::Flatbed, &mut buffer)
            .await
            .unwrap();

        assert!(!result.succeeded);
        assert!(!buffer.is_empty());
    }
}
