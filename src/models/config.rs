use crate::models::{ScanSource, StartPolicy};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// User configuration from ScanPreview Config.yaml
///
/// Holds the controller settings and the devices served by the simulated
/// scanner backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub settings: PreviewSettings,

    #[serde(default = "default_devices")]
    pub devices: IndexMap<String, SimulatedDeviceConfig>,
}

/// Largest simulated preview side, in pixels
pub const MAX_PREVIEW_DIMENSION: u32 = 4096;

impl UserConfig {
    /// Clamp every simulated preview size into `1..=MAX_PREVIEW_DIMENSION`.
    ///
    /// Returns the ids of the devices that were changed.
    pub fn clamp_preview_dimensions(&mut self) -> Vec<String> {
        let mut clamped = Vec::new();
        for (id, device) in &mut self.devices {
            let (width, height) = device.preview_size();
            if (width, height) != (device.preview_width, device.preview_height) {
                device.preview_width = width;
                device.preview_height = height;
                clamped.push(id.clone());
            }
        }
        clamped
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            settings: PreviewSettings::default(),
            devices: default_devices(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewSettings {
    /// Device previewed when none is given on the command line
    #[serde(default = "default_device_id")]
    pub default_device: String,

    #[serde(default = "default_source")]
    pub source: ScanSource,

    #[serde(default)]
    pub start_policy: StartPolicy,

    /// Seconds before a preview is abandoned, 0 disables the limit
    #[serde(default = "default_preview_timeout")]
    pub preview_timeout_secs: u64,

    #[serde(default = "default_output_path")]
    pub output_path: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default)]
    pub debug_mode: bool,
}

impl PreviewSettings {
    pub fn preview_timeout(&self) -> Option<Duration> {
        (self.preview_timeout_secs > 0).then(|| Duration::from_secs(self.preview_timeout_secs))
    }
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            default_device: default_device_id(),
            source: default_source(),
            start_policy: StartPolicy::default(),
            preview_timeout_secs: default_preview_timeout(),
            output_path: default_output_path(),
            log_dir: default_log_dir(),
            debug_mode: false,
        }
    }
}

/// A device exposed by the simulated backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedDeviceConfig {
    pub name: String,

    /// Sources the device is equipped with
    #[serde(default)]
    pub sources: Vec<ScanSource>,

    /// Sources that can produce a preview scan
    #[serde(default)]
    pub preview_sources: Vec<ScanSource>,

    #[serde(default = "default_preview_width")]
    pub preview_width: u32,

    #[serde(default = "default_preview_height")]
    pub preview_height: u32,

    /// Artificial scan latency in milliseconds
    #[serde(default)]
    pub latency_ms: u64,

    /// Complete the scan but report it as unsuccessful
    #[serde(default)]
    pub report_failure: bool,
}

impl SimulatedDeviceConfig {
    /// Preview width and height limited to `1..=MAX_PREVIEW_DIMENSION`
    pub fn preview_size(&self) -> (u32, u32) {
        (
            self.preview_width.clamp(1, MAX_PREVIEW_DIMENSION),
            self.preview_height.clamp(1, MAX_PREVIEW_DIMENSION),
        )
    }

    pub fn flatbed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: vec![ScanSource::Flatbed],
            preview_sources: vec![ScanSource::Flatbed],
            preview_width: default_preview_width(),
            preview_height: default_preview_height(),
            latency_ms: 0,
            report_failure: false,
        }
    }
}

fn default_device_id() -> String {
    "flatbed-0".to_string()
}

fn default_source() -> ScanSource {
    ScanSource::Flatbed
}

fn default_preview_timeout() -> u64 {
    60
}

fn default_output_path() -> String {
    "preview.png".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_preview_width() -> u32 {
    170
}

fn default_preview_height() -> u32 {
    220
}

fn default_devices() -> IndexMap<String, SimulatedDeviceConfig> {
    let mut devices = IndexMap::new();
    devices.insert(
        "flatbed-0".to_string(),
        SimulatedDeviceConfig {
            latency_ms: 250,
            ..SimulatedDeviceConfig::flatbed("Simulated Flatbed Scanner")
        },
    );
    devices.insert(
        "feeder-0".to_string(),
        SimulatedDeviceConfig {
            name: "Simulated Sheet Feeder".to_string(),
            sources: vec![ScanSource::Feeder],
            preview_sources: Vec::new(),
            preview_width: default_preview_width(),
            preview_height: default_preview_height(),
            latency_ms: 250,
            report_failure: false,
        },
    );
    devices
}
