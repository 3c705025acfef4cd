//! Data models for the preview workflow.
//!
//! - [`PreviewRequest`] / [`PreviewStatus`]: one preview attempt and its lifecycle
//! - [`ScanSource`]: where on the device the scan is taken from
//! - [`WorkflowPhase`] / [`StartPolicy`]: controller phase and double-start policy
//! - [`UserConfig`]: settings and simulated devices loaded from `ScanPreview Config.yaml`

pub mod config;
pub mod preview;

pub use config::{MAX_PREVIEW_DIMENSION, PreviewSettings, SimulatedDeviceConfig, UserConfig};
pub use preview::{
    DeviceInfo, PreviewRequest, PreviewStatus, RequestId, ScanSource, StartPolicy, WorkflowPhase,
};
