//! Services module - the scanner boundary of the preview workflow.
//!
//! Everything the controller needs from the outside world is reached through
//! the narrow contracts defined here. None of them depend on the controller,
//! so backends can be swapped for real drivers or test doubles.
//!
//! # Components
//!
//! - [`DeviceDirectory`]: resolves a device id to an [`ImageScanner`] and enumerates devices
//! - [`ImageScanner`]: per-source capability queries and the async preview scan
//! - [`PreviewSink`] / [`MemorySink`]: destination for the preview image bytes
//! - [`ScannerError`]: faults raised by backends
//! - [`PreviewError`]: the taxonomy the controller recovers from and reports
//! - [`SimulatedDirectory`]: configurable in-process backend rendering PNG previews
//!
//! # Usage Example
//!
//! ```ignore
//! use scanpreview::services::{DeviceDirectory, SimulatedDirectory};
//!
//! let directory = SimulatedDirectory::new(user_config.devices.clone());
//! for device in directory.enumerate().await? {
//!     println!("{} - {}", device.id, device.name);
//! }
//! ```

pub mod error;
pub mod scanner;
pub mod simulated;
pub mod sink;

pub use error::{PreviewError, ScannerError};
pub use scanner::{DeviceDirectory, ImageScanner, PreviewScanResult};
pub use simulated::{SimulatedDirectory, SimulatedScanner};
pub use sink::{MemorySink, PreviewSink};
