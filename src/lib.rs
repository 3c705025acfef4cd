// ScanPreview - preview workflow controller for document scanners
//
// This is the library crate containing the controller, the scanner boundary
// and the data model. The binary crate (main.rs) runs a preview against the
// simulated backend from the command line.

pub mod config;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod workflow;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use events::{Severity, StatusBroadcaster, StatusEvent, StatusListener};
pub use models::{PreviewRequest, PreviewStatus, RequestId, ScanSource, StartPolicy, UserConfig};
pub use services::{MemorySink, PreviewError, PreviewSink};
pub use workflow::{ControllerOptions, PreviewController, PreviewHandle};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
