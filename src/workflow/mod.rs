//! Preview workflow orchestration.
//!
//! [`PreviewController`] is the only stateful component of the crate: it owns
//! the single pending-request slot, sequences device resolution, capability
//! gating and the preview scan, and relays each transition to a
//! [`StatusListener`](crate::events::StatusListener).

pub mod controller;

pub use controller::{ControllerOptions, PreviewController, PreviewHandle};
