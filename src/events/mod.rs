// Status relay module
//
// Status events are the only output of the preview workflow besides the sink.
// The controller hands them to a StatusListener; StatusBroadcaster fans them
// out to any number of subscribers over a tokio broadcast channel.

use crate::models::RequestId;
use std::fmt;
use tokio::sync::broadcast;

/// Severity of a status notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// Immutable notification emitted by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    /// Request the event describes, `None` for refusals that never created one
    pub request: Option<RequestId>,
    pub severity: Severity,
    pub message: String,
}

impl StatusEvent {
    pub fn info(request: Option<RequestId>, message: impl Into<String>) -> Self {
        Self {
            request,
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn error(request: Option<RequestId>, message: impl Into<String>) -> Self {
        Self {
            request,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Info => write!(f, "{}", self.message),
            Severity::Error => write!(f, "error: {}", self.message),
        }
    }
}

/// Receiver of status events.
///
/// Called with the controller's request slot locked, so implementations must
/// return quickly and must not call back into the controller.
#[cfg_attr(test, mockall::automock)]
pub trait StatusListener: Send + Sync {
    fn on_status(&self, event: StatusEvent);
}

impl<F> StatusListener for F
where
    F: Fn(StatusEvent) + Send + Sync,
{
    fn on_status(&self, event: StatusEvent) {
        self(event)
    }
}

/// Broadcast-backed listener
///
/// Multiple subscribers can listen for status events. Sending never blocks;
/// with no subscribers the event is dropped.
#[derive(Clone)]
pub struct StatusBroadcaster {
    status_tx: broadcast::Sender<StatusEvent>,
}

impl StatusBroadcaster {
    /// Create a broadcaster with a buffer of 100 events
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (status_tx, _) = broadcast::channel(capacity);
        Self { status_tx }
    }

    /// Subscribe to all future status events
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.status_tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.status_tx.receiver_count()
    }
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusListener for StatusBroadcaster {
    fn on_status(&self, event: StatusEvent) {
        match event.severity {
            Severity::Info => tracing::info!(request = ?event.request, "{}", event.message),
            Severity::Error => tracing::warn!(request = ?event.request, "{}", event.message),
        }

        // Ignore send errors - it's OK if no one is listening
        let _ = self.status_tx.send(event);
    }
}
