use serde::{Deserialize, Serialize};
use std::fmt;

/// Scan source on a device.
///
/// Mirrors the platform's source set. Only `Flatbed` matters for the preview
/// demo, but capability queries are answered per source for all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanSource {
    Default,
    Flatbed,
    Feeder,
    AutoConfigured,
}

impl ScanSource {
    pub const ALL: [ScanSource; 4] = [
        ScanSource::Default,
        ScanSource::Flatbed,
        ScanSource::Feeder,
        ScanSource::AutoConfigured,
    ];

    /// Parse a source name as typed on the command line or in config
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "default" => Some(Self::Default),
            "flatbed" => Some(Self::Flatbed),
            "feeder" => Some(Self::Feeder),
            "auto_configured" | "autoconfigured" | "auto" => Some(Self::AutoConfigured),
            _ => None,
        }
    }
}

impl fmt::Display for ScanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanSource::Default => "Default source",
            ScanSource::Flatbed => "Flatbed",
            ScanSource::Feeder => "Feeder",
            ScanSource::AutoConfigured => "Auto-configured source",
        };
        f.write_str(name)
    }
}

/// Identifier of a preview request, unique per controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle status of a preview request
///
/// A request starts `Pending` and moves exactly once to one of the
/// terminal variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewStatus {
    Pending,
    Succeeded,
    Failed(String),
    Cancelled,
}

impl PreviewStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PreviewStatus::Pending)
    }
}

/// One preview attempt against a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    pub id: RequestId,
    pub device_id: String,
    pub source: ScanSource,
    pub status: PreviewStatus,
}

impl PreviewRequest {
    pub fn new(id: RequestId, device_id: impl Into<String>, source: ScanSource) -> Self {
        Self {
            id,
            device_id: device_id.into(),
            source,
            status: PreviewStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PreviewStatus::Pending
    }
}

/// Observable phase of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    Idle,
    Pending(RequestId),
}

/// What `start_preview` does when a request is already pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// Cancel the pending request silently and start the new one
    #[default]
    CancelAndReplace,
    /// Refuse the new request and leave the pending one running
    RejectWhilePending,
}

/// Device as reported by enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan_source() {
        assert_eq!(ScanSource::parse("flatbed"), Some(ScanSource::Flatbed));
        assert_eq!(ScanSource::parse(" Feeder "), Some(ScanSource::Feeder));
        assert_eq!(ScanSource::parse("auto-configured"), Some(ScanSource::AutoConfigured));
        assert_eq!(ScanSource::parse("drum"), None);
    }

    #[test]
    fn test_new_request_is_pending() {
        let request = PreviewRequest::new(RequestId(1), "scanner-1", ScanSource::Flatbed);
        assert!(request.is_pending());
        assert!(!request.status.is_terminal());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(PreviewStatus::Succeeded.is_terminal());
        assert!(PreviewStatus::Cancelled.is_terminal());
        assert!(PreviewStatus::Failed("boom".to_string()).is_terminal());
    }

    #[test]
    fn test_start_policy_serde_names() {
        let policy: StartPolicy = serde_yaml_ng::from_str("reject_while_pending").unwrap();
        assert_eq!(policy, StartPolicy::RejectWhilePending);
        assert_eq!(StartPolicy::default(), StartPolicy::CancelAndReplace);
    }
}
