//! Scanner test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use scanpreview::models::{DeviceInfo, ScanSource};
use scanpreview::services::{DeviceDirectory, ImageScanner, PreviewScanResult, ScannerError};
use scanpreview::{PreviewSink, StatusBroadcaster, StatusEvent};
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Notify, broadcast};

/// What a fake scanner does when asked for a preview
#[derive(Clone)]
pub enum ScanBehavior {
    Succeed(Vec<u8>),
    /// Writes partial bytes, then reports `succeeded = false`
    ReportFailure,
    Error(String),
    /// Device drops off the bus mid-scan
    Disconnect,
    Panic,
    /// Never completes
    Hang,
}

/// Call counters shared between a fake device and the test
#[derive(Default)]
pub struct Probe {
    pub resolve_calls: AtomicUsize,
    pub capability_queries: AtomicUsize,
    pub scan_calls: AtomicUsize,
}

impl Probe {
    pub fn resolves(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn capability_queries(&self) -> usize {
        self.capability_queries.load(Ordering::SeqCst)
    }

    pub fn scans(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct FakeDevice {
    pub supports_source: bool,
    pub supports_preview: bool,
    pub behavior: ScanBehavior,
    /// Resolution blocks on this until notified
    pub resolve_gate: Option<Arc<Notify>>,
    pub probe: Arc<Probe>,
}

impl FakeDevice {
    pub fn capable(behavior: ScanBehavior) -> Self {
        Self {
            supports_source: true,
            supports_preview: true,
            behavior,
            resolve_gate: None,
            probe: Arc::new(Probe::default()),
        }
    }

    pub fn without_source() -> Self {
        Self {
            supports_source: false,
            supports_preview: false,
            ..Self::capable(ScanBehavior::Succeed(vec![1]))
        }
    }

    pub fn without_preview() -> Self {
        Self {
            supports_preview: false,
            ..Self::capable(ScanBehavior::Succeed(vec![1]))
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.resolve_gate = Some(gate);
        self
    }
}

struct FakeScanner {
    id: String,
    device: FakeDevice,
}

#[async_trait]
impl ImageScanner for FakeScanner {
    fn device_id(&self) -> &str {
        &self.id
    }

    fn is_scan_source_supported(&self, _source: ScanSource) -> bool {
        self.device.probe.capability_queries.fetch_add(1, Ordering::SeqCst);
        self.device.supports_source
    }

    fn is_preview_supported(&self, _source: ScanSource) -> bool {
        self.device.probe.capability_queries.fetch_add(1, Ordering::SeqCst);
        self.device.supports_preview
    }

    async fn scan_preview(
        &self,
        _source: ScanSource,
        buffer: &mut Vec<u8>,
    ) -> Result<PreviewScanResult, ScannerError> {
        self.device.probe.scan_calls.fetch_add(1, Ordering::SeqCst);

        match &self.device.behavior {
            ScanBehavior::Succeed(bytes) => {
                buffer.extend_from_slice(bytes);
                Ok(PreviewScanResult { succeeded: true })
            }
            ScanBehavior::ReportFailure => {
                buffer.extend_from_slice(b"partial");
                Ok(PreviewScanResult { succeeded: false })
            }
            ScanBehavior::Error(message) => Err(ScannerError::Backend(message.clone())),
            ScanBehavior::Disconnect => Err(ScannerError::Disconnected(self.id.clone())),
            ScanBehavior::Panic => panic!("scanner firmware crashed"),
            ScanBehavior::Hang => std::future::pending().await,
        }
    }
}

/// Directory over a fixed set of fake devices
#[derive(Default)]
pub struct FakeDirectory {
    devices: HashMap<String, FakeDevice>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: &str, device: FakeDevice) -> Self {
        self.devices.insert(id.to_string(), device);
        self
    }
}

#[async_trait]
impl DeviceDirectory for FakeDirectory {
    async fn resolve(&self, device_id: &str) -> Result<Arc<dyn ImageScanner>, ScannerError> {
        let device = self
            .devices
            .get(device_id)
            .ok_or_else(|| ScannerError::DeviceNotFound(device_id.to_string()))?
            .clone();
        device.probe.resolve_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &device.resolve_gate {
            gate.notified().await;
        }

        Ok(Arc::new(FakeScanner {
            id: device_id.to_string(),
            device,
        }))
    }

    async fn enumerate(&self) -> Result<Vec<DeviceInfo>, ScannerError> {
        Ok(self
            .devices
            .keys()
            .map(|id| DeviceInfo {
                id: id.clone(),
                name: format!("Fake {}", id),
            })
            .collect())
    }
}

/// Sink whose writes always fail, counting resets
#[derive(Default)]
pub struct FailingSink {
    pub resets: AtomicUsize,
    pub writes: AtomicUsize,
}

impl FailingSink {
    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl PreviewSink for FailingSink {
    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn write(&self, _bytes: &[u8]) -> io::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::other("disk full"))
    }
}

/// Everything received so far, without waiting
pub fn drain(rx: &mut broadcast::Receiver<StatusEvent>) -> Vec<StatusEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn listener() -> (StatusBroadcaster, broadcast::Receiver<StatusEvent>) {
    let broadcaster = StatusBroadcaster::new();
    let rx = broadcaster.subscribe();
    (broadcaster, rx)
}
