// Preview workflow controller
//
// Owns the single request slot. Every status event is emitted with the slot
// locked, which keeps events of one request ordered and guarantees that a
// request that was cancelled or replaced never reports anything afterwards.

use crate::events::{StatusEvent, StatusListener};
use crate::metrics::Metrics;
use crate::models::{
    DeviceInfo, PreviewRequest, PreviewSettings, PreviewStatus, RequestId, ScanSource,
    StartPolicy, WorkflowPhase,
};
use crate::services::{DeviceDirectory, PreviewError, PreviewSink, ScannerError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Tunables for [`PreviewController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerOptions {
    pub start_policy: StartPolicy,

    /// Upper bound for resolve + scan, `None` waits forever
    pub preview_timeout: Option<Duration>,
}

impl From<&PreviewSettings> for ControllerOptions {
    fn from(settings: &PreviewSettings) -> Self {
        Self {
            start_policy: settings.start_policy,
            preview_timeout: settings.preview_timeout(),
        }
    }
}

/// Handle to a started preview
///
/// Dropping the handle does not cancel the preview; use
/// [`PreviewController::cancel_current`] for that.
#[derive(Debug)]
pub struct PreviewHandle {
    id: RequestId,
    task: JoinHandle<PreviewStatus>,
}

impl PreviewHandle {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Wait for the request to reach its terminal status
    pub async fn wait(self) -> PreviewStatus {
        match self.task.await {
            Ok(status) => status,
            Err(e) => {
                tracing::error!("Preview {} supervisor failed: {}", self.id, e);
                PreviewStatus::Failed(e.to_string())
            }
        }
    }
}

/// Coordinates at most one pending preview against a [`DeviceDirectory`].
///
/// # Lifecycle
///
/// `Idle -> Pending -> {Succeeded | Failed | Cancelled} -> Idle`
///
/// [`start_preview`](Self::start_preview) resets the sink, reports the start,
/// then resolves the device and checks its capabilities in a background task:
///
/// 1. the source must be supported, otherwise `UnsupportedSource`
/// 2. preview must be supported for that source, otherwise `PreviewUnsupported`
/// 3. the preview scan runs into a private buffer, which is copied into the
///    sink only when the scan reports success
///
/// Every error is recovered here and reported as exactly one error event.
///
/// # Example
/// ```ignore
/// let broadcaster = StatusBroadcaster::new();
/// let controller = PreviewController::new(
///     Arc::new(SimulatedDirectory::new(config.devices)),
///     Arc::new(broadcaster.clone()),
///     tokio::runtime::Handle::current(),
/// );
///
/// let sink = Arc::new(MemorySink::new());
/// let handle = controller.start_preview("flatbed-0", ScanSource::Flatbed, sink.clone())?;
/// assert_eq!(handle.wait().await, PreviewStatus::Succeeded);
/// ```
pub struct PreviewController {
    inner: Arc<Inner>,
    runtime: tokio::runtime::Handle,
}

struct Inner {
    directory: Arc<dyn DeviceDirectory>,
    listener: Arc<dyn StatusListener>,
    metrics: Arc<Metrics>,
    options: ControllerOptions,
    next_id: AtomicU64,
    slot: Mutex<Slot>,
}

#[derive(Default)]
struct Slot {
    active: Option<ActiveRequest>,
    last: Option<PreviewRequest>,
}

struct ActiveRequest {
    request: PreviewRequest,

    /// Send `true` to stop the supervising task
    cancel_tx: watch::Sender<bool>,
}

impl PreviewController {
    pub fn new(
        directory: Arc<dyn DeviceDirectory>,
        listener: Arc<dyn StatusListener>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self::with_options(
            directory,
            listener,
            Arc::new(Metrics::new()),
            ControllerOptions::default(),
            runtime,
        )
    }

    pub fn with_options(
        directory: Arc<dyn DeviceDirectory>,
        listener: Arc<dyn StatusListener>,
        metrics: Arc<Metrics>,
        options: ControllerOptions,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        tracing::debug!(
            "Preview controller created: policy={:?}, timeout={:?}",
            options.start_policy,
            options.preview_timeout
        );

        Self {
            inner: Arc::new(Inner {
                directory,
                listener,
                metrics,
                options,
                next_id: AtomicU64::new(1),
                slot: Mutex::new(Slot::default()),
            }),
            runtime,
        }
    }

    /// Start a preview scan of `source` on `device_id` into `sink`.
    ///
    /// Returns an error, after reporting it, when the device id is empty or
    /// when a preview is pending under [`StartPolicy::RejectWhilePending`].
    /// Under [`StartPolicy::CancelAndReplace`] the pending preview is
    /// cancelled without further events and this one takes its place.
    pub fn start_preview(
        &self,
        device_id: &str,
        source: ScanSource,
        sink: Arc<dyn PreviewSink>,
    ) -> Result<PreviewHandle, PreviewError> {
        let inner = &self.inner;
        let mut slot = inner.lock_slot();

        if device_id.trim().is_empty() {
            return Err(inner.refuse(PreviewError::InvalidDeviceId));
        }

        if let Some(active) = slot.active.take() {
            match inner.options.start_policy {
                StartPolicy::RejectWhilePending => {
                    tracing::warn!(
                        "Refusing preview of {}: request {} still pending",
                        device_id,
                        active.request.id
                    );
                    slot.active = Some(active);
                    return Err(inner.refuse(PreviewError::Busy));
                }
                StartPolicy::CancelAndReplace => {
                    tracing::info!("Superseding pending preview {}", active.request.id);
                    slot.last = Some(inner.cancel_active(active));
                }
            }
        }

        let id = RequestId(inner.next_id.fetch_add(1, Ordering::Relaxed));
        let request = PreviewRequest::new(id, device_id, source);

        sink.reset();
        inner.emit(StatusEvent::info(
            Some(id),
            format!("Starting scenario of preview scanning from {}.", source),
        ));

        let (cancel_tx, cancel_rx) = watch::channel(false);
        slot.active = Some(ActiveRequest { request, cancel_tx });
        inner.metrics.record_started();
        drop(slot);

        tracing::info!("Preview {} started: device={}, source={}", id, device_id, source);

        let task = self.runtime.spawn(Inner::supervise(
            Arc::clone(inner),
            id,
            device_id.to_string(),
            source,
            sink,
            cancel_rx,
        ));

        Ok(PreviewHandle { id, task })
    }

    /// Cancel the pending preview, if any.
    ///
    /// The request becomes `Cancelled` immediately and reports nothing
    /// further. The running scan is dropped at its next suspension point; the
    /// hardware may still finish the pass. Returns `false` when idle.
    pub fn cancel_current(&self) -> bool {
        let inner = &self.inner;
        let mut slot = inner.lock_slot();

        match slot.active.take() {
            Some(active) => {
                let id = active.request.id;
                let source = active.request.source;
                slot.last = Some(inner.cancel_active(active));
                inner.emit(StatusEvent::info(
                    Some(id),
                    format!("Preview scanning from {} was cancelled.", source),
                ));
                tracing::info!("Preview {} cancelled by request", id);
                true
            }
            None => {
                tracing::debug!("Cancel requested with no pending preview");
                false
            }
        }
    }

    pub fn phase(&self) -> WorkflowPhase {
        match &self.inner.lock_slot().active {
            Some(active) => WorkflowPhase::Pending(active.request.id),
            None => WorkflowPhase::Idle,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.phase() != WorkflowPhase::Idle
    }

    /// The pending request, if any
    pub fn current_request(&self) -> Option<PreviewRequest> {
        self.inner
            .lock_slot()
            .active
            .as_ref()
            .map(|active| active.request.clone())
    }

    /// The most recent request that reached a terminal status
    pub fn last_request(&self) -> Option<PreviewRequest> {
        self.inner.lock_slot().last.clone()
    }

    /// Devices known to the directory
    pub async fn devices(&self) -> Result<Vec<DeviceInfo>, ScannerError> {
        self.inner.directory.enumerate().await
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.inner.metrics)
    }
}

impl Inner {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: StatusEvent) {
        self.metrics.record_status_event();
        self.listener.on_status(event);
    }

    /// Emit an event for `id` only while it is still the pending request
    fn emit_for(&self, id: RequestId, event: StatusEvent) {
        let slot = self.lock_slot();
        if slot.active.as_ref().is_some_and(|a| a.request.id == id) {
            self.emit(event);
        } else {
            tracing::debug!("Suppressed status for stale preview {}: {}", id, event.message);
        }
    }

    /// Report an error for a start that never became a request
    fn refuse(&self, err: PreviewError) -> PreviewError {
        self.metrics.record_rejected();
        self.emit(StatusEvent::error(None, err.to_string()));
        err
    }

    fn cancel_active(&self, active: ActiveRequest) -> PreviewRequest {
        // The supervisor may already be gone if it is completing right now
        let _ = active.cancel_tx.send(true);
        self.metrics.record_cancelled();

        let mut request = active.request;
        request.status = PreviewStatus::Cancelled;
        request
    }

    /// Race the preview sequence against cancellation, then settle the slot
    async fn supervise(
        inner: Arc<Inner>,
        id: RequestId,
        device_id: String,
        source: ScanSource,
        sink: Arc<dyn PreviewSink>,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> PreviewStatus {
        let worker_inner = Arc::clone(&inner);
        let mut worker =
            tokio::spawn(async move { worker_inner.run_sequence(id, &device_id, source).await });
        let abort = worker.abort_handle();

        let outcome = tokio::select! {
            outcome = Self::await_worker(&mut worker, inner.options.preview_timeout) => outcome,
            _ = cancel_rx.changed() => {
                abort.abort();
                tracing::debug!("Preview {} scan task aborted", id);
                return PreviewStatus::Cancelled;
            }
        };

        inner.complete(id, outcome, sink.as_ref())
    }

    async fn await_worker(
        worker: &mut JoinHandle<Result<Vec<u8>, PreviewError>>,
        limit: Option<Duration>,
    ) -> Result<Vec<u8>, PreviewError> {
        let joined = match limit {
            Some(limit) => match tokio::time::timeout(limit, &mut *worker).await {
                Ok(joined) => joined,
                Err(_) => {
                    worker.abort();
                    tracing::warn!("Preview timed out after {:?}", limit);
                    return Err(PreviewError::Timeout(limit));
                }
            },
            None => (&mut *worker).await,
        };

        match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => {
                tracing::error!("Scanner backend panicked during preview");
                Err(PreviewError::Unexpected(
                    "scanner backend panicked during preview".to_string(),
                ))
            }
            Err(e) => Err(PreviewError::Unexpected(e.to_string())),
        }
    }

    /// Resolve, gate on capabilities, scan. Returns the preview bytes.
    async fn run_sequence(
        &self,
        id: RequestId,
        device_id: &str,
        source: ScanSource,
    ) -> Result<Vec<u8>, PreviewError> {
        let scanner = self
            .directory
            .resolve(device_id)
            .await
            .map_err(|e| PreviewError::from_resolution(device_id, e))?;

        if !scanner.is_scan_source_supported(source) {
            return Err(PreviewError::UnsupportedSource(source));
        }
        if !scanner.is_preview_supported(source) {
            return Err(PreviewError::PreviewUnsupported(source));
        }

        self.emit_for(id, StatusEvent::info(Some(id), "Scanning"));

        let mut buffer = Vec::new();
        let started = Instant::now();
        let scanned = scanner.scan_preview(source, &mut buffer).await;
        self.metrics.record_scan_time(started.elapsed());
        let result = scanned.map_err(PreviewError::from_scanner)?;

        tracing::debug!(
            "Preview {} scan returned succeeded={} with {} bytes",
            id,
            result.succeeded,
            buffer.len()
        );

        if result.succeeded {
            Ok(buffer)
        } else {
            Err(PreviewError::OperationFailed(source))
        }
    }

    /// Move `id` to its terminal status and report it, unless it was
    /// cancelled or replaced in the meantime
    fn complete(
        &self,
        id: RequestId,
        outcome: Result<Vec<u8>, PreviewError>,
        sink: &dyn PreviewSink,
    ) -> PreviewStatus {
        let mut slot = self.lock_slot();

        let active = match slot.active.take() {
            Some(active) if active.request.id == id => active,
            other => {
                slot.active = other;
                tracing::debug!("Discarding outcome of stale preview {}", id);
                return PreviewStatus::Cancelled;
            }
        };

        let outcome = outcome.and_then(|bytes| {
            sink.write(&bytes)
                .map_err(|e| PreviewError::Sink(e.to_string()))
        });

        let status = match outcome {
            Ok(()) => {
                self.metrics.record_succeeded();
                self.emit(StatusEvent::info(Some(id), "Preview scanning is complete."));
                tracing::info!("Preview {} succeeded", id);
                PreviewStatus::Succeeded
            }
            Err(err) => {
                sink.reset();
                self.metrics.record_failed();
                let reason = err.to_string();
                self.emit(StatusEvent::error(Some(id), reason.clone()));
                tracing::warn!("Preview {} failed: {}", id, reason);
                PreviewStatus::Failed(reason)
            }
        };

        let mut request = active.request;
        request.status = status.clone();
        slot.last = Some(request);

        status
    }
}
