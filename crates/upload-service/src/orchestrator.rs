//! Upload orchestrator.
//!
//! [`UploadService`] is a cloneable handle to a worker task that owns every
//! piece of mutable lifecycle state (slot, throttle, presenter). Commands from
//! handles and reports from the running task are funnelled into that worker
//! and applied one at a time, so nothing here needs a lock.

use std::sync::Arc;

use courier_protocol::{StartRequest, StatusEvent, TransferKind};
use courier_transfer::{ProgressThrottle, ThrottleDecision};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::channel::StatusChannel;
use crate::config::ServiceConfig;
use crate::error::Rejected;
use crate::presenter::{LifecyclePresenter, PresentationState};
use crate::slot::{ActiveTask, CancelOutcome, TaskSlot};
use crate::surface::{PresentationSurface, ResourceLock};
use crate::task::{ReportKind, TaskContext, TaskFactory, TaskReport};

/// Command queue depth between handles and the worker.
const COMMAND_BUFFER_SIZE: usize = 32;

/// An accepted start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Started {
    pub upload_id: String,
    pub kind: TransferKind,
}

enum Command {
    Start {
        request: StartRequest,
        reply: oneshot::Sender<Result<Started, Rejected>>,
    },
    Cancel {
        reply: oneshot::Sender<CancelOutcome>,
    },
}

/// Handle to a running upload service.
#[derive(Clone)]
pub struct UploadService {
    commands: mpsc::Sender<Command>,
    channel: StatusChannel,
    state: watch::Receiver<Option<PresentationState>>,
    shutdown: CancellationToken,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl UploadService {
    /// Spawns the service worker on the current tokio runtime.
    pub fn spawn(
        config: ServiceConfig,
        factory: Arc<dyn TaskFactory>,
        surface: Arc<dyn PresentationSurface>,
        lock: Arc<dyn ResourceLock>,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(None);
        let channel = StatusChannel::new(config.event_capacity);
        let shutdown = CancellationToken::new();

        let worker = Worker {
            factory,
            slot: TaskSlot::new(),
            throttle: ProgressThrottle::new(config.progress_interval()),
            presenter: LifecyclePresenter::new(config.notification.clone(), surface, lock),
            channel: channel.clone(),
            reports_tx,
            state_tx,
            next_cycle: 0,
        };
        let handle = tokio::spawn(worker.run(commands_rx, reports_rx, shutdown.clone()));

        Self {
            commands: commands_tx,
            channel,
            state: state_rx,
            shutdown,
            worker: Arc::new(Mutex::new(Some(handle))),
        }
    }

    /// Starts an upload unless one is already active.
    ///
    /// Returns as soon as the task is spawned; progress and the result
    /// arrive on [`subscribe`](Self::subscribe).
    pub async fn start(&self, request: StartRequest) -> Result<Started, Rejected> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Start { request, reply })
            .await
            .map_err(|_| Rejected::ServiceStopped)?;
        rx.await.map_err(|_| Rejected::ServiceStopped)?
    }

    /// Requests cancellation of the active upload, if any.
    pub async fn cancel(&self) -> CancelOutcome {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Cancel { reply }).await.is_err() {
            return CancelOutcome::NoOp;
        }
        rx.await.unwrap_or(CancelOutcome::NoOp)
    }

    /// Subscribes to status events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.channel.subscribe()
    }

    /// Current presentation state; `None` before the first upload.
    pub fn state(&self) -> Option<PresentationState> {
        *self.state.borrow()
    }

    /// A receiver that observes every presentation state change.
    pub fn watch_state(&self) -> watch::Receiver<Option<PresentationState>> {
        self.state.clone()
    }

    /// Stops accepting requests, cancels the active upload and waits for
    /// its terminal report before the worker exits.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "upload service worker ended abnormally");
            }
        }
    }
}

struct Worker {
    factory: Arc<dyn TaskFactory>,
    slot: TaskSlot,
    throttle: ProgressThrottle,
    presenter: LifecyclePresenter,
    channel: StatusChannel,
    reports_tx: mpsc::UnboundedSender<TaskReport>,
    state_tx: watch::Sender<Option<PresentationState>>,
    next_cycle: u64,
}

impl Worker {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut reports: mpsc::UnboundedReceiver<TaskReport>,
        shutdown: CancellationToken,
    ) {
        let mut draining = false;
        debug!("upload service worker started");

        loop {
            if draining && !self.slot.is_active() {
                break;
            }

            tokio::select! {
                biased;
                Some(report) = reports.recv() => self.handle_report(report),
                _ = shutdown.cancelled(), if !draining => {
                    draining = true;
                    self.slot.cancel_active();
                    info!("upload service shutting down");
                }
                cmd = commands.recv(), if !draining => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        draining = true;
                        self.slot.cancel_active();
                        debug!("all service handles dropped");
                    }
                },
            }
        }

        debug!("upload service worker stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Start { request, reply } => {
                let result = self.start(request);
                let _ = reply.send(result);
            }
            Command::Cancel { reply } => {
                let outcome = self.slot.cancel_active();
                debug!(?outcome, "cancel request handled");
                let _ = reply.send(outcome);
            }
        }
    }

    fn start(&mut self, request: StartRequest) -> Result<Started, Rejected> {
        if let Some(active) = self.slot.active_id() {
            warn!(
                upload_id = %request.upload_id,
                active = %active,
                "rejecting start request: an upload is already active"
            );
            return Err(Rejected::AlreadyActive {
                active: active.to_string(),
            });
        }

        let kind = request.kind().map_err(|_| {
            warn!(
                upload_id = %request.upload_id,
                kind = %request.transfer_kind,
                "rejecting start request: unknown transfer kind"
            );
            Rejected::UnknownTransferKind(request.transfer_kind.clone())
        })?;

        let task = self.factory.create(kind, &request).map_err(|e| {
            warn!(upload_id = %request.upload_id, error = %e, "rejecting start request");
            Rejected::from(e)
        })?;

        self.next_cycle += 1;
        let cycle = self.next_cycle;
        let upload_id = request.upload_id;
        let cancel = CancellationToken::new();

        self.slot
            .submit(ActiveTask::new(upload_id.clone(), cycle, cancel.clone()))
            .map_err(|busy| Rejected::AlreadyActive {
                active: busy.active_id,
            })?;

        self.throttle.reset();
        self.presenter.begin(&upload_id);
        self.publish_state();

        let ctx = TaskContext::new(upload_id.clone(), cycle, cancel, self.reports_tx.clone());
        tokio::spawn(task.run(ctx));

        info!(upload_id = %upload_id, %kind, "upload started");
        Ok(Started { upload_id, kind })
    }

    fn handle_report(&mut self, report: TaskReport) {
        let Some(active) = self.slot.active() else {
            debug!(upload_id = %report.upload_id, "discarding report, no active upload");
            return;
        };
        if active.cycle() != report.cycle {
            debug!(
                upload_id = %report.upload_id,
                cycle = report.cycle,
                "discarding report from a finished upload"
            );
            return;
        }
        let started_at = active.started_at();

        match report.kind {
            ReportKind::Progress { sample, at } => {
                let now_ms = at.saturating_duration_since(started_at).as_millis() as u64;
                let Some(percentage) = sample.percentage() else {
                    warn!(
                        upload_id = %report.upload_id,
                        uploaded = sample.uploaded_bytes,
                        "dropping progress sample with zero total bytes"
                    );
                    return;
                };
                match self.throttle.observe(sample, now_ms) {
                    ThrottleDecision::Emit(sample) => {
                        trace!(upload_id = %report.upload_id, percentage, now_ms, "progress");
                        self.dispatch(StatusEvent::InProgress {
                            upload_id: report.upload_id,
                            percentage,
                            uploaded_bytes: sample.uploaded_bytes,
                            total_bytes: sample.total_bytes,
                        });
                    }
                    ThrottleDecision::Suppress => {}
                }
            }
            ReportKind::Completed {
                response_code,
                response_message,
            } => {
                info!(upload_id = %report.upload_id, response_code, "upload completed");
                self.dispatch(StatusEvent::Completed {
                    upload_id: report.upload_id,
                    response_code,
                    response_message: response_message.unwrap_or_default(),
                });
                self.slot.clear_active(report.cycle);
            }
            ReportKind::Failed(cause) => {
                warn!(upload_id = %report.upload_id, cause = %cause, "upload failed");
                self.dispatch(StatusEvent::Error {
                    upload_id: report.upload_id,
                    cause,
                });
                self.slot.clear_active(report.cycle);
            }
        }
    }

    /// State first, then the broadcast, then the presenter's side effects:
    /// subscribers see a terminal event before the lock is released.
    fn dispatch(&mut self, event: StatusEvent) {
        self.state_tx.send_replace(self.presenter.next_state(&event));
        self.channel.emit(event.clone());
        self.presenter.on_event(&event);
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.presenter.state());
    }
}
