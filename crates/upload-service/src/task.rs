//! The contract between the service and the code that performs a transfer.
//!
//! A task receives a [`TaskContext`] and reports through it:
//! any number of [`progress`](TaskContext::progress) calls, then exactly one
//! of [`completed`](TaskContext::completed) or [`failed`](TaskContext::failed).
//! Both terminal methods consume the context, so a second terminal report
//! does not compile. A context dropped without a terminal report (early
//! return, panic, aborted future) reports an `Abandoned` error, which keeps
//! the resource lock from leaking.

use std::future::Future;
use std::pin::Pin;

use courier_protocol::{ErrorDescriptor, ErrorKind, StartRequest, TransferKind};
use courier_transfer::ProgressSample;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::warn;

use crate::error::TaskError;

/// A boxed future returned by [`UploadTask::run`].
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A unit of work that moves one upload to its destination.
pub trait UploadTask: Send + 'static {
    /// Performs the transfer, reporting through `ctx`.
    ///
    /// The future runs on its own tokio task. Cancellation is cooperative:
    /// watch [`TaskContext::cancelled`] and report `failed` when stopping.
    fn run(self: Box<Self>, ctx: TaskContext) -> TaskFuture;
}

/// Builds tasks for accepted start requests.
///
/// Called on the service worker; must not block.
pub trait TaskFactory: Send + Sync + 'static {
    fn create(
        &self,
        kind: TransferKind,
        request: &StartRequest,
    ) -> Result<Box<dyn UploadTask>, TaskError>;
}

/// A report travelling from a task to the service worker.
#[derive(Debug)]
pub(crate) struct TaskReport {
    pub(crate) upload_id: String,
    pub(crate) cycle: u64,
    pub(crate) kind: ReportKind,
}

#[derive(Debug)]
pub(crate) enum ReportKind {
    Progress {
        sample: ProgressSample,
        at: Instant,
    },
    Completed {
        response_code: i32,
        response_message: Option<String>,
    },
    Failed(ErrorDescriptor),
}

/// Handle a running task uses to report back and to observe cancellation.
pub struct TaskContext {
    upload_id: String,
    cycle: u64,
    cancel: CancellationToken,
    reports: mpsc::UnboundedSender<TaskReport>,
    finished: bool,
}

impl TaskContext {
    pub(crate) fn new(
        upload_id: String,
        cycle: u64,
        cancel: CancellationToken,
        reports: mpsc::UnboundedSender<TaskReport>,
    ) -> Self {
        Self {
            upload_id,
            cycle,
            cancel,
            reports,
            finished: false,
        }
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation of this upload has been requested.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// A token for handing to blocking code that cannot hold the context.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Reports bytes sent so far.
    ///
    /// `total_bytes` must be known (non-zero); zero-total samples are dropped
    /// by the service.
    pub fn progress(&self, uploaded_bytes: u64, total_bytes: u64) {
        self.send(ReportKind::Progress {
            sample: ProgressSample::new(uploaded_bytes, total_bytes),
            at: Instant::now(),
        });
    }

    /// Reports that the transfer finished and the remote answered.
    ///
    /// Non-2xx codes are still `Completed`; they are presented as failures.
    pub fn completed(mut self, response_code: i32, response_message: Option<String>) {
        self.finished = true;
        self.send(ReportKind::Completed {
            response_code,
            response_message,
        });
    }

    /// Reports that the transfer failed or was cancelled.
    pub fn failed(mut self, cause: impl Into<ErrorDescriptor>) {
        self.finished = true;
        self.send(ReportKind::Failed(cause.into()));
    }

    fn send(&self, kind: ReportKind) {
        let report = TaskReport {
            upload_id: self.upload_id.clone(),
            cycle: self.cycle,
            kind,
        };
        if self.reports.send(report).is_err() {
            warn!(upload_id = %self.upload_id, "upload service is gone, dropping task report");
        }
    }
}

impl Drop for TaskContext {
    fn drop(&mut self) {
        if !self.finished {
            warn!(upload_id = %self.upload_id, "task ended without reporting a result");
            self.send(ReportKind::Failed(ErrorDescriptor::new(
                ErrorKind::Abandoned,
                "task ended without reporting a result",
            )));
        }
    }
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("upload_id", &self.upload_id)
            .field("cycle", &self.cycle)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
