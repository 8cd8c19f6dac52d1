//! The single concurrency slot.
//!
//! Holds at most one active upload. There is no queue: a submission while
//! the slot is occupied is turned down, not deferred.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Result of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Nothing to cancel, or cancellation was already requested.
    NoOp,
    /// The active task was asked to stop.
    CancelRequested,
}

/// Returned by [`TaskSlot::submit`] when a task is already active.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upload {active_id} is already active")]
pub struct SlotBusy {
    pub active_id: String,
}

/// Bookkeeping for the task that occupies the slot.
#[derive(Debug)]
pub struct ActiveTask {
    upload_id: String,
    cycle: u64,
    started_at: Instant,
    cancel: CancellationToken,
    cancel_requested: bool,
}

impl ActiveTask {
    /// `cycle` distinguishes successive uploads that reuse an upload ID.
    pub fn new(upload_id: impl Into<String>, cycle: u64, cancel: CancellationToken) -> Self {
        Self {
            upload_id: upload_id.into(),
            cycle,
            started_at: Instant::now(),
            cancel,
            cancel_requested: false,
        }
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// When the slot accepted the task; progress timestamps are relative to it.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }
}

/// Owner of the one active task.
#[derive(Debug, Default)]
pub struct TaskSlot {
    active: Option<ActiveTask>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Occupies the slot with `task`, or reports which upload holds it.
    pub fn submit(&mut self, task: ActiveTask) -> Result<(), SlotBusy> {
        if let Some(active) = &self.active {
            return Err(SlotBusy {
                active_id: active.upload_id.clone(),
            });
        }
        debug!(upload_id = %task.upload_id, cycle = task.cycle, "task slot occupied");
        self.active = Some(task);
        Ok(())
    }

    /// Asks the active task to stop.
    ///
    /// The cancel hook fires at most once per task. The task still owes its
    /// terminal report; the slot stays occupied until then.
    pub fn cancel_active(&mut self) -> CancelOutcome {
        match &mut self.active {
            Some(active) if !active.cancel_requested => {
                active.cancel_requested = true;
                active.cancel.cancel();
                debug!(upload_id = %active.upload_id, "cancellation requested");
                CancelOutcome::CancelRequested
            }
            _ => CancelOutcome::NoOp,
        }
    }

    /// Frees the slot after the terminal report of cycle `cycle`.
    ///
    /// Returns `false` (and keeps the slot) if a different task is active.
    pub fn clear_active(&mut self, cycle: u64) -> bool {
        match &self.active {
            Some(active) if active.cycle == cycle => {
                debug!(upload_id = %active.upload_id, cycle, "task slot cleared");
                self.active = None;
                true
            }
            _ => false,
        }
    }

    pub fn active(&self) -> Option<&ActiveTask> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.upload_id.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}
