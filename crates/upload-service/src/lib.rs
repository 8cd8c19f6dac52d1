//! Single-slot background upload service.
//!
//! This crate implements the **lifecycle** around an upload, not the upload
//! itself. The embedding application provides:
//!
//! - a [`TaskFactory`] that turns a [`StartRequest`] into an [`UploadTask`],
//! - a [`PresentationSurface`] that renders ongoing and terminal
//!   notifications,
//! - a [`ResourceLock`] held while a transfer runs (a wake lock, typically).
//!
//! # Flow
//!
//! 1. **Start**: [`UploadService::start`] rejects the request if another
//!    upload is active, otherwise arms the presenter (lock acquired,
//!    indeterminate notification) and spawns the task.
//! 2. **Progress**: the task reports raw byte counts through its
//!    [`TaskContext`]; the worker throttles them and broadcasts
//!    `InProgress` events.
//! 3. **Finish**: exactly one `Completed` or `Error` event is broadcast, the
//!    terminal notification is shown, the lock is released and the slot is
//!    freed for the next upload.

pub mod channel;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod presenter;
pub mod slot;
pub mod surface;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::StatusChannel;
pub use config::{NotificationConfig, ServiceConfig};
pub use error::{Rejected, TaskError};
pub use orchestrator::{Started, UploadService};
pub use presenter::{LifecyclePresenter, PresentationState};
pub use slot::{ActiveTask, CancelOutcome, SlotBusy, TaskSlot};
pub use surface::{OngoingProgress, PresentationSurface, ResourceLock};
pub use task::{TaskContext, TaskFactory, TaskFuture, UploadTask};

pub use courier_protocol::{
    ErrorDescriptor, ErrorKind, StartRequest, StatusEvent, StatusMessage, TransferKind,
};
