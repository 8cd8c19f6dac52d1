//! Service error types.

use courier_protocol::TransferKind;

/// Why a start request was turned down.
///
/// Rejections are reported to the caller only: no status event is emitted
/// and no lifecycle state changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    #[error("upload {active} is already active")]
    AlreadyActive { active: String },

    #[error("unknown transfer kind: {0}")]
    UnknownTransferKind(String),

    #[error("invalid task config: {0}")]
    InvalidTaskConfig(String),

    #[error("upload service stopped")]
    ServiceStopped,
}

/// Errors a [`TaskFactory`](crate::TaskFactory) may return while building a task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid task config: {0}")]
    InvalidConfig(String),

    #[error("unsupported transfer kind: {0}")]
    Unsupported(TransferKind),
}

impl From<TaskError> for Rejected {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Unsupported(kind) => Rejected::UnknownTransferKind(kind.to_string()),
            other => Rejected::InvalidTaskConfig(other.to_string()),
        }
    }
}
