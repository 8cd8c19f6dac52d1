use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Stable status code carried by every outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    InProgress,
    Completed,
    Error,
}

impl StatusCode {
    /// Numeric wire value.
    pub const fn code(self) -> u8 {
        match self {
            StatusCode::InProgress => 1,
            StatusCode::Completed => 2,
            StatusCode::Error => 3,
        }
    }

    /// Parses a numeric wire value.
    pub fn from_code(code: u8) -> Result<Self, ProtocolError> {
        match code {
            1 => Ok(StatusCode::InProgress),
            2 => Ok(StatusCode::Completed),
            3 => Ok(StatusCode::Error),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

/// Broad classification of a transfer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connection, DNS or socket level failure.
    Network,
    /// The remote spoke something the task did not understand.
    Protocol,
    /// Local I/O (reading the payload) failed.
    Io,
    /// The task stopped because cancellation was requested.
    Cancelled,
    /// The task ended without reporting a result.
    Abandoned,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Network => "network",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Io => "io",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Abandoned => "abandoned",
            ErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Structured cause attached to an `Error` status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorDescriptor {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a cancellation cause.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "upload cancelled")
    }
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<std::io::Error> for ErrorDescriptor {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, err.to_string())
    }
}

/// Returns `true` for HTTP-style success codes (`200..=299`).
pub fn is_success_code(code: i32) -> bool {
    (200..=299).contains(&code)
}

/// Lifecycle event for one upload.
///
/// Every variant carries the upload ID so several logical uploads can share
/// one channel, even though only one is ever active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    InProgress {
        upload_id: String,
        percentage: u8,
        uploaded_bytes: u64,
        total_bytes: u64,
    },
    Completed {
        upload_id: String,
        response_code: i32,
        response_message: String,
    },
    Error {
        upload_id: String,
        cause: ErrorDescriptor,
    },
}

impl StatusEvent {
    pub fn upload_id(&self) -> &str {
        match self {
            StatusEvent::InProgress { upload_id, .. }
            | StatusEvent::Completed { upload_id, .. }
            | StatusEvent::Error { upload_id, .. } => upload_id,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StatusEvent::InProgress { .. } => StatusCode::InProgress,
            StatusEvent::Completed { .. } => StatusCode::Completed,
            StatusEvent::Error { .. } => StatusCode::Error,
        }
    }

    /// `Completed` and `Error` end an upload cycle.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusEvent::InProgress { .. })
    }

    /// Terminal events that should be presented as a failure: any `Error`,
    /// and `Completed` with a non-2xx response code.
    pub fn is_failure(&self) -> bool {
        match self {
            StatusEvent::InProgress { .. } => false,
            StatusEvent::Completed { response_code, .. } => !is_success_code(*response_code),
            StatusEvent::Error { .. } => true,
        }
    }
}

/// Flat wire form of a [`StatusEvent`].
///
/// Only the fields belonging to the message's `status` are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub id: String,
    pub status: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_uploaded_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_total_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_response_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_response_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_cause: Option<ErrorDescriptor>,
}

impl StatusMessage {
    fn bare(id: &str, status: StatusCode) -> Self {
        Self {
            id: id.to_string(),
            status: status.code(),
            progress: None,
            progress_uploaded_bytes: None,
            progress_total_bytes: None,
            server_response_code: None,
            server_response_message: None,
            error_cause: None,
        }
    }

    /// Parses a message from JSON and validates it into an event.
    pub fn decode(json: &str) -> Result<StatusEvent, ProtocolError> {
        let msg: StatusMessage = serde_json::from_str(json)?;
        msg.into_event()
    }

    /// Serializes the wire form of `event` to JSON.
    pub fn encode(event: &StatusEvent) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(&StatusMessage::from(event))?)
    }

    /// Converts the wire form back into an event.
    ///
    /// A missing `serverResponseMessage` decodes as the empty string; every
    /// other field belonging to the status is required.
    pub fn into_event(self) -> Result<StatusEvent, ProtocolError> {
        let status = self.status;
        let missing = |field| ProtocolError::MissingField { status, field };

        match StatusCode::from_code(status)? {
            StatusCode::InProgress => Ok(StatusEvent::InProgress {
                upload_id: self.id,
                percentage: self.progress.ok_or_else(|| missing("progress"))?,
                uploaded_bytes: self
                    .progress_uploaded_bytes
                    .ok_or_else(|| missing("progressUploadedBytes"))?,
                total_bytes: self
                    .progress_total_bytes
                    .ok_or_else(|| missing("progressTotalBytes"))?,
            }),
            StatusCode::Completed => Ok(StatusEvent::Completed {
                upload_id: self.id,
                response_code: self
                    .server_response_code
                    .ok_or_else(|| missing("serverResponseCode"))?,
                response_message: self.server_response_message.unwrap_or_default(),
            }),
            StatusCode::Error => Ok(StatusEvent::Error {
                upload_id: self.id,
                cause: self.error_cause.ok_or_else(|| missing("errorCause"))?,
            }),
        }
    }
}

impl From<&StatusEvent> for StatusMessage {
    fn from(event: &StatusEvent) -> Self {
        let mut msg = StatusMessage::bare(event.upload_id(), event.status_code());
        match event {
            StatusEvent::InProgress {
                percentage,
                uploaded_bytes,
                total_bytes,
                ..
            } => {
                msg.progress = Some(*percentage);
                msg.progress_uploaded_bytes = Some(*uploaded_bytes);
                msg.progress_total_bytes = Some(*total_bytes);
            }
            StatusEvent::Completed {
                response_code,
                response_message,
                ..
            } => {
                msg.server_response_code = Some(*response_code);
                msg.server_response_message = Some(response_message.clone());
            }
            StatusEvent::Error { cause, .. } => {
                msg.error_cause = Some(cause.clone());
            }
        }
        msg
    }
}
