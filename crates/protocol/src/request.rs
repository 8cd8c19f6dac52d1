use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// The transfer strategies a start request can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    /// Raw request body made of a single payload.
    Binary,
    /// Form upload carrying one or more payloads.
    Multipart,
}

impl FromStr for TransferKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(TransferKind::Binary),
            "multipart" => Ok(TransferKind::Multipart),
            other => Err(ProtocolError::UnknownTransferKind(other.to_string())),
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferKind::Binary => f.write_str("binary"),
            TransferKind::Multipart => f.write_str("multipart"),
        }
    }
}

/// Request to start an upload.
///
/// `transfer_kind` stays a string on the wire so that unknown kinds reach
/// the service and are rejected there instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub upload_id: String,
    pub transfer_kind: String,
    #[serde(default)]
    pub task_config: serde_json::Value,
}

impl StartRequest {
    pub fn new(
        upload_id: impl Into<String>,
        kind: TransferKind,
        task_config: serde_json::Value,
    ) -> Self {
        Self {
            upload_id: upload_id.into(),
            transfer_kind: kind.to_string(),
            task_config,
        }
    }

    /// Resolves the requested transfer kind.
    pub fn kind(&self) -> Result<TransferKind, ProtocolError> {
        self.transfer_kind.parse()
    }
}
