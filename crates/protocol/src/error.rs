/// Errors produced while decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown status code: {0}")]
    UnknownStatus(u8),

    #[error("unknown transfer kind: {0}")]
    UnknownTransferKind(String),

    #[error("missing field `{field}` for status {status}")]
    MissingField { status: u8, field: &'static str },
}
