//! Wire types for the Courier upload service.
//!
//! Two directions are covered here:
//!
//! - **Inbound**: [`StartRequest`] names an upload, the [`TransferKind`] that
//!   performs it, and an opaque task configuration.
//! - **Outbound**: [`StatusEvent`] is the in-process event model, and
//!   [`StatusMessage`] is its flat wire form with the stable status codes
//!   external consumers switch on (`1` in progress, `2` completed, `3` error).

pub mod error;
pub mod request;
pub mod status;

pub use error::ProtocolError;
pub use request::{StartRequest, TransferKind};
pub use status::{
    ErrorDescriptor, ErrorKind, StatusCode, StatusEvent, StatusMessage, is_success_code,
};
