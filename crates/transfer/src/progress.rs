use serde::{Deserialize, Serialize};

/// Bytes per megabyte used for display (decimal, like transfer UIs).
const BYTES_PER_MB: f64 = 1_000_000.0;

/// A single `(uploaded, total)` observation reported by a running task.
///
/// `uploaded_bytes <= total_bytes` is expected but not trusted: consumers
/// read the clamped values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSample {
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
}

impl ProgressSample {
    pub fn new(uploaded_bytes: u64, total_bytes: u64) -> Self {
        Self {
            uploaded_bytes,
            total_bytes,
        }
    }

    /// Returns the sample with `uploaded_bytes` capped at `total_bytes`.
    pub fn clamped(self) -> Self {
        Self {
            uploaded_bytes: self.uploaded_bytes.min(self.total_bytes),
            total_bytes: self.total_bytes,
        }
    }

    /// `true` once everything has been sent.
    pub fn is_final(&self) -> bool {
        self.total_bytes > 0 && self.uploaded_bytes >= self.total_bytes
    }

    /// Whole-number percentage in `0..=100`, rounded down.
    ///
    /// Returns `None` for a zero total. Tasks must not report progress before
    /// they know the payload size.
    pub fn percentage(&self) -> Option<u8> {
        if self.total_bytes == 0 {
            return None;
        }
        let s = self.clamped();
        let pct = u128::from(s.uploaded_bytes) * 100 / u128::from(s.total_bytes);
        Some(pct as u8)
    }
}

/// Formats a byte count as megabytes with one decimal, e.g. `"1.5"`.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.1}", bytes as f64 / BYTES_PER_MB)
}
