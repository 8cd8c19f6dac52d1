//! Progress sampling and throttling for background uploads.
//!
//! Tasks report raw `(uploaded, total)` byte counts as often as they like.
//! [`ProgressThrottle`] turns that stream into at most one update per
//! interval, while always letting the first and the final sample through.

mod progress;
mod throttle;

pub use progress::{ProgressSample, format_megabytes};
pub use throttle::{DEFAULT_PROGRESS_INTERVAL_MS, ProgressThrottle, ThrottleDecision};
