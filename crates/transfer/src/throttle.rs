use std::time::Duration;

use crate::progress::ProgressSample;

/// Default minimum gap between emitted progress updates (~6 per second).
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 166;

/// Outcome of feeding one sample to the throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Forward this (clamped) sample downstream.
    Emit(ProgressSample),
    /// Drop it; an update went out too recently.
    Suppress,
}

/// Rate-limits a stream of progress samples.
///
/// Single-writer: the owner feeds samples in order with non-decreasing
/// timestamps. The first sample after [`reset`](Self::reset) and any final
/// sample always pass.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval_ms: u64,
    last_emitted_at_ms: Option<u64>,
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS))
    }
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            last_emitted_at_ms: None,
        }
    }

    /// Forgets the last emission time. Call at the start of every upload.
    pub fn reset(&mut self) {
        self.last_emitted_at_ms = None;
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Decides whether `sample`, observed at `now_ms`, should be emitted.
    pub fn observe(&mut self, sample: ProgressSample, now_ms: u64) -> ThrottleDecision {
        let due = match self.last_emitted_at_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        };

        if due || sample.is_final() {
            self.last_emitted_at_ms = Some(now_ms);
            ThrottleDecision::Emit(sample.clamped())
        } else {
            ThrottleDecision::Suppress
        }
    }
}
