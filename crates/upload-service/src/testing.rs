//! Recording collaborators for unit tests.

use std::sync::{Arc, Mutex};

use crate::surface::{OngoingProgress, PresentationSurface, ResourceLock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    EnsureChannel,
    Ongoing {
        text: String,
        progress: OngoingProgress,
    },
    StopOngoing {
        remove: bool,
    },
    Terminal {
        text: String,
        is_error: bool,
        play_sound: bool,
    },
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCall>>,
}

impl RecordingSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn terminal_calls(&self) -> Vec<SurfaceCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, SurfaceCall::Terminal { .. }))
            .collect()
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PresentationSurface for RecordingSurface {
    fn ensure_channel_exists(&self) {
        self.record(SurfaceCall::EnsureChannel);
    }

    fn show_ongoing(&self, _title: &str, text: &str, progress: OngoingProgress) {
        self.record(SurfaceCall::Ongoing {
            text: text.to_string(),
            progress,
        });
    }

    fn stop_ongoing(&self, remove: bool) {
        self.record(SurfaceCall::StopOngoing { remove });
    }

    fn show_terminal(&self, _title: &str, text: &str, is_error: bool, play_sound: bool) {
        self.record(SurfaceCall::Terminal {
            text: text.to_string(),
            is_error,
            play_sound,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockCall {
    Acquire,
    Release,
}

#[derive(Debug, Default)]
pub struct RecordingLock {
    calls: Mutex<Vec<LockCall>>,
}

impl RecordingLock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<LockCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ResourceLock for RecordingLock {
    fn acquire(&self) {
        self.calls.lock().unwrap().push(LockCall::Acquire);
    }

    fn release(&self) {
        self.calls.lock().unwrap().push(LockCall::Release);
    }
}
