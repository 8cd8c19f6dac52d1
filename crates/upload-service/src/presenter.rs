//! Presentation state machine.
//!
//! Derives the user-visible state of the current upload from the status
//! events and drives the notification surface and the resource lock.
//!
//! ```text
//!  begin ──► Starting ──InProgress──► Progressing ◄─┐
//!               │                         │   └─────┘ InProgress
//!               └──────────┬──────────────┘
//!        Completed 2xx     │     Completed non-2xx / Error
//!          ▼               │               ▼
//!     DoneSuccess ◄────────┴────────► DoneError
//! ```
//!
//! The lock is acquired on entry to `Starting` and released on entry to
//! either done state. A done presenter accepts the next `begin`.

use std::sync::Arc;

use courier_protocol::StatusEvent;
use courier_transfer::format_megabytes;
use tracing::{debug, info, warn};

use crate::config::NotificationConfig;
use crate::surface::{OngoingProgress, PresentationSurface, ResourceLock};

/// User-visible state of the current upload cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationState {
    Starting,
    Progressing,
    DoneSuccess,
    DoneError,
}

impl PresentationState {
    pub fn is_done(&self) -> bool {
        matches!(self, PresentationState::DoneSuccess | PresentationState::DoneError)
    }
}

/// Drives notifications and the resource lock for one upload at a time.
pub struct LifecyclePresenter {
    config: NotificationConfig,
    surface: Arc<dyn PresentationSurface>,
    lock: Arc<dyn ResourceLock>,
    state: Option<PresentationState>,
    upload_id: Option<String>,
    lock_held: bool,
    channel_ready: bool,
}

impl LifecyclePresenter {
    pub fn new(
        config: NotificationConfig,
        surface: Arc<dyn PresentationSurface>,
        lock: Arc<dyn ResourceLock>,
    ) -> Self {
        Self {
            config,
            surface,
            lock,
            state: None,
            upload_id: None,
            lock_held: false,
            channel_ready: false,
        }
    }

    /// Current state; `None` before the first upload.
    pub fn state(&self) -> Option<PresentationState> {
        self.state
    }

    /// `true` between `begin` and the terminal event.
    pub fn in_flight(&self) -> bool {
        matches!(
            self.state,
            Some(PresentationState::Starting | PresentationState::Progressing)
        )
    }

    /// Enters `Starting` for a new upload.
    pub fn begin(&mut self, upload_id: &str) {
        if self.in_flight() {
            warn!(
                upload_id,
                previous = ?self.upload_id,
                "starting a new upload while the previous one is still presented"
            );
        }

        self.ensure_channel();
        self.acquire_lock();
        self.upload_id = Some(upload_id.to_string());
        self.state = Some(PresentationState::Starting);
        self.surface.show_ongoing(
            &self.config.title,
            &self.config.message,
            OngoingProgress::Indeterminate,
        );
        debug!(upload_id, "presentation starting");
    }

    /// The state `event` leads to, without applying it.
    pub fn next_state(&self, event: &StatusEvent) -> Option<PresentationState> {
        if !self.accepts(event) {
            return self.state;
        }
        Some(match event {
            StatusEvent::InProgress { .. } => PresentationState::Progressing,
            terminal if terminal.is_failure() => PresentationState::DoneError,
            _ => PresentationState::DoneSuccess,
        })
    }

    fn accepts(&self, event: &StatusEvent) -> bool {
        self.in_flight() && self.upload_id.as_deref() == Some(event.upload_id())
    }

    /// Applies a status event of the current upload.
    pub fn on_event(&mut self, event: &StatusEvent) {
        if !self.accepts(event) {
            debug!(
                upload_id = %event.upload_id(),
                state = ?self.state,
                "ignoring event outside of an upload cycle"
            );
            return;
        }

        match event {
            StatusEvent::InProgress {
                percentage,
                uploaded_bytes,
                total_bytes,
                ..
            } => {
                self.state = Some(PresentationState::Progressing);
                let text = format!(
                    "{} {}% | {}/{} MB",
                    self.config.message,
                    percentage,
                    format_megabytes(*uploaded_bytes),
                    format_megabytes(*total_bytes)
                );
                self.surface.show_ongoing(
                    &self.config.title,
                    &text,
                    OngoingProgress::Determinate(*percentage),
                );
            }
            terminal if terminal.is_failure() => self.finish_error(),
            _ => self.finish_success(),
        }
    }

    fn finish_success(&mut self) {
        let auto_clear = self.config.auto_clear_on_success;
        self.surface.stop_ongoing(auto_clear);
        self.release_lock();
        if !auto_clear {
            self.surface.show_terminal(
                &self.config.title,
                &self.config.completed_message,
                false,
                self.config.play_sound_on_terminal,
            );
        }
        self.state = Some(PresentationState::DoneSuccess);
        info!(upload_id = ?self.upload_id, auto_clear, "upload presented as completed");
    }

    fn finish_error(&mut self) {
        self.surface.stop_ongoing(false);
        self.release_lock();
        self.surface.show_terminal(
            &self.config.title,
            &self.config.error_message,
            true,
            self.config.play_sound_on_terminal,
        );
        self.state = Some(PresentationState::DoneError);
        info!(upload_id = ?self.upload_id, "upload presented as failed");
    }

    fn ensure_channel(&mut self) {
        if !self.channel_ready {
            self.surface.ensure_channel_exists();
            self.channel_ready = true;
        }
    }

    fn acquire_lock(&mut self) {
        if self.lock_held {
            warn!("resource lock already held, not acquiring again");
            return;
        }
        self.lock.acquire();
        self.lock_held = true;
    }

    fn release_lock(&mut self) {
        if self.lock_held {
            self.lock.release();
            self.lock_held = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{LockCall, RecordingLock, RecordingSurface, SurfaceCall};
    use courier_protocol::{ErrorDescriptor, ErrorKind};

    fn presenter(
        config: NotificationConfig,
    ) -> (LifecyclePresenter, Arc<RecordingSurface>, Arc<RecordingLock>) {
        let surface = RecordingSurface::new();
        let lock = RecordingLock::new();
        let p = LifecyclePresenter::new(config, surface.clone(), lock.clone());
        (p, surface, lock)
    }

    fn in_progress(id: &str, uploaded: u64, total: u64) -> StatusEvent {
        StatusEvent::InProgress {
            upload_id: id.into(),
            percentage: (uploaded * 100 / total) as u8,
            uploaded_bytes: uploaded,
            total_bytes: total,
        }
    }

    fn completed(id: &str, code: i32) -> StatusEvent {
        StatusEvent::Completed {
            upload_id: id.into(),
            response_code: code,
            response_message: String::new(),
        }
    }

    fn failed(id: &str) -> StatusEvent {
        StatusEvent::Error {
            upload_id: id.into(),
            cause: ErrorDescriptor::new(ErrorKind::Network, "reset"),
        }
    }

    #[test]
    fn begin_acquires_and_shows_indeterminate() {
        let (mut p, surface, lock) = presenter(NotificationConfig::default());
        p.begin("u1");

        assert_eq!(p.state(), Some(PresentationState::Starting));
        assert_eq!(lock.calls(), vec![LockCall::Acquire]);
        assert_eq!(
            surface.calls(),
            vec![
                SurfaceCall::EnsureChannel,
                SurfaceCall::Ongoing {
                    text: "Uploading".into(),
                    progress: OngoingProgress::Indeterminate,
                },
            ]
        );
    }

    #[test]
    fn progress_updates_text() {
        let (mut p, surface, _lock) = presenter(NotificationConfig::default());
        p.begin("u1");
        p.on_event(&in_progress("u1", 1_500_000, 3_000_000));

        assert_eq!(p.state(), Some(PresentationState::Progressing));
        assert_eq!(
            surface.calls().last(),
            Some(&SurfaceCall::Ongoing {
                text: "Uploading 50% | 1.5/3.0 MB".into(),
                progress: OngoingProgress::Determinate(50),
            })
        );
    }

    #[test]
    fn success_releases_and_notifies() {
        let config = NotificationConfig {
            play_sound_on_terminal: true,
            ..NotificationConfig::default()
        };
        let (mut p, surface, lock) = presenter(config);
        p.begin("u1");
        p.on_event(&in_progress("u1", 10, 10));
        p.on_event(&completed("u1", 200));

        assert_eq!(p.state(), Some(PresentationState::DoneSuccess));
        assert_eq!(lock.calls(), vec![LockCall::Acquire, LockCall::Release]);
        let calls = surface.calls();
        assert!(calls.contains(&SurfaceCall::StopOngoing { remove: false }));
        assert_eq!(
            surface.terminal_calls(),
            vec![SurfaceCall::Terminal {
                text: "Upload completed".into(),
                is_error: false,
                play_sound: true,
            }]
        );
    }

    #[test]
    fn auto_clear_suppresses_success_notification() {
        let config = NotificationConfig {
            auto_clear_on_success: true,
            ..NotificationConfig::default()
        };
        let (mut p, surface, lock) = presenter(config);
        p.begin("u1");
        p.on_event(&completed("u1", 204));

        assert_eq!(p.state(), Some(PresentationState::DoneSuccess));
        assert!(surface.terminal_calls().is_empty());
        assert!(surface.calls().contains(&SurfaceCall::StopOngoing { remove: true }));
        assert_eq!(lock.calls(), vec![LockCall::Acquire, LockCall::Release]);
    }

    #[test]
    fn errors_always_visible() {
        for auto_clear in [false, true] {
            for event in [failed("u1"), completed("u1", 500), completed("u1", 199)] {
                let config = NotificationConfig {
                    auto_clear_on_success: auto_clear,
                    ..NotificationConfig::default()
                };
                let (mut p, surface, lock) = presenter(config);
                p.begin("u1");
                p.on_event(&event);

                assert_eq!(p.state(), Some(PresentationState::DoneError), "{event:?}");
                assert_eq!(
                    surface.terminal_calls(),
                    vec![SurfaceCall::Terminal {
                        text: "Upload failed".into(),
                        is_error: true,
                        play_sound: false,
                    }]
                );
                assert!(surface.calls().contains(&SurfaceCall::StopOngoing { remove: false }));
                assert_eq!(lock.calls(), vec![LockCall::Acquire, LockCall::Release]);
            }
        }
    }

    #[test]
    fn terminal_without_progress_still_releases() {
        let (mut p, _surface, lock) = presenter(NotificationConfig::default());
        p.begin("u1");
        p.on_event(&failed("u1"));
        assert_eq!(lock.calls(), vec![LockCall::Acquire, LockCall::Release]);
    }

    #[test]
    fn rearms_for_next_upload() {
        let (mut p, surface, lock) = presenter(NotificationConfig::default());
        p.begin("u1");
        p.on_event(&completed("u1", 200));
        p.begin("u2");
        assert_eq!(p.state(), Some(PresentationState::Starting));
        p.on_event(&failed("u2"));

        assert_eq!(
            lock.calls(),
            vec![
                LockCall::Acquire,
                LockCall::Release,
                LockCall::Acquire,
                LockCall::Release
            ]
        );
        let ensures = surface
            .calls()
            .into_iter()
            .filter(|c| *c == SurfaceCall::EnsureChannel)
            .count();
        assert_eq!(ensures, 1);
    }

    #[test]
    fn ignores_events_when_idle_or_done() {
        let (mut p, surface, lock) = presenter(NotificationConfig::default());
        p.on_event(&in_progress("u1", 1, 2));
        assert_eq!(p.state(), None);

        p.begin("u1");
        p.on_event(&completed("u1", 200));
        let before = surface.calls().len();
        p.on_event(&failed("u1"));
        p.on_event(&in_progress("u1", 1, 2));

        assert_eq!(p.state(), Some(PresentationState::DoneSuccess));
        assert_eq!(surface.calls().len(), before);
        assert_eq!(lock.calls(), vec![LockCall::Acquire, LockCall::Release]);
    }

    #[test]
    fn next_state_has_no_side_effects() {
        let (mut p, surface, lock) = presenter(NotificationConfig::default());
        assert_eq!(p.next_state(&completed("u1", 200)), None);

        p.begin("u1");
        let calls = surface.calls().len();
        assert_eq!(
            p.next_state(&in_progress("u1", 1, 2)),
            Some(PresentationState::Progressing)
        );
        assert_eq!(
            p.next_state(&completed("u1", 200)),
            Some(PresentationState::DoneSuccess)
        );
        assert_eq!(
            p.next_state(&completed("u1", 404)),
            Some(PresentationState::DoneError)
        );
        assert_eq!(p.next_state(&failed("other")), Some(PresentationState::Starting));

        assert_eq!(p.state(), Some(PresentationState::Starting));
        assert_eq!(surface.calls().len(), calls);
        assert_eq!(lock.calls(), vec![LockCall::Acquire]);

        let event = failed("u1");
        let predicted = p.next_state(&event);
        p.on_event(&event);
        assert_eq!(p.state(), predicted);
    }

    #[test]
    fn ignores_events_for_other_upload() {
        let (mut p, _surface, lock) = presenter(NotificationConfig::default());
        p.begin("u1");
        p.on_event(&completed("other", 200));
        assert_eq!(p.state(), Some(PresentationState::Starting));
        assert_eq!(lock.calls(), vec![LockCall::Acquire]);
    }

    #[test]
    fn double_begin_does_not_double_acquire() {
        let (mut p, _surface, lock) = presenter(NotificationConfig::default());
        p.begin("u1");
        p.begin("u1");
        assert_eq!(lock.calls(), vec![LockCall::Acquire]);
    }
}
