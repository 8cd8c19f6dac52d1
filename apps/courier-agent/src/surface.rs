//! Headless presentation: notifications become log lines.

use std::sync::atomic::{AtomicBool, Ordering};

use courier_upload_service::{OngoingProgress, PresentationSurface, ResourceLock};
use tracing::{debug, error, info, warn};

/// Writes ongoing and terminal notifications to the log.
///
/// The two notification identities are kept apart by the `notification`
/// field so a log consumer can render them like separate notifications.
#[derive(Debug, Default)]
pub struct LogSurface;

impl PresentationSurface for LogSurface {
    fn ensure_channel_exists(&self) {
        debug!("notification channel ready");
    }

    fn show_ongoing(&self, title: &str, text: &str, progress: OngoingProgress) {
        match progress {
            OngoingProgress::Indeterminate => {
                info!(notification = "ongoing", title, text, "upload notification");
            }
            OngoingProgress::Determinate(percentage) => {
                info!(
                    notification = "ongoing",
                    title, text, percentage, "upload notification"
                );
            }
        }
    }

    fn stop_ongoing(&self, remove: bool) {
        debug!(notification = "ongoing", remove, "ongoing notification stopped");
    }

    fn show_terminal(&self, title: &str, text: &str, is_error: bool, play_sound: bool) {
        if is_error {
            error!(notification = "terminal", title, text, play_sound, "upload notification");
        } else {
            info!(notification = "terminal", title, text, play_sound, "upload notification");
        }
    }
}

/// Tracks the keep-alive state of the process while an upload runs.
///
/// A desktop agent has nothing to pin, so this only records and logs the
/// hold; it still flags unbalanced calls.
#[derive(Debug, Default)]
pub struct ProcessLock {
    held: AtomicBool,
}

impl ProcessLock {
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

impl ResourceLock for ProcessLock {
    fn acquire(&self) {
        if self.held.swap(true, Ordering::SeqCst) {
            warn!("keep-alive lock acquired twice");
        } else {
            debug!("keep-alive lock acquired");
        }
    }

    fn release(&self) {
        if self.held.swap(false, Ordering::SeqCst) {
            debug!("keep-alive lock released");
        } else {
            warn!("keep-alive lock released while not held");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_tracks_hold() {
        let lock = ProcessLock::default();
        assert!(!lock.is_held());
        lock.acquire();
        assert!(lock.is_held());
        lock.release();
        assert!(!lock.is_held());
        // Unbalanced release is logged, not fatal.
        lock.release();
        assert!(!lock.is_held());
    }
}
