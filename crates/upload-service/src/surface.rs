//! Collaborators the service drives but does not implement.
//!
//! Implemented by the embedding application on top of whatever notification
//! system and power management the platform offers.

/// Progress indicator of the ongoing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OngoingProgress {
    /// Upload accepted, size not reported yet.
    Indeterminate,
    /// Percentage in `0..=100`.
    Determinate(u8),
}

/// Renders upload notifications.
///
/// The ongoing and the terminal notification are distinct: stopping the
/// ongoing one does not affect a terminal one shown afterwards.
pub trait PresentationSurface: Send + Sync {
    /// Provisions whatever channel/category the notifications need.
    /// Called once, before the first notification.
    fn ensure_channel_exists(&self);

    /// Shows or updates the ongoing (non-dismissible) notification.
    fn show_ongoing(&self, title: &str, text: &str, progress: OngoingProgress);

    /// Ends the ongoing state. With `remove`, the notification disappears.
    fn stop_ongoing(&self, remove: bool);

    /// Shows the dismissible notification for a finished upload.
    ///
    /// `play_sound` is a request; the surface decides whether the platform
    /// lets a single notification override its channel's sound settings.
    fn show_terminal(&self, title: &str, text: &str, is_error: bool, play_sound: bool);
}

/// A hold that keeps the transfer alive, e.g. a partial wake lock.
pub trait ResourceLock: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}
