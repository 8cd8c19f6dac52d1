//! Service and notification configuration.

use std::time::Duration;

use courier_transfer::DEFAULT_PROGRESS_INTERVAL_MS;
use serde::{Deserialize, Serialize};

/// Texts and switches for the upload notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Title shown on every notification.
    #[serde(default = "default_title")]
    pub title: String,

    /// Body of the ongoing notification; progress figures are appended.
    #[serde(default = "default_message")]
    pub message: String,

    /// Body of the terminal notification after a successful upload.
    #[serde(default = "default_completed_message")]
    pub completed_message: String,

    /// Body of the terminal notification after a failed upload.
    #[serde(default = "default_error_message")]
    pub error_message: String,

    /// Hide the notification entirely when an upload succeeds.
    /// Failures are always shown.
    #[serde(default)]
    pub auto_clear_on_success: bool,

    /// Ask the surface to play a sound with the terminal notification.
    #[serde(default)]
    pub play_sound_on_terminal: bool,
}

fn default_title() -> String {
    "Upload".into()
}

fn default_message() -> String {
    "Uploading".into()
}

fn default_completed_message() -> String {
    "Upload completed".into()
}

fn default_error_message() -> String {
    "Upload failed".into()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            message: default_message(),
            completed_message: default_completed_message(),
            error_message: default_error_message(),
            auto_clear_on_success: false,
            play_sound_on_terminal: false,
        }
    }
}

/// Upload service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Minimum gap between broadcast progress events, in milliseconds.
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Per-subscriber buffer of the status broadcast. Slow subscribers that
    /// fall further behind lose the oldest events.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    #[serde(default)]
    pub notification: NotificationConfig,
}

fn default_progress_interval_ms() -> u64 {
    DEFAULT_PROGRESS_INTERVAL_MS
}

fn default_event_capacity() -> usize {
    64
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: default_progress_interval_ms(),
            event_capacity: default_event_capacity(),
            notification: NotificationConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}
