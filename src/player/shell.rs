use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::WidgetError;

/// Notifications coming from the embedded player.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    #[serde(rename_all = "camelCase")]
    Ready { duration_seconds: f64 },
    StateChange { playing: bool },
}

/// Outbound control surface of the embedded player. Implementations report
/// `PlayerShellUnavailable` when the embed never loaded.
pub trait PlayerShell: Send + Sync {
    fn pause(&self) -> Result<(), WidgetError>;

    /// Pushes the current limit; `play_enabled == false` disables the play control.
    fn apply_limit(&self, remaining_seconds: u64, play_enabled: bool) -> Result<(), WidgetError>;
}

/// Shell used when no embed is attached; it only logs what it was asked to do.
#[derive(Debug, Default, Clone)]
pub struct HeadlessShell {
    video_id: String,
}

impl HeadlessShell {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
        }
    }
}

impl PlayerShell for HeadlessShell {
    fn pause(&self) -> Result<(), WidgetError> {
        info!("pausing video {}", self.video_id);
        Ok(())
    }

    fn apply_limit(&self, remaining_seconds: u64, play_enabled: bool) -> Result<(), WidgetError> {
        debug!(
            "video {}: {}s left, play {}",
            self.video_id,
            remaining_seconds,
            if play_enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }
}

/// Stand-in for an embed API that failed to load.
#[derive(Debug, Clone)]
pub struct DetachedShell {
    reason: String,
}

impl DetachedShell {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl PlayerShell for DetachedShell {
    fn pause(&self) -> Result<(), WidgetError> {
        Err(WidgetError::PlayerShellUnavailable(self.reason.clone()))
    }

    fn apply_limit(&self, _remaining_seconds: u64, _play_enabled: bool) -> Result<(), WidgetError> {
        Err(WidgetError::PlayerShellUnavailable(self.reason.clone()))
    }
}
