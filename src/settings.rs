use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::display::DisplayWindow;
use crate::error::WidgetError;
use crate::player::CueThresholds;
use crate::schedule::Cadence;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetSettings {
    pub video_id: String,
    pub session_key: String,
    pub watch_seconds: u64,
    pub break_seconds: u64,
    pub horizon_seconds: u64,
    pub lookbehind_seconds: u64,
    pub lookahead_seconds: u64,
    pub progress_bar_lead_seconds: u64,
    pub exit_fullscreen_lead_seconds: u64,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            video_id: "wVH6vZiWrl8".into(),
            session_key: "watch-break-state".into(),
            watch_seconds: 8 * 60,
            break_seconds: 2 * 60,
            horizon_seconds: 45 * 60,
            lookbehind_seconds: 5 * 60,
            lookahead_seconds: 45 * 60,
            progress_bar_lead_seconds: 20,
            exit_fullscreen_lead_seconds: 5,
        }
    }
}

impl WidgetSettings {
    /// Durations are rejected here rather than clamped later.
    pub fn cadence(&self) -> Result<Cadence, WidgetError> {
        Cadence::new(self.watch_seconds, self.break_seconds)
    }

    pub fn display_window(&self) -> DisplayWindow {
        DisplayWindow::from_secs(self.lookbehind_seconds, self.lookahead_seconds)
    }

    pub fn cue_thresholds(&self) -> CueThresholds {
        CueThresholds {
            progress_bar_lead_seconds: self.progress_bar_lead_seconds,
            exit_fullscreen_lead_seconds: self.exit_fullscreen_lead_seconds,
        }
    }

    pub fn validate(&self) -> Result<(), WidgetError> {
        self.cadence()?;
        if self.horizon_seconds == 0 {
            return Err(WidgetError::InvalidDuration {
                field: "horizon_seconds",
                value: self.horizon_seconds,
            });
        }
        Ok(())
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<WidgetSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`, falling back to defaults when the file is
    /// missing or unreadable JSON. Invalid durations are an error.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring malformed settings at {}: {err}",
                    path.display()
                );
                WidgetSettings::default()
            })
        } else {
            WidgetSettings::default()
        };

        data.validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn widget(&self) -> WidgetSettings {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn update_widget(&self, settings: WidgetSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &WidgetSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
