use serde::Serialize;

use crate::models::PeriodKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueThresholds {
    /// Show the countdown bar this many seconds before watch time ends.
    pub progress_bar_lead_seconds: u64,
    /// Leave fullscreen this many seconds before watch time ends.
    pub exit_fullscreen_lead_seconds: u64,
}

impl Default for CueThresholds {
    fn default() -> Self {
        Self {
            progress_bar_lead_seconds: 20,
            exit_fullscreen_lead_seconds: 5,
        }
    }
}

/// Overlay hints derived from the remaining watch time.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewerCues {
    pub show_progress_bar: bool,
    /// Share of the countdown bar still filled, 0..=100.
    pub progress_percentage: f64,
    pub exit_fullscreen: bool,
    pub countdown: String,
}

impl ViewerCues {
    pub fn compute(kind: PeriodKind, remaining_seconds: u64, thresholds: &CueThresholds) -> Self {
        let countdown = format_countdown(remaining_seconds);
        if kind == PeriodKind::Break {
            return Self {
                show_progress_bar: false,
                progress_percentage: 0.0,
                exit_fullscreen: true,
                countdown,
            };
        }

        let lead = thresholds.progress_bar_lead_seconds;
        let show_progress_bar = lead > 0 && remaining_seconds <= lead;
        let progress_percentage = if show_progress_bar {
            remaining_seconds as f64 / lead as f64 * 100.0
        } else {
            100.0
        };

        Self {
            show_progress_bar,
            progress_percentage,
            exit_fullscreen: remaining_seconds <= thresholds.exit_fullscreen_lead_seconds,
            countdown,
        }
    }
}

/// `m:ss`, minutes unbounded.
pub fn format_countdown(total_seconds: u64) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}
