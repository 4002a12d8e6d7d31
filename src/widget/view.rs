use chrono::{DateTime, Local, Utc};

use crate::display::{classify, DisplayWindow, HandAngles, Sector};
use crate::models::{Interval, PeriodKind};
use crate::player::{CueThresholds, ViewerCues};
use crate::schedule::{Phase, Scheduler};

/// Everything the UI reads; rebuilt after each event and tick.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetView {
    pub period_type: PeriodKind,
    pub phase: Phase,
    pub remaining_seconds: u64,
    pub play_enabled: bool,
    pub period_end_time: DateTime<Utc>,
    pub intervals: Vec<Interval>,
    pub cues: ViewerCues,
    pub video_duration_seconds: Option<f64>,
}

impl WidgetView {
    pub fn build(
        scheduler: &Scheduler,
        now: DateTime<Utc>,
        window: DisplayWindow,
        thresholds: &CueThresholds,
        video_duration_seconds: Option<f64>,
    ) -> Self {
        let state = scheduler.state();
        Self {
            period_type: state.period_type,
            phase: state.phase(),
            remaining_seconds: state.remaining_seconds,
            play_enabled: scheduler.play_enabled(),
            period_end_time: state.period_end_time,
            intervals: classify(scheduler.intervals(), now, window),
            cues: ViewerCues::compute(state.period_type, state.remaining_seconds, thresholds),
            video_duration_seconds,
        }
    }

    /// Clock-face geometry on the viewer's local wall clock.
    pub fn dial(&self, now: DateTime<Utc>) -> (HandAngles, Vec<Sector>) {
        let hands = HandAngles::at(now.with_timezone(&Local).time());
        let sectors = self
            .intervals
            .iter()
            .map(|interval| Sector::for_interval(interval, &Local))
            .collect();
        (hands, sectors)
    }

    pub fn summary(&self) -> String {
        let upcoming = self
            .intervals
            .iter()
            .filter(|interval| interval.start_time >= self.period_end_time)
            .take(2)
            .map(|interval| {
                format!(
                    "{} {}",
                    interval.label,
                    interval.start_time.with_timezone(&Local).format("%H:%M")
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{} | {} left | play {} | next: {}",
            self.phase.as_str(),
            self.cues.countdown,
            if self.play_enabled { "allowed" } else { "blocked" },
            if upcoming.is_empty() { "-" } else { upcoming.as_str() }
        )
    }
}
