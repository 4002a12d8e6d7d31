use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PeriodKind {
    #[default]
    Watch,
    Break,
}

impl PeriodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Watch => "watch",
            PeriodKind::Break => "break",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PeriodKind::Watch => "Watch Time",
            PeriodKind::Break => "Break Time",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            PeriodKind::Watch => "#059669",
            PeriodKind::Break => "#DC2626",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            PeriodKind::Watch => "🎥",
            PeriodKind::Break => "⏸️",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            PeriodKind::Watch => PeriodKind::Break,
            PeriodKind::Break => PeriodKind::Watch,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IntervalStatus {
    Passed,
    Current,
    Upcoming,
}

/// A labeled time range on the clock face.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub kind: PeriodKind,
    pub label: String,
    pub color: String,
    pub icon: String,
    /// Relative to a particular "now"; only the display adapter sets it.
    #[serde(skip)]
    pub status: Option<IntervalStatus>,
}

impl Interval {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>, kind: PeriodKind) -> Self {
        Self {
            start_time,
            end_time,
            kind,
            label: kind.label().to_string(),
            color: kind.color().to_string(),
            icon: kind.icon().to_string(),
            status: None,
        }
    }

    pub fn length(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start_time <= instant && instant < self.end_time
    }

    pub fn with_status(mut self, status: IntervalStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// True when every interval is non-empty and each one ends where the next starts.
pub fn is_contiguous(intervals: &[Interval]) -> bool {
    intervals.iter().all(|interval| interval.start_time < interval.end_time)
        && intervals
            .windows(2)
            .all(|pair| pair[0].end_time == pair[1].start_time)
}
