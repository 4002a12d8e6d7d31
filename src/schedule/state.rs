use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp;

use crate::error::WidgetError;
use crate::models::PeriodKind;

/// Longest accepted watch or break length (one week).
pub const MAX_PERIOD_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Fixed watch/break lengths, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    watch_seconds: u64,
    break_seconds: u64,
}

impl Cadence {
    pub fn new(watch_seconds: u64, break_seconds: u64) -> Result<Self, WidgetError> {
        if watch_seconds == 0 || watch_seconds > MAX_PERIOD_SECONDS {
            return Err(WidgetError::InvalidDuration {
                field: "watch_seconds",
                value: watch_seconds,
            });
        }
        if break_seconds == 0 || break_seconds > MAX_PERIOD_SECONDS {
            return Err(WidgetError::InvalidDuration {
                field: "break_seconds",
                value: break_seconds,
            });
        }
        Ok(Self {
            watch_seconds,
            break_seconds,
        })
    }

    pub fn watch_seconds(&self) -> u64 {
        self.watch_seconds
    }

    pub fn break_seconds(&self) -> u64 {
        self.break_seconds
    }

    pub fn watch(&self) -> Duration {
        seconds(self.watch_seconds)
    }

    pub fn break_length(&self) -> Duration {
        seconds(self.break_seconds)
    }

    /// Break length after pause credit is applied; never negative.
    pub fn adjusted_break_seconds(&self, pause_credit_seconds: u64) -> u64 {
        self.break_seconds.saturating_sub(pause_credit_seconds)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    WatchPlaying,
    WatchPaused,
    Break,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::WatchPlaying => "watch-playing",
            Phase::WatchPaused => "watch-paused",
            Phase::Break => "break",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerState {
    pub period_type: PeriodKind,
    pub period_start_time: DateTime<Utc>,
    pub period_end_time: DateTime<Utc>,
    pub remaining_seconds: u64,
    /// Paused wall-clock time banked during the current watch period.
    pub pause_credit_seconds: u64,
    pub last_pause_instant: Option<DateTime<Utc>>,
    pub is_playing: bool,
}

impl SchedulerState {
    /// A watch period starting at `now`, paused until the shell reports play.
    pub fn fresh_watch(cadence: &Cadence, now: DateTime<Utc>) -> Self {
        let mut state = Self {
            period_type: PeriodKind::Watch,
            period_start_time: now,
            period_end_time: now + cadence.watch(),
            remaining_seconds: 0,
            pause_credit_seconds: 0,
            last_pause_instant: Some(now),
            is_playing: false,
        };
        state.sync_remaining(now);
        state
    }

    pub fn phase(&self) -> Phase {
        match (self.period_type, self.is_playing) {
            (PeriodKind::Break, _) => Phase::Break,
            (PeriodKind::Watch, true) => Phase::WatchPlaying,
            (PeriodKind::Watch, false) => Phase::WatchPaused,
        }
    }

    pub fn period_length_seconds(&self) -> u64 {
        let length = (self.period_end_time - self.period_start_time).num_seconds();
        cmp::max(length, 0) as u64
    }

    /// Remaining time derived from absolute instants, rounded up to whole
    /// seconds and clamped to `[0, period length]`.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        let remaining_ms = (self.period_end_time - now).num_milliseconds();
        if remaining_ms <= 0 {
            return 0;
        }
        let rounded_up = (remaining_ms as u64).div_ceil(1000);
        cmp::min(rounded_up, self.period_length_seconds())
    }

    pub fn sync_remaining(&mut self, now: DateTime<Utc>) -> u64 {
        self.remaining_seconds = self.remaining_at(now);
        self.remaining_seconds
    }

    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.period_end_time
    }

    pub fn begin_period(
        &mut self,
        kind: PeriodKind,
        length: Duration,
        now: DateTime<Utc>,
    ) {
        self.period_type = kind;
        self.period_start_time = now;
        self.period_end_time = now + length;
        self.pause_credit_seconds = 0;
        self.sync_remaining(now);
    }
}

pub(crate) fn seconds(value: u64) -> Duration {
    Duration::seconds(value.min(MAX_PERIOD_SECONDS) as i64)
}
