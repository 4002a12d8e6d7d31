use chrono::{DateTime, Duration, Utc};

use crate::models::{Interval, IntervalStatus};
use crate::schedule::state::seconds;

pub const DEFAULT_LOOKBEHIND_SECS: u64 = 5 * 60;
pub const DEFAULT_LOOKAHEAD_SECS: u64 = 45 * 60;

/// The slice of time drawn on the clock face, relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayWindow {
    pub lookbehind: Duration,
    pub lookahead: Duration,
}

impl Default for DisplayWindow {
    fn default() -> Self {
        Self::from_secs(DEFAULT_LOOKBEHIND_SECS, DEFAULT_LOOKAHEAD_SECS)
    }
}

impl DisplayWindow {
    pub fn from_secs(lookbehind: u64, lookahead: u64) -> Self {
        Self {
            lookbehind: seconds(lookbehind),
            lookahead: seconds(lookahead),
        }
    }

    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - self.lookbehind, now + self.lookahead)
    }
}

/// Filters `intervals` to the window around `now`, clips them to its edges and
/// tags each with its status. Input order is preserved.
pub fn classify(intervals: &[Interval], now: DateTime<Utc>, window: DisplayWindow) -> Vec<Interval> {
    let (window_start, window_end) = window.bounds(now);

    intervals
        .iter()
        .filter(|interval| interval.end_time > window_start && interval.start_time < window_end)
        .map(|interval| {
            let mut clipped = interval.clone();
            if clipped.start_time < window_start {
                clipped.start_time = window_start;
            }
            if clipped.end_time > window_end {
                clipped.end_time = window_end;
            }
            let status = status_at(&clipped, now);
            clipped.with_status(status)
        })
        .collect()
}

pub fn status_at(interval: &Interval, now: DateTime<Utc>) -> IntervalStatus {
    if interval.end_time <= now {
        IntervalStatus::Passed
    } else if interval.start_time > now {
        IntervalStatus::Upcoming
    } else {
        IntervalStatus::Current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PeriodKind;
    use crate::schedule::project;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn interval(start: i64, end: i64, kind: PeriodKind) -> Interval {
        Interval::new(at(start), at(end), kind)
    }

    #[test]
    fn drops_intervals_outside_the_window() {
        let now = at(10_000);
        let intervals = vec![
            interval(10_000 - 600, 10_000 - 400, PeriodKind::Watch),
            interval(10_000 - 400, 10_000 - 300, PeriodKind::Break),
            interval(10_000 + 2700, 10_000 + 3000, PeriodKind::Watch),
            interval(10_000 + 2800, 10_000 + 3000, PeriodKind::Break),
        ];

        assert!(classify(&intervals, now, DisplayWindow::default()).is_empty());
    }

    #[test]
    fn clips_to_window_edges() {
        let now = at(10_000);
        let intervals = vec![
            interval(10_000 - 900, 10_000 - 100, PeriodKind::Watch),
            interval(10_000 - 100, 10_000 + 3600, PeriodKind::Break),
        ];

        let classified = classify(&intervals, now, DisplayWindow::default());
        assert_eq!(classified.len(), 2);
        assert_eq!(classified[0].start_time, at(10_000 - 300));
        assert_eq!(classified[0].end_time, at(10_000 - 100));
        assert_eq!(classified[1].start_time, at(10_000 - 100));
        assert_eq!(classified[1].end_time, at(10_000 + 2700));
    }

    #[test]
    fn assigns_status_relative_to_now() {
        let now = at(1_000);
        let intervals = vec![
            interval(800, 1_000, PeriodKind::Watch),
            interval(1_000, 1_060, PeriodKind::Break),
            interval(1_060, 1_120, PeriodKind::Watch),
        ];

        let statuses: Vec<_> = classify(&intervals, now, DisplayWindow::default())
            .into_iter()
            .map(|interval| interval.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                Some(IntervalStatus::Passed),
                Some(IntervalStatus::Current),
                Some(IntervalStatus::Upcoming),
            ]
        );
    }

    #[test]
    fn is_idempotent_and_order_preserving() {
        let now = at(1_234);
        let intervals = project(at(0), 480, 120, 7_200).unwrap();

        let once = classify(&intervals, now, DisplayWindow::default());
        let twice = classify(&once, now, DisplayWindow::default());
        assert_eq!(once, twice);
        assert!(once.windows(2).all(|pair| pair[0].start_time < pair[1].start_time));
    }

    #[test]
    fn honors_custom_window() {
        let now = at(1_000);
        let intervals = vec![interval(0, 2_000, PeriodKind::Watch)];
        let classified = classify(&intervals, now, DisplayWindow::from_secs(60, 120));

        assert_eq!(classified[0].start_time, at(940));
        assert_eq!(classified[0].end_time, at(1_120));
        assert_eq!(classified[0].status, Some(IntervalStatus::Current));
    }
}
