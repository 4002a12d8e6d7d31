use chrono::{DateTime, Utc};

use crate::error::WidgetError;
use crate::models::{Interval, PeriodKind};

use super::state::{seconds, Cadence};

/// The period a projection is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodAnchor {
    pub kind: PeriodKind,
    pub start: DateTime<Utc>,
    pub length_seconds: u64,
}

/// Alternating watch/break intervals from `start` (watch first) covering at
/// least `horizon_seconds`.
pub fn project(
    start: DateTime<Utc>,
    watch_seconds: u64,
    break_seconds: u64,
    horizon_seconds: u64,
) -> Result<Vec<Interval>, WidgetError> {
    if watch_seconds.saturating_add(break_seconds) == 0 {
        return Err(WidgetError::InvalidDuration {
            field: "watch_seconds + break_seconds",
            value: 0,
        });
    }

    let anchor = PeriodAnchor {
        kind: PeriodKind::Watch,
        start,
        length_seconds: watch_seconds,
    };
    let horizon_end = start + seconds(horizon_seconds);

    Ok(project_periods(
        anchor,
        watch_seconds,
        break_seconds,
        0,
        horizon_end,
    ))
}

/// Projection anchored on the current period. The first break after a watch
/// anchor is shortened by `pause_credit_seconds`; later breaks are full length.
pub fn project_from(
    anchor: PeriodAnchor,
    cadence: &Cadence,
    pause_credit_seconds: u64,
    horizon_end: DateTime<Utc>,
) -> Vec<Interval> {
    project_periods(
        anchor,
        cadence.watch_seconds(),
        cadence.break_seconds(),
        pause_credit_seconds,
        horizon_end,
    )
}

// Callers guarantee watch_seconds + break_seconds > 0.
fn project_periods(
    anchor: PeriodAnchor,
    watch_seconds: u64,
    break_seconds: u64,
    pause_credit_seconds: u64,
    horizon_end: DateTime<Utc>,
) -> Vec<Interval> {
    let mut intervals = Vec::new();
    let mut kind = anchor.kind;
    let mut cursor = anchor.start;
    let mut length = anchor.length_seconds;
    let mut pending_credit = match anchor.kind {
        PeriodKind::Watch => pause_credit_seconds,
        PeriodKind::Break => 0,
    };

    loop {
        let end = cursor + seconds(length);
        // Zero-length periods keep their place in the cycle but are not drawn.
        if length > 0 {
            intervals.push(Interval::new(cursor, end, kind));
        }
        cursor = end;

        if cursor >= horizon_end && !intervals.is_empty() {
            break;
        }

        kind = kind.next();
        length = match kind {
            PeriodKind::Watch => watch_seconds,
            PeriodKind::Break => {
                let adjusted = break_seconds.saturating_sub(pending_credit);
                pending_credit = 0;
                adjusted
            }
        };
    }

    intervals
}
