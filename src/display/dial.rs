//! Angles for the analog clock face. Angles are in degrees, clockwise from
//! twelve o'clock; the interval ring is laid out on the minute dial.

use chrono::{NaiveTime, TimeZone, Timelike};
use serde::Serialize;

use crate::models::{Interval, IntervalStatus};

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HandAngles {
    pub hour: f64,
    pub minute: f64,
    pub second: f64,
}

impl HandAngles {
    pub fn at(time: NaiveTime) -> Self {
        let hours = f64::from(time.hour() % 12);
        let minutes = f64::from(time.minute());
        let seconds = f64::from(time.second());

        Self {
            hour: (hours + minutes / 60.0) * 30.0,
            minute: (minutes + seconds / 60.0) * 6.0,
            second: seconds * 6.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sector {
    pub start_angle: f64,
    pub end_angle: f64,
    pub large_arc: bool,
    pub opacity: f64,
}

impl Sector {
    /// Sector for an interval as seen on a wall clock in `tz`.
    pub fn for_interval<Tz: TimeZone>(interval: &Interval, tz: &Tz) -> Self {
        let start_angle = minute_angle(interval.start_time.with_timezone(tz).time());
        let end_angle = minute_angle(interval.end_time.with_timezone(tz).time());
        let sweep = (end_angle - start_angle + 360.0) % 360.0;

        Self {
            start_angle,
            end_angle,
            large_arc: sweep > 180.0,
            opacity: interval.status.map(status_opacity).unwrap_or(1.0),
        }
    }
}

fn minute_angle(time: NaiveTime) -> f64 {
    f64::from(time.minute()) * 6.0
}

pub fn status_opacity(status: IntervalStatus) -> f64 {
    match status {
        IntervalStatus::Current => 0.7,
        IntervalStatus::Upcoming => 0.4,
        IntervalStatus::Passed => 0.2,
    }
}
