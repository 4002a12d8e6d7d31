pub mod interval;

pub use interval::{is_contiguous, Interval, IntervalStatus, PeriodKind};
