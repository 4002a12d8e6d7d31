use chrono::{DateTime, Utc};
use std::cmp;

use crate::models::{Interval, PeriodKind};

use super::projector::{project_from, PeriodAnchor};
use super::state::{seconds, Cadence, Phase, SchedulerState};

/// What the host has to act on after feeding the scheduler an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEffect {
    /// Watch time ran out while playing; the shell must stop playback.
    ForcePause,
    /// A play attempt during a break; playback must not start.
    RejectPlay,
    PauseStarted {
        at: DateTime<Utc>,
    },
    Resumed {
        credited_seconds: u64,
    },
    PeriodStarted {
        kind: PeriodKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Watch/break state machine. Every operation takes `now` explicitly; remaining
/// time is always derived from absolute instants.
#[derive(Debug, Clone)]
pub struct Scheduler {
    cadence: Cadence,
    horizon_seconds: u64,
    state: SchedulerState,
    intervals: Vec<Interval>,
}

impl Scheduler {
    pub fn new(cadence: Cadence, horizon_seconds: u64, now: DateTime<Utc>) -> Self {
        let mut scheduler = Self {
            cadence,
            horizon_seconds,
            state: SchedulerState::fresh_watch(&cadence, now),
            intervals: Vec::new(),
        };
        scheduler.reproject(now);
        scheduler
    }

    /// Resume from persisted state. The interval list is always re-projected
    /// from the restored period, so a stale persisted list never survives.
    pub fn restore(
        cadence: Cadence,
        horizon_seconds: u64,
        state: SchedulerState,
        intervals: Vec<Interval>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut scheduler = Self {
            cadence,
            horizon_seconds,
            state,
            intervals,
        };
        if scheduler.state.period_type == PeriodKind::Break {
            scheduler.state.is_playing = false;
        }
        scheduler.state.sync_remaining(now);
        scheduler.reproject(now);
        scheduler
    }

    pub fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.state.remaining_seconds
    }

    /// Whether the shell may offer play right now.
    pub fn play_enabled(&self) -> bool {
        self.state.period_type == PeriodKind::Watch && self.state.remaining_seconds > 0
    }

    /// Shell play/pause notification.
    pub fn on_play_state(&mut self, playing: bool, now: DateTime<Utc>) -> Vec<SchedulerEffect> {
        if playing {
            self.resume(now)
        } else {
            self.pause(now)
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Vec<SchedulerEffect> {
        match self.phase() {
            Phase::Break => vec![SchedulerEffect::RejectPlay],
            Phase::WatchPlaying => Vec::new(),
            Phase::WatchPaused => {
                let mut effects = Vec::new();
                let paused_for = self
                    .state
                    .last_pause_instant
                    .map(|paused_at| cmp::max((now - paused_at).num_seconds(), 0) as u64);

                match paused_for {
                    Some(paused_for) if paused_for >= self.cadence.break_seconds() => {
                        // The pause already counts as a full break.
                        self.state.last_pause_instant = None;
                        self.state.is_playing = true;
                        self.start_period(PeriodKind::Watch, self.cadence.watch_seconds(), now, &mut effects);
                    }
                    paused_for => {
                        let credited_seconds = paused_for.unwrap_or(0);
                        self.state.pause_credit_seconds = self
                            .state
                            .pause_credit_seconds
                            .saturating_add(credited_seconds);
                        self.state.last_pause_instant = None;
                        self.state.is_playing = true;
                        self.state.sync_remaining(now);
                        if credited_seconds > 0 {
                            self.reproject(now);
                        }
                        effects.push(SchedulerEffect::Resumed { credited_seconds });

                        // The period may have run out while paused.
                        if self.state.has_expired(now) {
                            effects.extend(self.tick(now));
                        }
                    }
                }
                effects
            }
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Vec<SchedulerEffect> {
        match self.phase() {
            Phase::WatchPlaying => {
                self.state.last_pause_instant = Some(now);
                self.state.is_playing = false;
                self.state.sync_remaining(now);
                vec![SchedulerEffect::PauseStarted { at: now }]
            }
            Phase::WatchPaused | Phase::Break => Vec::new(),
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<SchedulerEffect> {
        let mut effects = Vec::new();
        let remaining = self.state.sync_remaining(now);

        match self.phase() {
            Phase::WatchPlaying if remaining == 0 => {
                effects.push(SchedulerEffect::ForcePause);
                self.begin_break(now, &mut effects);
            }
            Phase::Break if remaining == 0 => {
                self.begin_watch_after_break(now, &mut effects);
            }
            // A paused watch period never moves to a break on its own; the
            // pause may still turn out long enough to count as one.
            Phase::WatchPlaying | Phase::WatchPaused | Phase::Break => {}
        }

        if self.projection_is_stale(now) {
            self.reproject(now);
        }

        effects
    }

    fn begin_break(&mut self, now: DateTime<Utc>, effects: &mut Vec<SchedulerEffect>) {
        let adjusted = self
            .cadence
            .adjusted_break_seconds(self.state.pause_credit_seconds);
        self.state.is_playing = false;
        self.state.last_pause_instant = None;
        self.start_period(PeriodKind::Break, adjusted, now, effects);

        if adjusted == 0 {
            self.begin_watch_after_break(now, effects);
        }
    }

    fn begin_watch_after_break(&mut self, now: DateTime<Utc>, effects: &mut Vec<SchedulerEffect>) {
        // Playback stays stopped until the shell reports play again.
        self.state.is_playing = false;
        self.state.last_pause_instant = Some(now);
        self.start_period(PeriodKind::Watch, self.cadence.watch_seconds(), now, effects);
    }

    fn start_period(
        &mut self,
        kind: PeriodKind,
        length_seconds: u64,
        now: DateTime<Utc>,
        effects: &mut Vec<SchedulerEffect>,
    ) {
        self.state.begin_period(kind, seconds(length_seconds), now);
        self.reproject(now);
        effects.push(SchedulerEffect::PeriodStarted {
            kind,
            start: self.state.period_start_time,
            end: self.state.period_end_time,
        });
    }

    /// A pause this long already counts as the break.
    fn pause_covers_break(&self, now: DateTime<Utc>) -> bool {
        self.phase() == Phase::WatchPaused
            && self.state.last_pause_instant.is_some_and(|paused_at| {
                (now - paused_at).num_seconds() >= self.cadence.break_seconds() as i64
            })
    }

    fn projection_is_stale(&self, now: DateTime<Utc>) -> bool {
        let horizon_end = now + seconds(self.horizon_seconds);
        self.pause_covers_break(now)
            || !matches!(
                self.intervals.last(),
                Some(interval) if interval.end_time >= horizon_end
            )
    }

    fn reproject(&mut self, now: DateTime<Utc>) {
        // After a long pause the next play opens a fresh watch period, so the
        // dial shows that cycle starting now.
        let (anchor, credit) = if self.pause_covers_break(now) {
            let anchor = PeriodAnchor {
                kind: PeriodKind::Watch,
                start: now,
                length_seconds: self.cadence.watch_seconds(),
            };
            (anchor, 0)
        } else {
            let anchor = PeriodAnchor {
                kind: self.state.period_type,
                start: self.state.period_start_time,
                length_seconds: self.state.period_length_seconds(),
            };
            (anchor, self.state.pause_credit_seconds)
        };
        let horizon_end = cmp::max(now, anchor.start) + seconds(self.horizon_seconds);
        self.intervals = project_from(anchor, &self.cadence, credit, horizon_end);
    }
}
