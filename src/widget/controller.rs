use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::display::DisplayWindow;
use crate::error::WidgetError;
use crate::player::{CueThresholds, PlayerEvent, PlayerShell};
use crate::schedule::{Phase, Scheduler, SchedulerEffect};
use crate::settings::WidgetSettings;
use crate::snapshot::{Snapshot, SnapshotStore};

use super::clock::Clock;
use super::view::WidgetView;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

struct WidgetCore<S: SnapshotStore> {
    scheduler: Mutex<Scheduler>,
    video_duration: Mutex<Option<f64>>,
    store: S,
    session_key: String,
    player: Arc<dyn PlayerShell>,
    clock: Arc<dyn Clock>,
    window: DisplayWindow,
    thresholds: CueThresholds,
    view_tx: watch::Sender<WidgetView>,
}

struct TickerGuard {
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Drop for TickerGuard {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Drives the scheduler from player events and a once-per-second tick, keeps
/// the snapshot current and publishes a [`WidgetView`] after every change.
pub struct WidgetController<S: SnapshotStore> {
    core: Arc<WidgetCore<S>>,
    ticker: Option<TickerGuard>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
}

impl<S: SnapshotStore> WidgetController<S> {
    /// Builds the controller from the persisted snapshot, or from a fresh
    /// watch period when there is none or it cannot be used.
    pub async fn restore(
        settings: &WidgetSettings,
        store: S,
        player: Arc<dyn PlayerShell>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WidgetError> {
        settings.validate()?;
        let cadence = settings.cadence()?;
        let now = clock.now();

        let restored = match store.load_snapshot(&settings.session_key).await {
            Ok(Some(payload)) => match Snapshot::decode(&payload) {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    log_warn!("Discarding stored widget state: {err}");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                log_warn!("Failed to read widget state, starting fresh: {err:?}");
                None
            }
        };

        let scheduler = match restored {
            Some(snapshot) => {
                let saved_at = snapshot.saved_at;
                let mut scheduler = Scheduler::restore(
                    cadence,
                    settings.horizon_seconds,
                    snapshot.state,
                    snapshot.intervals,
                    now,
                );
                // The embed reloads stopped; treat the gap as a pause.
                if scheduler.phase() == Phase::WatchPlaying {
                    scheduler.pause(saved_at);
                }
                scheduler.tick(now);
                log_info!(
                    "Restored {} period ending at {}",
                    scheduler.state().period_type.as_str(),
                    scheduler.state().period_end_time
                );
                scheduler
            }
            None => {
                log_info!(
                    "Starting fresh watch period ({}s watch / {}s break)",
                    cadence.watch_seconds(),
                    cadence.break_seconds()
                );
                Scheduler::new(cadence, settings.horizon_seconds, now)
            }
        };

        let window = settings.display_window();
        let thresholds = settings.cue_thresholds();
        let initial_view = WidgetView::build(&scheduler, now, window, &thresholds, None);
        let (view_tx, _) = watch::channel(initial_view);

        let debug_mode = std::env::var("SCREENBREAK_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let controller = Self {
            core: Arc::new(WidgetCore {
                scheduler: Mutex::new(scheduler),
                video_duration: Mutex::new(None),
                store,
                session_key: settings.session_key.clone(),
                player,
                clock,
                window,
                thresholds,
                view_tx,
            }),
            ticker: None,
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if debug_mode { 1 } else { 60 },
        };

        controller.core.persist(now).await;
        controller.core.publish(now).await;
        Ok(controller)
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<WidgetView> {
        self.core.view_tx.subscribe()
    }

    pub fn view(&self) -> WidgetView {
        self.core.view_tx.borrow().clone()
    }

    pub async fn handle_player_event(&self, event: PlayerEvent) -> Vec<SchedulerEffect> {
        self.core.handle_player_event(event).await
    }

    pub async fn tick(&self) -> Vec<SchedulerEffect> {
        self.core.tick().await
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker
            .as_ref()
            .and_then(|guard| guard.handle.as_ref())
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Starts the recurring tick. Restarting replaces the previous ticker.
    pub fn start(&mut self) {
        // Dropping the old guard cancels its task.
        self.ticker = None;

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(run_ticker(
            self.core.clone(),
            self.tick_interval,
            self.heartbeat_every_ticks,
            cancel_token.clone(),
        ));

        self.ticker = Some(TickerGuard {
            cancel_token,
            handle: Some(handle),
        });
    }

    /// Stops the ticker and waits for it to finish its current tick.
    pub async fn shutdown(&mut self) {
        if let Some(mut guard) = self.ticker.take() {
            guard.cancel_token.cancel();
            if let Some(handle) = guard.handle.take() {
                if let Err(err) = handle.await {
                    log_warn!("Ticker task ended abnormally: {err}");
                }
            }
        }
    }
}

async fn run_ticker<S: SnapshotStore>(
    core: Arc<WidgetCore<S>>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
    cancel_token: CancellationToken,
) {
    let mut interval = time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks: u32 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                core.tick().await;

                ticks = ticks.wrapping_add(1);
                if heartbeat_every_ticks > 0 && ticks % heartbeat_every_ticks == 0 {
                    let view = core.view_tx.borrow().clone();
                    log_debug!("{}", view.summary());
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("Widget ticker shutting down");
                break;
            }
        }
    }
}

impl<S: SnapshotStore> WidgetCore<S> {
    async fn handle_player_event(&self, event: PlayerEvent) -> Vec<SchedulerEffect> {
        let now = self.clock.now();
        match event {
            PlayerEvent::Ready { duration_seconds } => {
                *self.video_duration.lock().await = Some(duration_seconds);
                log_info!("Player ready, video is {duration_seconds:.0}s long");
                self.publish(now).await;
                Vec::new()
            }
            PlayerEvent::StateChange { playing } => {
                let effects = self.scheduler.lock().await.on_play_state(playing, now);
                self.apply_effects(&effects);
                if !effects.is_empty() {
                    self.persist(now).await;
                }
                self.publish(now).await;
                effects
            }
        }
    }

    async fn tick(&self) -> Vec<SchedulerEffect> {
        let now = self.clock.now();
        let effects = self.scheduler.lock().await.tick(now);
        self.apply_effects(&effects);
        // Every tick moves remaining time, so `saved_at` stays within one tick
        // of a reload.
        self.persist(now).await;
        self.publish(now).await;
        effects
    }

    fn apply_effects(&self, effects: &[SchedulerEffect]) {
        for effect in effects {
            match effect {
                SchedulerEffect::ForcePause | SchedulerEffect::RejectPlay => {
                    if let Err(err) = self.player.pause() {
                        log_warn!("Pause request dropped: {err}");
                    }
                }
                SchedulerEffect::PeriodStarted { kind, start, end } => {
                    log_info!(
                        "{} period {} -> {}",
                        kind.label(),
                        start.format("%H:%M:%S"),
                        end.format("%H:%M:%S")
                    );
                }
                SchedulerEffect::Resumed { credited_seconds } if *credited_seconds > 0 => {
                    log_debug!("Credited {credited_seconds}s of pause toward the next break");
                }
                SchedulerEffect::Resumed { .. } | SchedulerEffect::PauseStarted { .. } => {}
            }
        }
    }

    /// Best-effort write; a failure is retried by the next mutation.
    async fn persist(&self, now: DateTime<Utc>) {
        let snapshot = {
            let scheduler = self.scheduler.lock().await;
            Snapshot::new(
                scheduler.state().clone(),
                scheduler.intervals().to_vec(),
                now,
            )
        };

        let payload = match snapshot.encode() {
            Ok(payload) => payload,
            Err(err) => {
                log_warn!("Skipping snapshot write: {err:?}");
                return;
            }
        };

        if let Err(err) = self.store.save_snapshot(&self.session_key, payload).await {
            log_warn!("Failed to save widget state: {err:?}");
        }
    }

    async fn publish(&self, now: DateTime<Utc>) {
        let video_duration = *self.video_duration.lock().await;
        let view = {
            let scheduler = self.scheduler.lock().await;
            WidgetView::build(&scheduler, now, self.window, &self.thresholds, video_duration)
        };

        if let Err(err) = self
            .player
            .apply_limit(view.remaining_seconds, view.play_enabled)
        {
            log_debug!("Limit not applied: {err}");
        }
        self.view_tx.send_replace(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PeriodKind;
    use crate::player::DetachedShell;
    use crate::snapshot::MemorySnapshotStore;
    use chrono::TimeZone;
    use std::sync::Mutex as StdMutex;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    struct ManualClock(StdMutex<DateTime<Utc>>);

    impl ManualClock {
        fn new(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(StdMutex::new(now)))
        }

        fn set(&self, now: DateTime<Utc>) {
            *self.0.lock().unwrap() = now;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    #[derive(Default)]
    struct RecordingShell {
        pauses: StdMutex<u32>,
        limits: StdMutex<Vec<(u64, bool)>>,
    }

    impl RecordingShell {
        fn pauses(&self) -> u32 {
            *self.pauses.lock().unwrap()
        }

        fn last_limit(&self) -> Option<(u64, bool)> {
            self.limits.lock().unwrap().last().copied()
        }
    }

    impl PlayerShell for RecordingShell {
        fn pause(&self) -> Result<(), WidgetError> {
            *self.pauses.lock().unwrap() += 1;
            Ok(())
        }

        fn apply_limit(&self, remaining_seconds: u64, play_enabled: bool) -> Result<(), WidgetError> {
            self.limits
                .lock()
                .unwrap()
                .push((remaining_seconds, play_enabled));
            Ok(())
        }
    }

    fn settings() -> WidgetSettings {
        WidgetSettings {
            watch_seconds: 60,
            break_seconds: 30,
            ..WidgetSettings::default()
        }
    }

    fn stored_snapshot(store: &MemorySnapshotStore) -> Snapshot {
        let payload = store.get(&settings().session_key).expect("snapshot written");
        Snapshot::decode(&payload).unwrap()
    }

    #[tokio::test]
    async fn fresh_start_is_persisted_and_published() {
        let store = MemorySnapshotStore::new();
        let shell = Arc::new(RecordingShell::default());
        let clock = ManualClock::new(at(0));

        let controller = WidgetController::restore(&settings(), store.clone(), shell.clone(), clock)
            .await
            .unwrap();

        let view = controller.view();
        assert_eq!(view.phase, Phase::WatchPaused);
        assert_eq!(view.remaining_seconds, 60);
        assert!(view.play_enabled);
        assert_eq!(view.cues.countdown, "1:00");
        assert_eq!(shell.last_limit(), Some((60, true)));
        assert_eq!(stored_snapshot(&store).state.period_end_time, at(60));
    }

    #[tokio::test]
    async fn watch_expiry_forces_pause_and_starts_break() {
        let store = MemorySnapshotStore::new();
        let shell = Arc::new(RecordingShell::default());
        let clock = ManualClock::new(at(0));
        let controller =
            WidgetController::restore(&settings(), store.clone(), shell.clone(), clock.clone())
                .await
                .unwrap();

        controller
            .handle_player_event(PlayerEvent::StateChange { playing: true })
            .await;
        clock.set(at(10));
        controller
            .handle_player_event(PlayerEvent::StateChange { playing: false })
            .await;
        clock.set(at(15));
        controller
            .handle_player_event(PlayerEvent::StateChange { playing: true })
            .await;

        clock.set(at(60));
        let effects = controller.tick().await;
        assert_eq!(effects[0], SchedulerEffect::ForcePause);
        assert_eq!(shell.pauses(), 1);

        let view = controller.view();
        assert_eq!(view.period_type, PeriodKind::Break);
        assert_eq!(view.remaining_seconds, 25);
        assert!(!view.play_enabled);
        assert_eq!(shell.last_limit(), Some((25, false)));
        assert_eq!(stored_snapshot(&store).state.period_type, PeriodKind::Break);
    }

    #[tokio::test]
    async fn play_during_break_is_pushed_back() {
        let shell = Arc::new(RecordingShell::default());
        let clock = ManualClock::new(at(0));
        let controller = WidgetController::restore(
            &settings(),
            MemorySnapshotStore::new(),
            shell.clone(),
            clock.clone(),
        )
        .await
        .unwrap();

        controller
            .handle_player_event(PlayerEvent::StateChange { playing: true })
            .await;
        clock.set(at(61));
        controller.tick().await;
        let pauses_after_break = shell.pauses();

        let effects = controller
            .handle_player_event(PlayerEvent::StateChange { playing: true })
            .await;
        assert_eq!(effects, vec![SchedulerEffect::RejectPlay]);
        assert_eq!(shell.pauses(), pauses_after_break + 1);
        assert_eq!(controller.view().phase, Phase::Break);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_replaced_with_fresh_state() {
        let store = MemorySnapshotStore::new();
        store.insert(&settings().session_key, "{\"version\":1,\"state\":");
        let clock = ManualClock::new(at(500));

        let controller = WidgetController::restore(
            &settings(),
            store.clone(),
            Arc::new(RecordingShell::default()),
            clock,
        )
        .await
        .unwrap();

        assert_eq!(controller.view().phase, Phase::WatchPaused);
        assert_eq!(controller.view().remaining_seconds, 60);
        assert_eq!(stored_snapshot(&store).state.period_start_time, at(500));
    }

    #[tokio::test]
    async fn reload_resumes_mid_cycle() {
        let store = MemorySnapshotStore::new();
        let clock = ManualClock::new(at(0));
        let first = WidgetController::restore(
            &settings(),
            store.clone(),
            Arc::new(RecordingShell::default()),
            clock.clone(),
        )
        .await
        .unwrap();
        first
            .handle_player_event(PlayerEvent::StateChange { playing: true })
            .await;
        drop(first);

        // Reloaded 10s later: the period kept running, the gap is a pause.
        clock.set(at(10));
        let second = WidgetController::restore(
            &settings(),
            store.clone(),
            Arc::new(RecordingShell::default()),
            clock.clone(),
        )
        .await
        .unwrap();

        let view = second.view();
        assert_eq!(view.phase, Phase::WatchPaused);
        assert_eq!(view.remaining_seconds, 50);
        assert_eq!(stored_snapshot(&store).state.last_pause_instant, Some(at(0)));

        clock.set(at(12));
        let effects = second
            .handle_player_event(PlayerEvent::StateChange { playing: true })
            .await;
        assert_eq!(effects, vec![SchedulerEffect::Resumed { credited_seconds: 12 }]);
    }

    #[tokio::test]
    async fn reload_while_playing_keeps_the_running_period() {
        let store = MemorySnapshotStore::new();
        let clock = ManualClock::new(at(0));
        let first = WidgetController::restore(
            &settings(),
            store.clone(),
            Arc::new(RecordingShell::default()),
            clock.clone(),
        )
        .await
        .unwrap();
        first
            .handle_player_event(PlayerEvent::StateChange { playing: true })
            .await;
        for secs in 1..=50 {
            clock.set(at(secs));
            first.tick().await;
        }
        assert_eq!(first.view().remaining_seconds, 10);
        assert_eq!(stored_snapshot(&store).saved_at, at(50));
        drop(first);

        clock.set(at(51));
        let second = WidgetController::restore(
            &settings(),
            store.clone(),
            Arc::new(RecordingShell::default()),
            clock.clone(),
        )
        .await
        .unwrap();
        let effects = second
            .handle_player_event(PlayerEvent::StateChange { playing: true })
            .await;

        assert_eq!(effects, vec![SchedulerEffect::Resumed { credited_seconds: 1 }]);
        let view = second.view();
        assert_eq!(view.phase, Phase::WatchPlaying);
        assert_eq!(view.remaining_seconds, 9);
        assert_eq!(view.period_end_time, at(60));
    }

    #[tokio::test]
    async fn unavailable_player_does_not_stop_the_clock() {
        let clock = ManualClock::new(at(0));
        let controller = WidgetController::restore(
            &settings(),
            MemorySnapshotStore::new(),
            Arc::new(DetachedShell::new("embed failed to load")),
            clock.clone(),
        )
        .await
        .unwrap();

        controller
            .handle_player_event(PlayerEvent::StateChange { playing: true })
            .await;
        clock.set(at(60));
        controller.tick().await;
        assert_eq!(controller.view().phase, Phase::Break);

        clock.set(at(90));
        controller.tick().await;
        assert_eq!(controller.view().phase, Phase::WatchPaused);
    }

    #[tokio::test]
    async fn ready_event_records_video_duration() {
        let controller = WidgetController::restore(
            &settings(),
            MemorySnapshotStore::new(),
            Arc::new(RecordingShell::default()),
            ManualClock::new(at(0)),
        )
        .await
        .unwrap();

        controller
            .handle_player_event(PlayerEvent::Ready {
                duration_seconds: 212.0,
            })
            .await;
        assert_eq!(controller.view().video_duration_seconds, Some(212.0));
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected() {
        let mut bad = settings();
        bad.break_seconds = 0;
        let result = WidgetController::restore(
            &bad,
            MemorySnapshotStore::new(),
            Arc::new(RecordingShell::default()),
            ManualClock::new(at(0)),
        )
        .await;
        assert!(matches!(result, Err(WidgetError::InvalidDuration { .. })));
    }

    #[tokio::test]
    async fn ticker_runs_until_shutdown() {
        let clock = ManualClock::new(at(0));
        let mut controller = WidgetController::restore(
            &settings(),
            MemorySnapshotStore::new(),
            Arc::new(RecordingShell::default()),
            clock.clone(),
        )
        .await
        .unwrap()
        .with_tick_interval(Duration::from_millis(10));

        controller
            .handle_player_event(PlayerEvent::StateChange { playing: true })
            .await;
        let mut updates = controller.subscribe();
        controller.start();
        assert!(controller.is_ticking());

        clock.set(at(60));
        let reached_break = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if updates.borrow_and_update().phase == Phase::Break {
                    break;
                }
                if updates.changed().await.is_err() {
                    break;
                }
            }
        })
        .await;
        assert!(reached_break.is_ok());
        assert_eq!(controller.view().phase, Phase::Break);

        controller.shutdown().await;
        assert!(!controller.is_ticking());
    }
}
