mod db;
pub mod display;
pub mod error;
pub mod models;
pub mod player;
pub mod schedule;
mod settings;
pub mod snapshot;
mod utils;
pub mod widget;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};

pub use db::Database;
pub use error::WidgetError;
pub use settings::{SettingsStore, WidgetSettings};

use player::{HeadlessShell, PlayerEvent, PlayerShell};
use schedule::Phase;
use widget::{SystemClock, WidgetController};

const HELP: &str = "commands: play, pause, ready <seconds>, status, quit";

fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("SCREENBREAK_DATA_DIR") {
        return PathBuf::from(dir);
    }
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".screenbreak")
}

/// Headless driver: restores the widget, ticks it once per second and maps
/// stdin commands onto player events.
pub async fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("screenbreak starting up...");

    let data_dir = data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings_store = SettingsStore::new(data_dir.join("settings.json"))?;
    let settings = settings_store.widget();
    let database = Database::new(data_dir.join("screenbreak.sqlite3"))?;

    let player: Arc<dyn PlayerShell> = Arc::new(HeadlessShell::new(settings.video_id.clone()));
    let mut controller =
        WidgetController::restore(&settings, database, player, Arc::new(SystemClock)).await?;
    controller.start();

    let mut updates = controller.subscribe();
    let mut last_phase = controller.view().phase;
    println!("{}", controller.view().summary());
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                let mut words = line.split_whitespace();
                match (words.next(), words.next()) {
                    (Some("play"), _) => {
                        controller
                            .handle_player_event(PlayerEvent::StateChange { playing: true })
                            .await;
                    }
                    (Some("pause"), _) => {
                        controller
                            .handle_player_event(PlayerEvent::StateChange { playing: false })
                            .await;
                    }
                    (Some("ready"), Some(seconds)) => match seconds.parse::<f64>() {
                        Ok(duration_seconds) => {
                            controller
                                .handle_player_event(PlayerEvent::Ready { duration_seconds })
                                .await;
                        }
                        Err(_) => println!("not a number: {seconds}"),
                    },
                    (Some("status"), _) => println!("{}", controller.view().summary()),
                    (Some("quit") | Some("exit"), _) => break,
                    (None, _) => {}
                    _ => println!("{HELP}"),
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                if view.phase != last_phase {
                    if view.phase == Phase::Break && last_phase == Phase::WatchPlaying {
                        println!("time is up, take a break");
                    }
                    println!("{}", view.summary());
                    last_phase = view.phase;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.shutdown().await;
    info!("screenbreak stopped");
    Ok(())
}
