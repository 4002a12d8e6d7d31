pub mod cues;
pub mod shell;

pub use cues::{format_countdown, CueThresholds, ViewerCues};
pub use shell::{DetachedShell, HeadlessShell, PlayerEvent, PlayerShell};
