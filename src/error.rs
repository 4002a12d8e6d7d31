use thiserror::Error;

/// Domain failures of the scheduling core. None of them is fatal: callers
/// degrade to a fresh watch period or keep ticking without playback control.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WidgetError {
    #[error("invalid duration for {field}: {value}s (must be greater than zero)")]
    InvalidDuration { field: &'static str, value: u64 },

    #[error("snapshot is corrupt: {0}")]
    SnapshotCorrupt(String),

    #[error("player shell unavailable: {0}")]
    PlayerShellUnavailable(String),
}

impl WidgetError {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        WidgetError::SnapshotCorrupt(reason.into())
    }
}
