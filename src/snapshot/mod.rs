use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WidgetError;
use crate::models::{is_contiguous, Interval};
use crate::schedule::SchedulerState;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Key/value storage for persisted widget state. Loaded once at startup and
/// written after each mutation; callers treat failures as best-effort.
pub trait SnapshotStore: Clone + Send + Sync + 'static {
    fn load_snapshot(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    fn save_snapshot(&self, key: &str, payload: String) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub state: SchedulerState,
    pub intervals: Vec<Interval>,
}

impl Snapshot {
    pub fn new(state: SchedulerState, intervals: Vec<Interval>, saved_at: DateTime<Utc>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at,
            state,
            intervals,
        }
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| anyhow!("failed to encode snapshot: {err}"))
    }

    pub fn decode(payload: &str) -> Result<Self, WidgetError> {
        let snapshot: Snapshot = serde_json::from_str(payload)
            .map_err(|err| WidgetError::corrupt(format!("invalid JSON: {err}")))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(WidgetError::corrupt(format!(
                "unsupported version {}",
                snapshot.version
            )));
        }
        if snapshot.state.period_start_time > snapshot.state.period_end_time {
            return Err(WidgetError::corrupt("period ends before it starts"));
        }
        if !is_contiguous(&snapshot.intervals) {
            return Err(WidgetError::corrupt("intervals are not contiguous"));
        }

        Ok(snapshot)
    }
}

/// In-process store; contents vanish with the process.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: &str, payload: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), payload.into());
    }
}

impl SnapshotStore for MemorySnapshotStore {
    async fn load_snapshot(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    async fn save_snapshot(&self, key: &str, payload: String) -> Result<()> {
        self.insert(key, payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Cadence, Scheduler};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample() -> Snapshot {
        let scheduler = Scheduler::new(Cadence::new(60, 30).unwrap(), 600, at(0));
        Snapshot::new(
            scheduler.state().clone(),
            scheduler.intervals().to_vec(),
            at(0),
        )
    }

    #[test]
    fn encoded_snapshot_decodes() {
        let snapshot = sample();
        let payload = snapshot.encode().unwrap();
        assert!(payload.contains("\"periodType\":\"watch\""));
        assert!(payload.contains("\"pauseCreditSeconds\":0"));
        assert_eq!(Snapshot::decode(&payload).unwrap(), snapshot);
    }

    #[test]
    fn malformed_payload_is_corrupt() {
        assert!(matches!(
            Snapshot::decode("{not json"),
            Err(WidgetError::SnapshotCorrupt(_))
        ));
    }

    #[test]
    fn inconsistent_snapshot_is_corrupt() {
        let mut snapshot = sample();
        snapshot.state.period_end_time = at(-10);
        let payload = snapshot.encode().unwrap();
        assert!(matches!(
            Snapshot::decode(&payload),
            Err(WidgetError::SnapshotCorrupt(_))
        ));

        let mut snapshot = sample();
        snapshot.version = 99;
        assert!(Snapshot::decode(&snapshot.encode().unwrap()).is_err());

        let mut snapshot = sample();
        snapshot.intervals.remove(1);
        assert!(Snapshot::decode(&snapshot.encode().unwrap()).is_err());
    }

    #[tokio::test]
    async fn memory_store_round_trips_payloads() {
        let store = MemorySnapshotStore::new();
        assert_eq!(store.load_snapshot("widget").await.unwrap(), None);

        store.save_snapshot("widget", "{}".to_string()).await.unwrap();
        assert_eq!(store.load_snapshot("widget").await.unwrap(), Some("{}".to_string()));
    }
}
