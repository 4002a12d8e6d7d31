use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::Database;
use crate::snapshot::SnapshotStore;

impl Database {
    pub async fn get_snapshot(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let payload = conn
                .query_row(
                    "SELECT payload FROM snapshots WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .with_context(|| format!("failed to read snapshot '{key}'"))?;
            Ok(payload)
        })
        .await
    }

    pub async fn upsert_snapshot(&self, key: &str, payload: String) -> Result<()> {
        let key = key.to_string();
        let updated_at = Utc::now().to_rfc3339();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO snapshots (key, payload, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     payload = excluded.payload,
                     updated_at = excluded.updated_at",
                params![key, payload, updated_at],
            )
            .with_context(|| "failed to write snapshot")?;
            Ok(())
        })
        .await
    }
}

impl SnapshotStore for Database {
    async fn load_snapshot(&self, key: &str) -> Result<Option<String>> {
        self.get_snapshot(key).await
    }

    async fn save_snapshot(&self, key: &str, payload: String) -> Result<()> {
        self.upsert_snapshot(key, payload).await
    }
}
