use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::{helpers::parse_datetime, models::CachedSnapshot, Database};
use crate::models::HosSnapshot;

impl Database {
    /// Keeps only the most recent snapshot.
    pub async fn save_snapshot(&self, snapshot: &HosSnapshot, fetched_at: DateTime<Utc>) -> Result<()> {
        let payload = serde_json::to_string(snapshot).context("failed to serialize snapshot")?;
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO snapshot_cache (id, payload, fetched_at)
                 VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, fetched_at = excluded.fetched_at",
                params![payload, fetched_at.to_rfc3339()],
            )
            .context("failed to store snapshot")?;
            Ok(())
        })
        .await
    }

    pub async fn load_snapshot(&self) -> Result<Option<CachedSnapshot>> {
        self.execute(|conn| {
            let row = conn
                .query_row(
                    "SELECT payload, fetched_at FROM snapshot_cache WHERE id = 1",
                    [],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?;

            let Some((payload, fetched_at)) = row else {
                return Ok(None);
            };

            Ok(Some(CachedSnapshot {
                snapshot: serde_json::from_str(&payload).context("failed to parse cached snapshot")?,
                fetched_at: parse_datetime(&fetched_at, "fetched_at")?,
            }))
        })
        .await
    }
}
