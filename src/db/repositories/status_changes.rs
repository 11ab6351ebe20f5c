use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_code, parse_datetime, parse_journal_status, parse_origin},
    models::{JournalStatus, StatusChangeRecord},
    Database,
};
use crate::models::StatusChangeRequest;

fn row_to_record(row: &Row) -> Result<StatusChangeRecord> {
    let event_at: String = row.get("event_at")?;
    let code: String = row.get("code")?;
    let origin: String = row.get("origin")?;
    let payload: String = row.get("payload")?;
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(StatusChangeRecord {
        id: row.get("id")?,
        event_at: parse_datetime(&event_at, "event_at")?,
        code: parse_code(&code)?,
        origin: parse_origin(&origin)?,
        payload: serde_json::from_str(&payload).context("failed to parse journal payload")?,
        status: parse_journal_status(&status)?,
        error: row.get("error")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Journals a request as `Pending` before it goes out.
    pub async fn insert_status_change(
        &self,
        request: &StatusChangeRequest,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let payload = serde_json::to_string(&request.to_form())?;
        let record = request.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO status_changes (id, event_at, code, origin, payload, status, error, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?7)",
                params![
                    record.id,
                    record.event_at.to_rfc3339(),
                    record.code.as_token(),
                    record.origin.as_str(),
                    payload,
                    JournalStatus::Pending.as_str(),
                    created_at.to_rfc3339(),
                ],
            )
            .context("failed to journal status change")?;
            Ok(())
        })
        .await
    }

    pub async fn mark_status_change(
        &self,
        id: &str,
        status: JournalStatus,
        error: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE status_changes
                 SET status = ?1,
                     error = ?2,
                     updated_at = ?3
                 WHERE id = ?4",
                params![status.as_str(), error, updated_at.to_rfc3339(), id],
            )
            .context("failed to update journaled status change")?;
            Ok(())
        })
        .await
    }

    /// Marks entries a previous process left `Pending`. They are not resent.
    pub async fn interrupt_pending_status_changes(&self, at: DateTime<Utc>) -> Result<usize> {
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE status_changes
                 SET status = ?1,
                     updated_at = ?2
                 WHERE status = ?3",
                params![
                    JournalStatus::Interrupted.as_str(),
                    at.to_rfc3339(),
                    JournalStatus::Pending.as_str(),
                ],
            )?;
            Ok(updated)
        })
        .await
    }

    pub async fn recent_status_changes(&self, limit: usize) -> Result<Vec<StatusChangeRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, event_at, code, origin, payload, status, error, created_at, updated_at
                 FROM status_changes
                 ORDER BY event_at DESC, created_at DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{test_support::temp_database, JournalStatus};
    use crate::models::{DutyCode, StatusChangeRequest, StatusOrigin};
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn journal_tracks_submission_outcomes() {
        let db = temp_database();
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap();

        let ok = StatusChangeRequest::new(at, DutyCode::Driving, StatusOrigin::Auto, None);
        let failed = StatusChangeRequest::new(
            at + Duration::seconds(60),
            DutyCode::OnDuty,
            StatusOrigin::Driver,
            None,
        );
        db.insert_status_change(&ok, at).await.unwrap();
        db.insert_status_change(&failed, at).await.unwrap();
        db.mark_status_change(&ok.id, JournalStatus::Submitted, None, at).await.unwrap();
        db.mark_status_change(&failed.id, JournalStatus::Failed, Some("503".into()), at)
            .await
            .unwrap();

        let records = db.recent_status_changes(10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, failed.id);
        assert_eq!(records[0].status, JournalStatus::Failed);
        assert_eq!(records[0].error.as_deref(), Some("503"));
        assert_eq!(records[0].origin, StatusOrigin::Driver);
        assert_eq!(records[1].code, DutyCode::Driving);
        assert_eq!(records[1].payload["code"], "d");
    }

    #[tokio::test]
    async fn leftover_pending_entries_become_interrupted() {
        let db = temp_database();
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap();
        let request = StatusChangeRequest::new(at, DutyCode::Off, StatusOrigin::Driver, None);
        db.insert_status_change(&request, at).await.unwrap();

        assert_eq!(db.interrupt_pending_status_changes(at).await.unwrap(), 1);
        assert_eq!(db.interrupt_pending_status_changes(at).await.unwrap(), 0);

        let records = db.recent_status_changes(1).await.unwrap();
        assert_eq!(records[0].status, JournalStatus::Interrupted);
    }
}
