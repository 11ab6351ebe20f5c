use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::db::models::JournalStatus;
use crate::models::{DutyCode, StatusOrigin};

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_journal_status(value: &str) -> Result<JournalStatus> {
    match value {
        "Pending" => Ok(JournalStatus::Pending),
        "Submitted" => Ok(JournalStatus::Submitted),
        "Failed" => Ok(JournalStatus::Failed),
        "Interrupted" => Ok(JournalStatus::Interrupted),
        other => Err(anyhow!("unknown journal status {other}")),
    }
}

pub fn parse_code(value: &str) -> Result<DutyCode> {
    DutyCode::from_token(value).ok_or_else(|| anyhow!("unknown duty code {value}"))
}

pub fn parse_origin(value: &str) -> Result<StatusOrigin> {
    match value {
        "Auto" => Ok(StatusOrigin::Auto),
        "Driver" => Ok(StatusOrigin::Driver),
        other => Err(anyhow!("unknown status origin {other}")),
    }
}
