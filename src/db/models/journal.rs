use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{DutyCode, HosSnapshot, StatusOrigin};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum JournalStatus {
    Pending,
    Submitted,
    Failed,
    /// Still pending when the previous process exited.
    Interrupted,
}

impl JournalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalStatus::Pending => "Pending",
            JournalStatus::Submitted => "Submitted",
            JournalStatus::Failed => "Failed",
            JournalStatus::Interrupted => "Interrupted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRecord {
    pub id: String,
    pub event_at: DateTime<Utc>,
    pub code: DutyCode,
    pub origin: StatusOrigin,
    /// The form exactly as it was submitted.
    pub payload: BTreeMap<String, String>,
    pub status: JournalStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedSnapshot {
    pub snapshot: HosSnapshot,
    pub fetched_at: DateTime<Utc>,
}
