use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DutyCode;

/// Accumulated duty seconds for the current shift/cycle window, as last
/// reported by the server. Replaced wholesale on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HosSnapshot {
    pub driving_seconds: u64,
    pub on_duty_seconds: u64,
    pub sleeper_seconds: u64,
    pub off_duty_seconds: u64,
    pub last_event_code: DutyCode,
    /// `None` when the server omitted it or sent something unparseable;
    /// such a snapshot contributes no elapsed time.
    pub last_event_timestamp: Option<DateTime<Utc>>,
    pub last_event_break_seconds: u64,
}

impl HosSnapshot {
    /// Decodes the server payload.
    ///
    /// Only a document that is not a JSON object is rejected. Missing or
    /// malformed counters read as zero, an unknown code reads as `Off` and
    /// a bad timestamp reads as `None`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).context("snapshot is not valid JSON")?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            bail!("snapshot payload must be a JSON object");
        };

        let last_event = object.get("last_event").filter(|v| v.is_object());

        let last_event_code = match last_event.and_then(|event| event.get("code")) {
            Some(Value::String(token)) => DutyCode::from_token(token).unwrap_or_else(|| {
                warn!("unknown duty code '{token}' in snapshot, treating as off");
                DutyCode::Off
            }),
            Some(Value::Null) | None => DutyCode::Off,
            Some(other) => {
                warn!("non-string duty code {other} in snapshot, treating as off");
                DutyCode::Off
            }
        };

        let last_event_timestamp = last_event
            .and_then(|event| event.get("eventdatetime"))
            .and_then(Value::as_str)
            .and_then(|raw| {
                let parsed = parse_event_datetime(raw);
                if parsed.is_none() {
                    warn!("unparseable eventdatetime '{raw}' in snapshot");
                }
                parsed
            });

        Ok(Self {
            driving_seconds: lenient_seconds(object.get("code_d_sec")),
            on_duty_seconds: lenient_seconds(object.get("code_on_sec")),
            sleeper_seconds: lenient_seconds(object.get("code_sb_sec")),
            off_duty_seconds: lenient_seconds(object.get("code_off_sec")),
            last_event_code,
            last_event_timestamp,
            last_event_break_seconds: lenient_seconds(
                last_event.and_then(|event| event.get("sb_break")),
            ),
        })
    }

    /// Driving plus on-duty seconds; what the cycle limit is charged with.
    pub fn on_duty_equivalent_seconds(&self) -> u64 {
        self.driving_seconds.saturating_add(self.on_duty_seconds)
    }

    /// Every category summed; what the shift window is charged with.
    pub fn all_duty_seconds(&self) -> u64 {
        self.driving_seconds
            .saturating_add(self.on_duty_seconds)
            .saturating_add(self.sleeper_seconds)
            .saturating_add(self.off_duty_seconds)
    }
}

fn lenient_seconds(value: Option<&Value>) -> u64 {
    let parsed = match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f.floor() as i64)),
        Some(Value::String(text)) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().map(|f| f.floor() as i64))
        }
        _ => None,
    };
    parsed.map(|secs| secs.max(0) as u64).unwrap_or(0)
}

/// Accepts RFC 3339 as well as the zone-less forms some servers emit,
/// which are taken to be UTC.
pub fn parse_event_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn decodes_a_complete_payload() {
        let raw = r#"{
            "code_d_sec": 3600,
            "code_on_sec": 1200,
            "code_sb_sec": 0,
            "code_off_sec": 400,
            "last_event": {"eventdatetime": "2026-10-19T08:00:00Z", "code": "d", "sb_break": 90}
        }"#;
        let snapshot = HosSnapshot::from_json(raw).unwrap();

        assert_eq!(snapshot.driving_seconds, 3600);
        assert_eq!(snapshot.on_duty_seconds, 1200);
        assert_eq!(snapshot.off_duty_seconds, 400);
        assert_eq!(snapshot.last_event_code, DutyCode::Driving);
        assert_eq!(
            snapshot.last_event_timestamp,
            Some(Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap())
        );
        assert_eq!(snapshot.last_event_break_seconds, 90);
        assert_eq!(snapshot.on_duty_equivalent_seconds(), 4800);
        assert_eq!(snapshot.all_duty_seconds(), 5200);
    }

    #[test]
    fn missing_and_malformed_fields_degrade_to_zero() {
        let raw = r#"{
            "code_d_sec": "1800",
            "code_on_sec": "abc",
            "code_sb_sec": -50,
            "last_event": {"eventdatetime": "yesterday", "code": "zz"}
        }"#;
        let snapshot = HosSnapshot::from_json(raw).unwrap();

        assert_eq!(snapshot.driving_seconds, 1800);
        assert_eq!(snapshot.on_duty_seconds, 0);
        assert_eq!(snapshot.sleeper_seconds, 0);
        assert_eq!(snapshot.off_duty_seconds, 0);
        assert_eq!(snapshot.last_event_code, DutyCode::Off);
        assert_eq!(snapshot.last_event_timestamp, None);
        assert_eq!(snapshot.last_event_break_seconds, 0);
    }

    #[test]
    fn naive_timestamps_are_read_as_utc() {
        let parsed = parse_event_datetime("2026-10-19 08:30:15").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 15).unwrap());
    }

    #[test]
    fn rejects_non_object_documents() {
        assert!(HosSnapshot::from_json("[1, 2]").is_err());
        assert!(HosSnapshot::from_json("not json").is_err());
    }
}
