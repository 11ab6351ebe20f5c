use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DutyCode, TelemetryEvent};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatusOrigin {
    Auto,
    Driver,
}

impl StatusOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusOrigin::Auto => "Auto",
            StatusOrigin::Driver => "Driver",
        }
    }
}

/// Outbound duty-status change. Submitted as a flat key/value form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
    pub id: String,
    pub event_at: DateTime<Utc>,
    pub code: DutyCode,
    pub origin: StatusOrigin,
    pub telemetry: Option<TelemetryEvent>,
}

impl StatusChangeRequest {
    pub fn new(
        event_at: DateTime<Utc>,
        code: DutyCode,
        origin: StatusOrigin,
        telemetry: Option<TelemetryEvent>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_at,
            code,
            origin,
            telemetry,
        }
    }

    pub fn to_form(&self) -> BTreeMap<String, String> {
        let mut form = BTreeMap::new();
        form.insert(
            "eventdatetime".to_string(),
            self.event_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        form.insert("code".to_string(), self.code.as_token().to_string());
        form.insert("origin".to_string(), self.origin.as_str().to_string());

        if let Some(telemetry) = &self.telemetry {
            form.insert("speed".to_string(), telemetry.speed.to_string());
            let passthrough = [
                ("latitude", telemetry.latitude),
                ("longitude", telemetry.longitude),
                ("odometer", telemetry.odometer),
                ("engine_hours", telemetry.engine_hours),
            ];
            for (key, value) in passthrough {
                if let Some(value) = value {
                    form.insert(key.to_string(), value.to_string());
                }
            }
        }

        form
    }
}
