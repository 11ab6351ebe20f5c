use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reading from the vehicle telematics link. Only `speed` is
/// interpreted here; the rest rides along on outbound requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub timestamp: DateTime<Utc>,
    /// Same units as the telematics source (km/h for the supported units).
    pub speed: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub odometer: Option<f64>,
    pub engine_hours: Option<f64>,
}

impl TelemetryEvent {
    pub fn with_speed(timestamp: DateTime<Utc>, speed: f64) -> Self {
        Self {
            timestamp,
            speed,
            latitude: None,
            longitude: None,
            odometer: None,
            engine_hours: None,
        }
    }

    pub fn speed_sample(&self) -> SpeedSample {
        SpeedSample {
            speed: self.speed,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedSample {
    pub speed: f64,
    pub timestamp: DateTime<Utc>,
}
