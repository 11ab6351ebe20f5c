mod duty;
mod snapshot;
mod status_change;
mod telemetry;

pub use duty::DutyCode;
pub use snapshot::{parse_event_datetime, HosSnapshot};
pub use status_change::{StatusChangeRequest, StatusOrigin};
pub use telemetry::{SpeedSample, TelemetryEvent};
