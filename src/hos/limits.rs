use serde::{Deserialize, Serialize};

/// Maximum driving per shift (8h).
pub const DRIVE_LIMIT_SECS: i64 = 28_800;
/// On-duty window per shift (14h).
pub const SHIFT_LIMIT_SECS: i64 = 50_400;
/// Rolling cycle budget (70h).
pub const CYCLE_LIMIT_SECS: i64 = 252_000;
/// Required break (30 min).
pub const BREAK_LIMIT_SECS: i64 = 1_800;
/// Off-duty stretch that fully resets the shift (10h).
pub const LONG_REST_SECS: i64 = 36_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HosLimits {
    pub drive_secs: i64,
    pub shift_secs: i64,
    pub cycle_secs: i64,
    pub break_secs: i64,
    pub long_rest_secs: i64,
}

impl Default for HosLimits {
    fn default() -> Self {
        Self {
            drive_secs: DRIVE_LIMIT_SECS,
            shift_secs: SHIFT_LIMIT_SECS,
            cycle_secs: CYCLE_LIMIT_SECS,
            break_secs: BREAK_LIMIT_SECS,
            long_rest_secs: LONG_REST_SECS,
        }
    }
}
