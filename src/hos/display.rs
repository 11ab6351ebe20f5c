use serde::Serialize;

use crate::models::DutyCode;
use crate::timer::ClockMode;
use crate::utils::format::format_hm;

use super::calculator::HosEvaluation;

/// UI-ready view of the engine, republished on every clock tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HosDisplay {
    pub code: Option<DutyCode>,
    pub drive: String,
    pub shift: String,
    pub cycle: String,
    #[serde(rename = "break")]
    pub break_: String,
    /// The duty clock's own value, counting down or up.
    pub clock: String,
    pub clock_mode: ClockMode,
    pub progress: f64,
}

impl Default for HosDisplay {
    fn default() -> Self {
        Self {
            code: None,
            drive: format_hm(0),
            shift: format_hm(0),
            cycle: format_hm(0),
            break_: format_hm(0),
            clock: format_hm(0),
            clock_mode: ClockMode::CountUp,
            progress: 0.0,
        }
    }
}

impl HosDisplay {
    pub fn from_evaluation(code: Option<DutyCode>, evaluation: &HosEvaluation, clock_value: i64) -> Self {
        let remaining = &evaluation.remaining;
        Self {
            code,
            drive: format_hm(remaining.drive_secs),
            shift: format_hm(remaining.shift_secs),
            cycle: format_hm(remaining.cycle_secs),
            break_: format_hm(remaining.break_secs),
            clock: format_hm(clock_value),
            clock_mode: evaluation.plan.mode,
            progress: evaluation.plan.progress.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hos::calculator::{ClockPlan, HosRemaining};

    #[test]
    fn renders_each_value_as_hours_and_minutes() {
        let evaluation = HosEvaluation {
            elapsed_secs: 600,
            remaining: HosRemaining {
                drive_secs: 24_600,
                shift_secs: 46_200,
                cycle_secs: 248_400,
                break_secs: 1_800,
            },
            plan: ClockPlan {
                mode: ClockMode::Countdown,
                target_secs: 24_600,
                total_secs: 28_800,
                progress: 0.1458,
                rest_tier: None,
            },
        };

        let display = HosDisplay::from_evaluation(Some(DutyCode::Driving), &evaluation, 24_599);
        assert_eq!(display.drive, "06:50");
        assert_eq!(display.shift, "12:50");
        assert_eq!(display.cycle, "69:00");
        assert_eq!(display.break_, "00:30");
        assert_eq!(display.clock, "06:49");
        assert_eq!(display.clock_mode, ClockMode::Countdown);
    }
}
