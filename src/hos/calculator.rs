use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{DutyCode, HosSnapshot};
use crate::timer::ClockMode;

use super::limits::HosLimits;

/// Which recovery window an off-duty period counts down.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RestTier {
    /// 30 minute break; the shift window is not exhausted yet.
    Short,
    /// 10 hour reset.
    Long,
}

/// When the rest tier is decided.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RestWindowPolicy {
    /// Once per off-duty period, held until the period ends.
    Latched,
    /// On every evaluation.
    Continuous,
}

impl Default for RestWindowPolicy {
    fn default() -> Self {
        RestWindowPolicy::Latched
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HosRemaining {
    pub drive_secs: i64,
    pub shift_secs: i64,
    pub cycle_secs: i64,
    pub break_secs: i64,
}

/// What the duty clock should show for the current status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockPlan {
    pub mode: ClockMode,
    pub target_secs: i64,
    /// Denominator of `progress`; zero for the plain elapsed display.
    pub total_secs: i64,
    pub progress: f64,
    pub rest_tier: Option<RestTier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HosEvaluation {
    pub elapsed_secs: i64,
    pub remaining: HosRemaining,
    pub plan: ClockPlan,
}

/// Seconds spent in the current status since the server's last event.
/// Zero when the timestamp is unknown or lies in the future.
pub fn elapsed_seconds(snapshot: &HosSnapshot, now: DateTime<Utc>) -> i64 {
    snapshot
        .last_event_timestamp
        .map(|at| (now - at).num_seconds().max(0))
        .unwrap_or(0)
}

fn secs(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[derive(Debug, Clone, Default)]
pub struct HosCalculator {
    limits: HosLimits,
}

impl HosCalculator {
    pub fn new(limits: HosLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &HosLimits {
        &self.limits
    }

    pub fn drive_remaining(&self, snapshot: &HosSnapshot, current: Option<DutyCode>, elapsed: i64) -> i64 {
        let accruing = match current.map(|code| code.accounting_code()) {
            Some(DutyCode::Driving) => elapsed,
            _ => 0,
        };
        self.limits
            .drive_secs
            .saturating_sub(secs(snapshot.driving_seconds))
            .saturating_sub(accruing)
            .max(0)
    }

    /// The window only runs once the shift has begun: either time is on
    /// the books already or the driver is in an on-duty status.
    pub fn shift_remaining(&self, snapshot: &HosSnapshot, current: Option<DutyCode>, elapsed: i64) -> i64 {
        let all_duty = secs(snapshot.all_duty_seconds());
        let started = all_duty > 0 || current.map_or(false, |code| code.accrues_cycle());
        let accruing = if started { elapsed } else { 0 };
        self.limits
            .shift_secs
            .saturating_sub(all_duty)
            .saturating_sub(accruing)
            .clamp(0, self.limits.shift_secs)
    }

    pub fn cycle_remaining(&self, snapshot: &HosSnapshot, current: Option<DutyCode>, elapsed: i64) -> i64 {
        let accruing = if current.map_or(false, |code| code.accrues_cycle()) {
            elapsed
        } else {
            0
        };
        self.limits
            .cycle_secs
            .saturating_sub(secs(snapshot.on_duty_equivalent_seconds()))
            .saturating_sub(accruing)
            .max(0)
    }

    /// Break still owed: drive time consumed so far, less break already
    /// banked and any sleeper time running now, capped at the break limit.
    pub fn break_remaining(
        &self,
        snapshot: &HosSnapshot,
        current: Option<DutyCode>,
        elapsed: i64,
        drive_remaining: i64,
    ) -> i64 {
        let consumed = (self.limits.drive_secs - drive_remaining).clamp(0, self.limits.drive_secs);
        let sleeper_elapsed = if current == Some(DutyCode::Sleeper) {
            elapsed
        } else {
            0
        };
        consumed
            .saturating_sub(secs(snapshot.last_event_break_seconds))
            .saturating_sub(sleeper_elapsed)
            .clamp(0, self.limits.break_secs)
    }

    pub fn remaining(&self, snapshot: &HosSnapshot, current: Option<DutyCode>, elapsed: i64) -> HosRemaining {
        let drive_secs = self.drive_remaining(snapshot, current, elapsed);
        HosRemaining {
            drive_secs,
            shift_secs: self.shift_remaining(snapshot, current, elapsed),
            cycle_secs: self.cycle_remaining(snapshot, current, elapsed),
            break_secs: self.break_remaining(snapshot, current, elapsed, drive_secs),
        }
    }

    /// Short recovery while the shift window still has room, full reset otherwise.
    /// Uses the reported totals only; the running elapsed time is not included.
    pub fn rest_tier(&self, snapshot: &HosSnapshot) -> RestTier {
        if secs(snapshot.all_duty_seconds()) < self.limits.shift_secs {
            RestTier::Short
        } else {
            RestTier::Long
        }
    }

    pub fn clock_plan(
        &self,
        snapshot: &HosSnapshot,
        current: Option<DutyCode>,
        elapsed: i64,
        rest_tier: RestTier,
    ) -> ClockPlan {
        let (total, used, tier) = match current.map(|code| code.accounting_code()) {
            Some(DutyCode::Driving) => (
                self.limits.drive_secs,
                secs(snapshot.driving_seconds).saturating_add(elapsed),
                None,
            ),
            Some(DutyCode::OnDuty) => (
                self.limits.shift_secs,
                secs(snapshot.on_duty_equivalent_seconds()).saturating_add(elapsed),
                None,
            ),
            Some(DutyCode::Off) | Some(DutyCode::Sleeper) => {
                let window = match rest_tier {
                    RestTier::Short => self.limits.break_secs,
                    RestTier::Long => self.limits.long_rest_secs,
                };
                (window, elapsed, Some(rest_tier))
            }
            _ => {
                return ClockPlan {
                    mode: ClockMode::CountUp,
                    target_secs: 0,
                    total_secs: 0,
                    progress: 0.0,
                    rest_tier: None,
                }
            }
        };

        ClockPlan {
            mode: ClockMode::Countdown,
            target_secs: total.saturating_sub(used).max(0),
            total_secs: total,
            progress: progress(used, total),
            rest_tier: tier,
        }
    }

    /// Full evaluation at `now`. A `latched_tier` overrides the freshly
    /// computed rest tier.
    pub fn evaluate(
        &self,
        snapshot: &HosSnapshot,
        current: Option<DutyCode>,
        now: DateTime<Utc>,
        latched_tier: Option<RestTier>,
    ) -> HosEvaluation {
        let elapsed = elapsed_seconds(snapshot, now);
        let tier = latched_tier.unwrap_or_else(|| self.rest_tier(snapshot));
        HosEvaluation {
            elapsed_secs: elapsed,
            remaining: self.remaining(snapshot, current, elapsed),
            plan: self.clock_plan(snapshot, current, elapsed, tier),
        }
    }
}

fn progress(used: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (used as f64 / total as f64).clamp(0.0, 1.0)
}
