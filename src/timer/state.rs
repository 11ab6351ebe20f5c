use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Largest target the clock accepts (about 31 years); anything above is clamped.
pub const MAX_CLOCK_SECONDS: i64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ClockStatus {
    Idle,
    Running,
    Paused,
    /// Torn down with its session; ignores every further command.
    Invalidated,
}

impl Default for ClockStatus {
    fn default() -> Self {
        ClockStatus::Idle
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ClockMode {
    Countdown,
    CountUp,
}

impl Default for ClockMode {
    fn default() -> Self {
        ClockMode::Countdown
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: ClockStatus,
    pub mode: ClockMode,
    /// Last target handed to the clock, never negative.
    pub total_seconds: i64,
    /// End instant in countdown mode, synthetic start instant in count-up
    /// mode. Every tick is derived from this, so retargeting replaces it
    /// instead of adjusting a running counter.
    pub reference_instant: Option<DateTime<Utc>>,
    /// Value frozen by `pause`.
    pub paused_value: Option<i64>,
}

impl TimerState {
    pub fn new(mode: ClockMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, ClockStatus::Running | ClockStatus::Paused)
    }

    /// Seconds remaining (countdown) or elapsed (count-up) at `now`.
    pub fn value_at(&self, now: DateTime<Utc>) -> i64 {
        match self.status {
            ClockStatus::Idle | ClockStatus::Invalidated => self.total_seconds,
            ClockStatus::Paused => self.paused_value.unwrap_or(self.total_seconds),
            ClockStatus::Running => {
                let Some(reference) = self.reference_instant else {
                    return self.total_seconds;
                };
                let value = match self.mode {
                    ClockMode::Countdown => (reference - now).num_seconds(),
                    ClockMode::CountUp => (now - reference).num_seconds(),
                };
                value.max(0)
            }
        }
    }

    pub fn begin(&mut self, mode: ClockMode, total_seconds: i64, now: DateTime<Utc>) {
        let total_seconds = clamp_seconds(total_seconds);
        *self = Self {
            status: ClockStatus::Running,
            mode,
            total_seconds,
            reference_instant: Some(reference_for(mode, total_seconds, now)),
            paused_value: None,
        };
    }

    /// Moves the reference so the value at `now` equals `target_seconds`.
    /// Applying the same target twice at the same instant is a no-op.
    pub fn retarget(&mut self, target_seconds: i64, now: DateTime<Utc>) {
        let target_seconds = clamp_seconds(target_seconds);
        self.total_seconds = target_seconds;
        match self.status {
            ClockStatus::Running => {
                self.reference_instant = Some(reference_for(self.mode, target_seconds, now));
            }
            ClockStatus::Paused => {
                self.paused_value = Some(target_seconds);
            }
            ClockStatus::Idle | ClockStatus::Invalidated => {}
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.status != ClockStatus::Running {
            return;
        }
        self.paused_value = Some(self.value_at(now));
        self.reference_instant = None;
        self.status = ClockStatus::Paused;
    }

    /// Continues from the frozen value; the paused stretch is not counted.
    pub fn resume(&mut self, now: DateTime<Utc>) {
        if self.status != ClockStatus::Paused {
            return;
        }
        let value = self.paused_value.take().unwrap_or(self.total_seconds);
        self.reference_instant = Some(reference_for(self.mode, value, now));
        self.status = ClockStatus::Running;
    }

    pub fn invalidate(&mut self) {
        self.status = ClockStatus::Invalidated;
        self.reference_instant = None;
        self.paused_value = None;
    }
}

fn clamp_seconds(seconds: i64) -> i64 {
    seconds.clamp(0, MAX_CLOCK_SECONDS)
}

fn reference_for(mode: ClockMode, seconds: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    let offset = Duration::seconds(clamp_seconds(seconds));
    let shifted = match mode {
        ClockMode::Countdown => now.checked_add_signed(offset),
        ClockMode::CountUp => now.checked_sub_signed(offset),
    };
    shifted.unwrap_or(match mode {
        ClockMode::Countdown => DateTime::<Utc>::MAX_UTC,
        ClockMode::CountUp => DateTime::<Utc>::MIN_UTC,
    })
}
