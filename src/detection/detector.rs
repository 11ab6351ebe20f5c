use serde::Serialize;

use crate::models::{DutyCode, SpeedSample, StatusOrigin};

/// Samples below this speed count as stopped.
pub const DEFAULT_SPEED_THRESHOLD: f64 = 5.0;
/// Consecutive agreeing samples needed before a change is proposed.
const CONFIRMING_SAMPLES: u32 = 2;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum SpeedClass {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Proposal {
    pub code: DutyCode,
    pub origin: StatusOrigin,
}

/// Debounced speed classifier proposing driving / on-duty transitions.
///
/// Only the last classification and a run length are kept. A proposal is
/// made on exactly the second agreeing sample, after which the run is
/// cleared so the next automatic change needs two fresh confirmations.
#[derive(Debug, Clone)]
pub struct AutoStatusDetector {
    threshold: f64,
    last_class: Option<SpeedClass>,
    stable_count: u32,
    manual_override: Option<DutyCode>,
}

impl Default for AutoStatusDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_THRESHOLD)
    }
}

impl AutoStatusDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last_class: None,
            stable_count: 0,
            manual_override: None,
        }
    }

    pub fn classify(&self, speed: f64) -> SpeedClass {
        if speed < self.threshold {
            SpeedClass::Low
        } else {
            SpeedClass::High
        }
    }

    pub fn last_class(&self) -> Option<SpeedClass> {
        self.last_class
    }

    pub fn stable_count(&self) -> u32 {
        self.stable_count
    }

    pub fn manual_override(&self) -> Option<DutyCode> {
        self.manual_override
    }

    /// Driver intent; replayed on every cycle until cleared.
    pub fn set_manual_override(&mut self, code: DutyCode) {
        self.manual_override = Some(code);
        self.clear_run();
    }

    pub fn clear_manual_override(&mut self) {
        self.manual_override = None;
    }

    /// Forgets the current run and any override.
    pub fn reset(&mut self) {
        self.clear_run();
        self.manual_override = None;
    }

    pub fn observe(&mut self, sample: SpeedSample, current: DutyCode) -> Option<Proposal> {
        let speed = sample.speed;
        if let Some(code) = self.manual_override {
            return Some(Proposal {
                code,
                origin: StatusOrigin::Driver,
            });
        }

        if !current.is_auto_detectable() || !speed.is_finite() {
            return None;
        }

        let class = self.classify(speed);
        if self.last_class == Some(class) {
            self.stable_count = self.stable_count.saturating_add(1);
        } else {
            self.last_class = Some(class);
            self.stable_count = 1;
        }

        if self.stable_count != CONFIRMING_SAMPLES {
            return None;
        }

        let code = match class {
            SpeedClass::Low if matches!(current, DutyCode::OnDuty | DutyCode::Driving) => DutyCode::OnDuty,
            SpeedClass::Low => return None,
            SpeedClass::High => DutyCode::Driving,
        };

        self.clear_run();
        Some(Proposal {
            code,
            origin: StatusOrigin::Auto,
        })
    }

    fn clear_run(&mut self) {
        self.last_class = None;
        self.stable_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample(speed: f64) -> SpeedSample {
        SpeedSample {
            speed,
            timestamp: Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap(),
        }
    }

    fn feed(detector: &mut AutoStatusDetector, speeds: &[f64], current: DutyCode) -> Vec<Option<DutyCode>> {
        speeds
            .iter()
            .map(|&speed| detector.observe(sample(speed), current).map(|p| p.code))
            .collect()
    }

    #[test]
    fn proposes_driving_on_the_second_fast_sample_only() {
        let mut detector = AutoStatusDetector::default();
        let out = feed(&mut detector, &[40.0, 40.0], DutyCode::OnDuty);
        assert_eq!(out, vec![None, Some(DutyCode::Driving)]);
    }

    #[test]
    fn stable_speed_does_not_refire_every_sample() {
        let mut detector = AutoStatusDetector::default();
        let out = feed(&mut detector, &[50.0, 50.0, 50.0, 50.0, 50.0], DutyCode::OnDuty);
        assert_eq!(
            out,
            vec![None, Some(DutyCode::Driving), None, Some(DutyCode::Driving), None]
        );
    }

    #[test]
    fn single_noisy_sample_is_ignored() {
        let mut detector = AutoStatusDetector::default();
        let out = feed(&mut detector, &[3.0, 40.0, 3.0, 40.0], DutyCode::OnDuty);
        assert!(out.iter().all(Option::is_none));
        assert_eq!(detector.stable_count(), 1);
    }

    #[test]
    fn stopping_while_driving_proposes_on_duty() {
        let mut detector = AutoStatusDetector::default();
        let out = feed(&mut detector, &[0.0, 4.9], DutyCode::Driving);
        assert_eq!(out, vec![None, Some(DutyCode::OnDuty)]);
        assert_eq!(detector.last_class(), None);
        assert_eq!(detector.stable_count(), 0);
    }

    #[test]
    fn stopped_while_off_duty_stays_off_duty() {
        let mut detector = AutoStatusDetector::default();
        let out = feed(&mut detector, &[0.0, 0.0, 0.0], DutyCode::Off);
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn moving_from_sleeper_proposes_driving() {
        let mut detector = AutoStatusDetector::default();
        let out = feed(&mut detector, &[12.0, 5.0], DutyCode::Sleeper);
        assert_eq!(out, vec![None, Some(DutyCode::Driving)]);
    }

    #[test]
    fn yard_move_and_personal_use_are_left_alone() {
        let mut detector = AutoStatusDetector::default();
        assert!(feed(&mut detector, &[60.0, 60.0], DutyCode::YardMove).iter().all(Option::is_none));
        assert!(feed(&mut detector, &[60.0, 60.0], DutyCode::PersonalUse).iter().all(Option::is_none));
        assert_eq!(detector.stable_count(), 0);
    }

    #[test]
    fn manual_override_replaces_classification_until_cleared() {
        let mut detector = AutoStatusDetector::default();
        detector.set_manual_override(DutyCode::Off);

        for speed in [70.0, 70.0, 70.0] {
            let proposal = detector.observe(sample(speed), DutyCode::Driving).unwrap();
            assert_eq!(proposal.code, DutyCode::Off);
            assert_eq!(proposal.origin, StatusOrigin::Driver);
        }

        detector.clear_manual_override();
        let out = feed(&mut detector, &[70.0, 70.0], DutyCode::Off);
        assert_eq!(out, vec![None, Some(DutyCode::Driving)]);
    }

    #[test]
    fn non_finite_speeds_are_skipped() {
        let mut detector = AutoStatusDetector::default();
        assert_eq!(detector.observe(sample(f64::NAN), DutyCode::OnDuty), None);
        assert_eq!(detector.stable_count(), 0);
    }
}
