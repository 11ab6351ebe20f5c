use serde::{Deserialize, Serialize};

/// Regulatory duty status of the driver.
///
/// `YardMove` and `PersonalUse` render distinctly but are accounted as
/// `OnDuty` and `Off` respectively against the limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DutyCode {
    #[serde(rename = "off")]
    Off,
    #[serde(rename = "sb")]
    Sleeper,
    #[serde(rename = "d")]
    Driving,
    #[serde(rename = "on")]
    OnDuty,
    #[serde(rename = "ym")]
    YardMove,
    #[serde(rename = "pu")]
    PersonalUse,
}

impl Default for DutyCode {
    fn default() -> Self {
        DutyCode::Off
    }
}

impl DutyCode {
    pub fn as_token(&self) -> &'static str {
        match self {
            DutyCode::Off => "off",
            DutyCode::Sleeper => "sb",
            DutyCode::Driving => "d",
            DutyCode::OnDuty => "on",
            DutyCode::YardMove => "ym",
            DutyCode::PersonalUse => "pu",
        }
    }

    /// Parses a short token, tolerating surrounding whitespace and case.
    pub fn from_token(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" => Some(DutyCode::Off),
            "sb" => Some(DutyCode::Sleeper),
            "d" => Some(DutyCode::Driving),
            "on" => Some(DutyCode::OnDuty),
            "ym" => Some(DutyCode::YardMove),
            "pu" => Some(DutyCode::PersonalUse),
            _ => None,
        }
    }

    /// The code this status counts as for limit accounting.
    pub fn accounting_code(&self) -> DutyCode {
        match self {
            DutyCode::YardMove => DutyCode::OnDuty,
            DutyCode::PersonalUse => DutyCode::Off,
            other => *other,
        }
    }

    /// Driving and on-duty time (including yard moves) accrue against the cycle.
    pub fn accrues_cycle(&self) -> bool {
        matches!(self.accounting_code(), DutyCode::Driving | DutyCode::OnDuty)
    }

    /// Off-duty family: off, sleeper berth and personal conveyance.
    pub fn is_rest(&self) -> bool {
        matches!(self.accounting_code(), DutyCode::Off | DutyCode::Sleeper)
    }

    /// Statuses the speed detector may move the driver out of.
    /// Yard moves and personal conveyance are driver-selected and left alone.
    pub fn is_auto_detectable(&self) -> bool {
        matches!(
            self,
            DutyCode::OnDuty | DutyCode::Driving | DutyCode::Off | DutyCode::Sleeper
        )
    }
}

impl std::fmt::Display for DutyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_parse_back_to_the_same_code() {
        for code in [
            DutyCode::Off,
            DutyCode::Sleeper,
            DutyCode::Driving,
            DutyCode::OnDuty,
            DutyCode::YardMove,
            DutyCode::PersonalUse,
        ] {
            assert_eq!(DutyCode::from_token(code.as_token()), Some(code));
        }
        assert_eq!(DutyCode::from_token(" ON "), Some(DutyCode::OnDuty));
        assert_eq!(DutyCode::from_token("dr"), None);
    }

    #[test]
    fn sub_modes_account_as_their_parent_status() {
        assert_eq!(DutyCode::YardMove.accounting_code(), DutyCode::OnDuty);
        assert_eq!(DutyCode::PersonalUse.accounting_code(), DutyCode::Off);
        assert!(DutyCode::YardMove.accrues_cycle());
        assert!(DutyCode::PersonalUse.is_rest());
        assert!(!DutyCode::YardMove.is_auto_detectable());
        assert!(!DutyCode::PersonalUse.is_auto_detectable());
    }

    #[test]
    fn serializes_as_short_token() {
        let json = serde_json::to_string(&DutyCode::Sleeper).unwrap();
        assert_eq!(json, "\"sb\"");
    }
}
