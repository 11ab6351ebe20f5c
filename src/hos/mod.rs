pub mod calculator;
pub mod display;
pub mod limits;

pub use calculator::{
    elapsed_seconds, ClockPlan, HosCalculator, HosEvaluation, HosRemaining, RestTier,
    RestWindowPolicy,
};
pub use display::HosDisplay;
pub use limits::HosLimits;
