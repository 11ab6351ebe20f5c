pub mod detector;

pub use detector::{AutoStatusDetector, Proposal, SpeedClass, DEFAULT_SPEED_THRESHOLD};
