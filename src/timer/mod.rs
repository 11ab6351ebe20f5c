pub mod controller;
pub mod state;

pub use controller::{ClockSnapshot, DutyClock, TickCallback};
pub use state::{ClockMode, ClockStatus, TimerState, MAX_CLOCK_SECONDS};
