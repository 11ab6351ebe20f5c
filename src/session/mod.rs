pub mod controller;
mod loops;


pub use controller::{HosSession, SessionDeps, SubmitOutcome};
