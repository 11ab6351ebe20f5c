pub mod format;
pub mod logging;

pub use format::{format_hm, parse_hm};
