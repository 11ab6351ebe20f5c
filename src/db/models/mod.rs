mod journal;

pub use journal::{CachedSnapshot, JournalStatus, StatusChangeRecord};
