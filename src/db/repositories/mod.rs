mod snapshot_cache;
mod status_changes;
