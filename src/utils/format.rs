/// Formats seconds as `HH:MM`. Minutes are truncated, negatives read as zero.
/// Hours are not wrapped, so a full cycle renders as `70:00`.
pub fn format_hm(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{:02}:{:02}", hours, minutes)
}

/// Inverse of [`format_hm`] at minute resolution.
pub fn parse_hm(value: &str) -> Option<i64> {
    let (hours, minutes) = value.trim().split_once(':')?;
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    if hours < 0 || !(0..60).contains(&minutes) {
        return None;
    }
    Some(hours * 3600 + minutes * 60)
}
