//! Parsing and formatting of human durations such as `24h` or `7d`.

use chrono::Duration;

use crate::error::{PullCacheError, Result};

/// Parse a duration string like "7d", "24h", "30m", "90s" or "3600".
///
/// A bare number is taken as seconds. Negative values are rejected. `"0"`
/// parses to a zero duration, which a recheck policy treats as "never".
pub fn parse_duration(value: &str) -> Result<Duration> {
    let trimmed = value.trim().to_lowercase();
    let invalid = || PullCacheError::InvalidDuration {
        value: value.to_string(),
    };

    let (digits, unit): (&str, fn(i64) -> Option<Duration>) =
        if let Some(days) = trimmed.strip_suffix('d') {
            (days, Duration::try_days)
        } else if let Some(hours) = trimmed.strip_suffix('h') {
            (hours, Duration::try_hours)
        } else if let Some(mins) = trimmed.strip_suffix('m') {
            (mins, Duration::try_minutes)
        } else if let Some(secs) = trimmed.strip_suffix('s') {
            (secs, Duration::try_seconds)
        } else {
            (trimmed.as_str(), Duration::try_seconds)
        };

    let n: i64 = digits.trim().parse().map_err(|_| invalid())?;
    if n < 0 {
        return Err(invalid());
    }
    unit(n).ok_or_else(invalid)
}

/// Format a duration using its largest whole unit.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.num_seconds();

    if secs != 0 && secs % 86400 == 0 {
        format!("{}d", secs / 86400)
    } else if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}
