//! Small helpers shared by the tool formatters.

use chrono::{DateTime, Utc};

/// Renders `timestamp` relative to `now`: "just now", "5m ago", "3h ago", "2d ago",
/// and the plain UTC date once it is a week or more in the past.
///
/// Timestamps that are not RFC 3339 are returned unchanged.
pub fn relative_time(timestamp: &str, now: DateTime<Utc>) -> String {
    let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) else {
        return timestamp.to_string();
    };
    let parsed = parsed.with_timezone(&Utc);
    let minutes = (now - parsed).num_milliseconds().div_euclid(60_000);
    let hours = minutes.div_euclid(60);
    let days = hours.div_euclid(24);
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        parsed.format("%Y-%m-%d").to_string()
    }
}

/// Sentry encodes event counts as decimal strings.
pub fn parse_count(count: &str) -> u64 {
    count.trim().parse().unwrap_or(0)
}

pub(crate) fn or_unknown(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "unknown".to_string(),
    }
}
