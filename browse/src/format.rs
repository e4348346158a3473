//! Human-readable renderings of times and counts for result cards and the player.

use jiff::Timestamp;

/// Renders how long ago `then` was, relative to `now`, e.g. `3 days ago`.
///
/// Months are 30 days and years 365 days. Anything under a minute, including times in
/// the future, is `Just now`.
pub fn time_ago(then: Timestamp, now: Timestamp) -> String {
    let seconds = now.as_second() - then.as_second();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let months = days / 30;
    let years = days / 365;

    let (n, unit) = if years > 0 {
        (years, "year")
    } else if months > 0 {
        (months, "month")
    } else if days > 0 {
        (days, "day")
    } else if hours > 0 {
        (hours, "hour")
    } else if minutes > 0 {
        (minutes, "minute")
    } else {
        return "Just now".to_string();
    };

    let plural = if n > 1 { "s" } else { "" };
    format!("{n} {unit}{plural} ago")
}

/// Renders a playback position as `m:ss`.
///
/// Negative or non-finite positions (as reported before a video has loaded) render as
/// `0:00`.
pub fn clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Renders a count with thousands separators, e.g. `1,234,567`.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// The view count line shown on a result card.
pub fn views(count: Option<u64>) -> String {
    match count {
        Some(n) => format!("{} views", thousands(n)),
        None => "Views unavailable".to_string(),
    }
}
