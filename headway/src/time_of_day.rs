use regex::Regex;
use std::sync::LazyLock;

/// Minutes in a day; clock readings are always below this.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

static HH_MM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").unwrap());

/// Whether `value` is a zero-padded 24h `HH:MM` string.
///
/// Only the shape is checked. Because every accepted value has the same
/// width, comparing two of them as strings orders them chronologically.
pub fn is_hh_mm(value: &str) -> bool {
    HH_MM_PATTERN.is_match(value)
}

/// The last five characters of a raw time cell, e.g. `"2024-01-01 08:00"` -> `"08:00"`.
pub fn time_suffix(raw: &str) -> &str {
    let start = raw
        .char_indices()
        .rev()
        .nth(4)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    &raw[start..]
}

/// `H * 60 + M` for an `HH:MM` string. Returns `None` when the shape is wrong.
pub fn to_minutes(value: &str) -> Option<u16> {
    if !is_hh_mm(value) {
        return None;
    }
    let (hours, minutes) = value.split_once(':')?;
    let hours: u16 = hours.parse().ok()?;
    let minutes: u16 = minutes.parse().ok()?;
    Some(hours * 60 + minutes)
}

/// Formats minutes since midnight back into `HH:MM`.
pub fn format_minutes(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
