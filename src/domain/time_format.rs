//! Display helpers for the recorder counter and calendar headings.

use chrono::NaiveDate;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;

/// Decimal text left-padded with a zero below ten.
pub fn normalize_time(value: u64) -> String {
    format!("{value:02}")
}

/// `HH:MM:SS` counter for a running recording. Hours do not wrap.
pub fn format_elapsed(total_seconds: u64) -> String {
    let hours = total_seconds / SECONDS_PER_HOUR;
    let minutes = (total_seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let seconds = total_seconds % SECONDS_PER_MINUTE;
    format!(
        "{}:{}:{}",
        normalize_time(hours),
        normalize_time(minutes),
        normalize_time(seconds)
    )
}

/// Heading for a calendar day bucket, e.g. `2024-01-02` -> `2 January`.
pub fn format_day_label(day_key: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(day_key, "%Y-%m-%d").ok()?;
    Some(date.format("%-d %B").to_string())
}
