use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static HOURS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)H").unwrap());
static MINUTES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)M").unwrap());

/// Convert an ISO 8601 duration (e.g. `PT2H30M`) to decimal hours,
/// rounded to 2 decimals. Malformed or empty input degrades to whatever
/// components could be read, never an error: `""` → 0.0, `PT45M` → 0.75.
pub fn parse_duration_to_hours(raw: &str) -> f64 {
    if raw.is_empty() {
        return 0.0;
    }

    let hours: u64 = HOURS_RE
        .captures(raw)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);
    let minutes: u64 = MINUTES_RE
        .captures(raw)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);

    ((hours as f64 + minutes as f64 / 60.0) * 100.0).round() / 100.0
}

/// Calendar-date prefix of an ISO datetime string (`2025-03-01T09:15:00Z`
/// → `2025-03-01`). Purely textual: no timezone conversion, so entry dates
/// round-trip exactly with upstream reports.
pub fn date_only(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}

/// Parse a `YYYY-MM-DD` string, `None` on any mismatch.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}
