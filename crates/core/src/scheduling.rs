//! Fixed daily schedule arithmetic for background jobs.

use chrono::{Duration, NaiveTime};

use crate::types::Timestamp;

/// Parse an `HH:MM` (or `HH:MM:SS`) UTC time of day.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, String> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| format!("Invalid time of day '{value}': {e}"))
}

/// The next instant strictly after `now` whose UTC time of day equals `at`.
pub fn next_daily_run(now: Timestamp, at: NaiveTime) -> Timestamp {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}
