use chrono::{DateTime, FixedOffset, NaiveDate, Utc, Weekday};
use chrono::Datelike;
use once_cell::sync::Lazy;

/// Organization-wide fixed offset (UTC+7). Every date key and shift
/// boundary is evaluated in this offset, never in server-local time.
pub static ORG_OFFSET: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::east_opt(7 * 3600).expect("UTC+7 is a valid offset"));

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Calendar day of `instant` in the organization offset.
pub fn local_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&*ORG_OFFSET).date_naive()
}

/// `YYYY-MM-DD` key of `instant` in the organization offset.
pub fn date_key(instant: DateTime<Utc>) -> String {
    format_date_key(local_date(instant))
}

pub fn format_date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Strict date-key parse: exactly `YYYY-MM-DD` and a real calendar day.
/// `2026-02-30` is rejected, never rolled forward into March.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    if key.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT).ok()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn is_today(date: NaiveDate, now: DateTime<Utc>) -> bool {
    date == local_date(now)
}

/// Instant at `hour:minute` wall-clock time on `date` in the organization
/// offset. None for out-of-range hour/minute.
pub fn at_wall_time(date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    naive
        .and_local_timezone(*ORG_OFFSET)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whole minutes from `from` to `to`, truncated toward zero. Negative when
/// `to` precedes `from`.
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_minutes()
}

/// Every calendar day from `start` through `end` inclusive. Empty when
/// `start > end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        days.push(current);
        current = match current.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    days
}
