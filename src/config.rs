use std::env;

use chrono::Duration;
use dotenvy::dotenv;

pub const DEFAULT_CHECKOUT_GRACE_HOURS: i64 = 24;
pub const DEFAULT_ADJUSTMENT_WINDOW_DAYS: i64 = 7;

const GRACE_HOURS_MIN: i64 = 1;
const GRACE_HOURS_MAX: i64 = 48;
const ADJUSTMENT_DAYS_MIN: i64 = 1;
const ADJUSTMENT_DAYS_MAX: i64 = 30;

/// Runtime tunables for the session lifecycle. Built once at process start
/// and passed by value into the components that need them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceConfig {
    /// Hours an open session may remain open before it is treated as stale.
    pub checkout_grace_hours: i64,
    /// Days after check-in within which a correction request may be filed.
    pub adjustment_window_days: i64,
}

impl AttendanceConfig {
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_source(|key| env::var(key).ok())
    }

    fn from_source(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            checkout_grace_hours: read_clamped(
                get("CHECKOUT_GRACE_HOURS"),
                DEFAULT_CHECKOUT_GRACE_HOURS,
                GRACE_HOURS_MIN,
                GRACE_HOURS_MAX,
            ),
            adjustment_window_days: read_clamped(
                get("ADJUSTMENT_WINDOW_DAYS"),
                DEFAULT_ADJUSTMENT_WINDOW_DAYS,
                ADJUSTMENT_DAYS_MIN,
                ADJUSTMENT_DAYS_MAX,
            ),
        }
    }

    pub fn grace_period(&self) -> Duration {
        Duration::hours(self.checkout_grace_hours)
    }

    pub fn grace_period_ms(&self) -> i64 {
        self.checkout_grace_hours * 3_600_000
    }

    pub fn adjustment_window(&self) -> Duration {
        Duration::days(self.adjustment_window_days)
    }

    pub fn adjustment_window_ms(&self) -> i64 {
        self.adjustment_window_days * 86_400_000
    }
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            checkout_grace_hours: DEFAULT_CHECKOUT_GRACE_HOURS,
            adjustment_window_days: DEFAULT_ADJUSTMENT_WINDOW_DAYS,
        }
    }
}

/// Strict integer read: only unsigned digit strings are accepted, anything
/// else falls back to `default`. In-range parses are clamped to [min, max].
fn read_clamped(raw: Option<String>, default: i64, min: i64, max: i64) -> i64 {
    let Some(raw) = raw else {
        return default;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return default;
    }
    match trimmed.parse::<i64>() {
        Ok(value) => value.clamp(min, max),
        Err(_) => default,
    }
}
