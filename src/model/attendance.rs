use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::calendar;

/// One row per (user, calendar date in the organization offset).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub id: u64,
    pub user_id: u64,
    pub date: NaiveDate,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub ot_approved: bool,
}

impl AttendanceRecord {
    /// Open: checked in but not yet checked out.
    pub fn is_open(&self) -> bool {
        self.check_in_at.is_some() && self.check_out_at.is_none()
    }

    pub fn date_key(&self) -> String {
        calendar::format_date_key(self.date)
    }
}

/// Input to the status engine: a day's raw punches, or a synthetic
/// no-record day. The date is kept as a raw key so malformed values can
/// fail safe instead of being rejected upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaySnapshot {
    pub date: String,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub ot_approved: bool,
}

impl DaySnapshot {
    /// Synthetic snapshot for a day with no attendance record.
    pub fn no_record(date: String) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }
}

impl From<&AttendanceRecord> for DaySnapshot {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            date: record.date_key(),
            check_in_at: record.check_in_at,
            check_out_at: record.check_out_at,
            ot_approved: record.ot_approved,
        }
    }
}
