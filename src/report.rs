//! Read path: joins a user's raw rows for a month with holiday and leave
//! sets and runs the status engine once per calendar day, synthesizing
//! no-record days so absences show up.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::calendar;
use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceRecord, DaySnapshot};
use crate::status::{self, ComputedStatus};
use crate::store::AttendanceStore;

#[derive(Debug, Clone, Serialize)]
pub struct DayAttendance {
    pub date: String,
    #[serde(flatten)]
    pub computed: ComputedStatus,
}

/// First and last day of a `YYYY-MM` month string; None when the string
/// is not a real month.
pub fn month_bounds(month: &str) -> Option<(NaiveDate, NaiveDate)> {
    if month.len() != 7 {
        return None;
    }
    let first = calendar::parse_date_key(&format!("{month}-01"))?;
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
    };
    Some((first, next_month.pred_opt()?))
}

/// Computes a full month of day statuses from already-loaded rows.
pub fn build_month_view(
    records: &[AttendanceRecord],
    first: NaiveDate,
    last: NaiveDate,
    holidays: &HashSet<String>,
    leaves: &HashSet<String>,
    now: DateTime<Utc>,
) -> Vec<DayAttendance> {
    let by_date: HashMap<NaiveDate, &AttendanceRecord> =
        records.iter().map(|record| (record.date, record)).collect();

    calendar::date_range(first, last)
        .into_iter()
        .map(|date| {
            let key = calendar::format_date_key(date);
            let snapshot = match by_date.get(&date) {
                Some(record) => DaySnapshot::from(*record),
                None => DaySnapshot::no_record(key.clone()),
            };
            let computed = status::compute_attendance(&snapshot, holidays, leaves, now);
            DayAttendance { date: key, computed }
        })
        .collect()
}

/// Loads a user's rows for `month` and computes every day's status.
pub async fn month_view<S: AttendanceStore>(
    store: &S,
    user_id: u64,
    month: &str,
    holidays: &HashSet<String>,
    leaves: &HashSet<String>,
    now: DateTime<Utc>,
) -> Result<Vec<DayAttendance>, AttendanceError> {
    let (first, last) = month_bounds(month)
        .ok_or_else(|| AttendanceError::InvalidInput(format!("invalid month '{month}'")))?;
    let records = store.records_between(user_id, first, last).await?;
    Ok(build_month_view(&records, first, last, holidays, leaves, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    fn at(key: &str, hour: u32, minute: u32) -> DateTime<Utc> {
        calendar::at_wall_time(calendar::parse_date_key(key).unwrap(), hour, minute).unwrap()
    }

    fn record(id: u64, date: &str, check_in: Option<DateTime<Utc>>, check_out: Option<DateTime<Utc>>) -> AttendanceRecord {
        AttendanceRecord {
            id,
            user_id: 7,
            date: calendar::parse_date_key(date).unwrap(),
            check_in_at: check_in,
            check_out_at: check_out,
            ot_approved: false,
        }
    }

    #[test]
    fn month_bounds_handles_lengths_and_year_end() {
        assert_eq!(
            month_bounds("2026-02"),
            Some((
                NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
            ))
        );
        assert_eq!(
            month_bounds("2026-12"),
            Some((
                NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()
            ))
        );
        assert_eq!(month_bounds("2026-13"), None);
        assert_eq!(month_bounds("2026-2"), None);
        assert_eq!(month_bounds("garbage"), None);
    }

    #[test]
    fn month_view_synthesizes_missing_days() {
        // Viewed from mid-March: the first week of March for one user.
        let now = at("2026-03-16", 10, 0);
        let (first, last) = month_bounds("2026-03").unwrap();
        let records = vec![
            record(1, "2026-03-02", Some(at("2026-03-02", 8, 30)), Some(at("2026-03-02", 17, 30))),
            record(2, "2026-03-03", Some(at("2026-03-03", 9, 0)), Some(at("2026-03-03", 17, 30))),
        ];
        let mut leaves = HashSet::new();
        leaves.insert("2026-03-04".to_string());

        let view = build_month_view(&records, first, last, &HashSet::new(), &leaves, now);
        assert_eq!(view.len(), 31);

        let by_date: HashMap<&str, &DayAttendance> =
            view.iter().map(|d| (d.date.as_str(), d)).collect();
        // 2026-03-01 is a Sunday.
        assert_eq!(by_date["2026-03-01"].computed.status, Status::WeekendOrHoliday);
        assert_eq!(by_date["2026-03-02"].computed.status, Status::OnTime);
        assert_eq!(by_date["2026-03-02"].computed.work_minutes, 480);
        assert_eq!(by_date["2026-03-03"].computed.status, Status::Late);
        assert_eq!(by_date["2026-03-04"].computed.status, Status::Leave);
        // Past weekday with no record or leave.
        assert_eq!(by_date["2026-03-05"].computed.status, Status::Absent);
        // The rest of the month is still ahead.
        assert_eq!(by_date["2026-03-17"].computed.status, Status::Unknown);
    }
}
