//! Pure status computation: raw punches plus calendar context in, status
//! and minute counts out. Nothing here touches storage or the clock.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::calendar;
use crate::model::attendance::DaySnapshot;

/// Check-ins at or before 08:45 are on time.
pub const SHIFT_START: (u32, u32) = (8, 45);
/// The regular shift ends at 17:30.
pub const SHIFT_END: (u32, u32) = (17, 30);
/// Overtime accrues from 17:31; the one-minute buffer keeps an on-time
/// departure from counting as overtime.
pub const OT_START: (u32, u32) = (17, 31);
pub const LUNCH_START: (u32, u32) = (12, 0);
pub const LUNCH_END: (u32, u32) = (13, 0);
pub const LUNCH_DEDUCTION_MINUTES: i64 = 60;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    OnTime,
    Late,
    EarlyLeave,
    LateAndEarly,
    Working,
    MissingCheckout,
    MissingCheckin,
    WeekendOrHoliday,
    Leave,
    Absent,
    Unknown,
}

/// Derived per-day result; recomputed on every read, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedStatus {
    pub status: Status,
    pub late_minutes: i64,
    pub work_minutes: i64,
    pub ot_minutes: i64,
}

impl ComputedStatus {
    fn zero(status: Status) -> Self {
        Self {
            status,
            late_minutes: 0,
            work_minutes: 0,
            ot_minutes: 0,
        }
    }
}

/// Maps one day's snapshot to a status and minute counts.
///
/// Precedence, first match wins: invalid input, weekend/holiday, leave
/// (punchless days only), missing check-in, in-progress session, missing
/// checkout, completed session, absent, unknown. `now` anchors the
/// today/past distinction; callers pass `Utc::now()`.
pub fn compute_attendance(
    snapshot: &DaySnapshot,
    holidays: &HashSet<String>,
    leaves: &HashSet<String>,
    now: DateTime<Utc>,
) -> ComputedStatus {
    let Some(date) = calendar::parse_date_key(&snapshot.date) else {
        return ComputedStatus::zero(Status::Unknown);
    };
    let check_in = snapshot.check_in_at;
    let check_out = snapshot.check_out_at;

    // A non-workday wins over everything, punches or not. Off-day work is
    // all overtime-eligible without approval, and "late" does not apply.
    if calendar::is_weekend(date) || holidays.contains(&snapshot.date) {
        if let (Some(ci), Some(co)) = (check_in, check_out) {
            let (work_minutes, ot_minutes) = work_and_ot(date, ci, co, true);
            return ComputedStatus {
                status: Status::WeekendOrHoliday,
                late_minutes: 0,
                work_minutes,
                ot_minutes,
            };
        }
        return ComputedStatus::zero(Status::WeekendOrHoliday);
    }

    // Leave is a fallback, not an override: punches on a leave day fall
    // through to the session rules.
    if leaves.contains(&snapshot.date) && check_in.is_none() && check_out.is_none() {
        return ComputedStatus::zero(Status::Leave);
    }

    if check_in.is_none() && check_out.is_some() {
        return ComputedStatus::zero(Status::MissingCheckin);
    }

    let today = calendar::local_date(now);
    match (check_in, check_out) {
        (Some(ci), None) if date == today => ComputedStatus {
            status: Status::Working,
            late_minutes: late_minutes(date, ci),
            work_minutes: 0,
            ot_minutes: 0,
        },
        (Some(ci), None) if date < today => ComputedStatus {
            status: Status::MissingCheckout,
            late_minutes: late_minutes(date, ci),
            work_minutes: 0,
            ot_minutes: 0,
        },
        (Some(ci), Some(co)) => {
            if co < ci {
                return ComputedStatus::zero(Status::Unknown);
            }
            let late = late_minutes(date, ci);
            let (work_minutes, ot_minutes) = work_and_ot(date, ci, co, snapshot.ot_approved);
            let status = match (late > 0, is_early_leave(date, co)) {
                (true, true) => Status::LateAndEarly,
                (true, false) => Status::Late,
                (false, true) => Status::EarlyLeave,
                (false, false) => Status::OnTime,
            };
            ComputedStatus {
                status,
                late_minutes: late,
                work_minutes,
                ot_minutes,
            }
        }
        (None, None) if date < today => ComputedStatus::zero(Status::Absent),
        _ => ComputedStatus::zero(Status::Unknown),
    }
}

/// Overtime minutes a completed session would earn if approval were
/// granted. Reporting aid only; the gated figure comes from
/// `compute_attendance`.
pub fn potential_ot_minutes(snapshot: &DaySnapshot) -> i64 {
    let Some(date) = calendar::parse_date_key(&snapshot.date) else {
        return 0;
    };
    match (snapshot.check_in_at, snapshot.check_out_at) {
        (Some(_), Some(co)) => ot_minutes(date, co),
        _ => 0,
    }
}

fn late_minutes(date: NaiveDate, check_in: DateTime<Utc>) -> i64 {
    match calendar::at_wall_time(date, SHIFT_START.0, SHIFT_START.1) {
        Some(shift_start) => calendar::minutes_between(shift_start, check_in).max(0),
        None => 0,
    }
}

fn is_early_leave(date: NaiveDate, check_out: DateTime<Utc>) -> bool {
    calendar::at_wall_time(date, SHIFT_END.0, SHIFT_END.1)
        .map(|shift_end| check_out < shift_end)
        .unwrap_or(false)
}

fn ot_minutes(date: NaiveDate, check_out: DateTime<Utc>) -> i64 {
    calendar::at_wall_time(date, OT_START.0, OT_START.1)
        .map(|ot_start| calendar::minutes_between(ot_start, check_out).max(0))
        .unwrap_or(0)
}

/// Work and overtime minutes for a completed session, both clamped to zero.
/// Without approval the effective checkout is capped at shift end and no
/// overtime accrues. The lunch hour is deducted when the (possibly capped)
/// interval fully spans it.
fn work_and_ot(
    date: NaiveDate,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    ot_approved: bool,
) -> (i64, i64) {
    let Some(shift_end) = calendar::at_wall_time(date, SHIFT_END.0, SHIFT_END.1) else {
        return (0, 0);
    };
    let effective_out = if ot_approved {
        check_out
    } else {
        check_out.min(shift_end)
    };

    let mut work = calendar::minutes_between(check_in, effective_out);
    if spans_lunch(date, check_in, effective_out) {
        work -= LUNCH_DEDUCTION_MINUTES;
    }
    let work = work.max(0);

    let ot = if ot_approved { ot_minutes(date, check_out) } else { 0 };
    (work, ot)
}

fn spans_lunch(date: NaiveDate, check_in: DateTime<Utc>, effective_out: DateTime<Utc>) -> bool {
    match (
        calendar::at_wall_time(date, LUNCH_START.0, LUNCH_START.1),
        calendar::at_wall_time(date, LUNCH_END.0, LUNCH_END.1),
    ) {
        (Some(lunch_start), Some(lunch_end)) => {
            check_in < lunch_start && effective_out > lunch_end
        }
        _ => false,
    }
}
