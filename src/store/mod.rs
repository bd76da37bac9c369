//! Storage seam for the session lifecycle. The state machine's
//! correctness rests on two primitives: a uniqueness constraint on
//! (user, date) at create time and a conditional "close only if still
//! open" update, so the trait exposes exactly those.

pub mod mysql;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::attendance::AttendanceRecord;

/// Open-session scans are capped to bound reads over corrupted data.
pub const OPEN_SCAN_CAP: usize = 200;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The (user, date) uniqueness constraint rejected a create.
    #[error("attendance record already exists for this user and date")]
    DuplicateRecord,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[allow(async_fn_in_trait)]
pub trait AttendanceStore {
    /// Open sessions for the user across all dates, newest check-in
    /// first, at most `cap` rows.
    async fn open_sessions(
        &self,
        user_id: u64,
        cap: usize,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Creates the record for `date` with `check_in_at = now`. Must fail
    /// with [`StoreError::DuplicateRecord`] when a record for
    /// (user, date) already exists, even under concurrent creates.
    async fn create_session(
        &self,
        user_id: u64,
        date: NaiveDate,
        now: DateTime<Utc>,
        ot_approved: bool,
    ) -> Result<AttendanceRecord, StoreError>;

    /// Sets `check_out_at = now` on the record only if it is still unset.
    /// Returns `None` when the condition no longer holds.
    async fn close_session(
        &self,
        record_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// All records for the user with `start <= date <= end`.
    async fn records_between(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;
}
