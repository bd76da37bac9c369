//! Check-in/check-out state machine. Per record the states are
//! NO_SESSION -> OPEN -> CLOSED, and a closed record never reopens.
//! Per user, at most one record should be open at a time; violations are
//! observable anomalies rather than hard failures, so legacy data can be
//! surfaced instead of wedged.

use chrono::{DateTime, Utc};

use crate::anomaly::AnomalyLogger;
use crate::approvals::OvertimeApprovals;
use crate::calendar;
use crate::config::AttendanceConfig;
use crate::error::AttendanceError;
use crate::model::anomaly::DetectedAt;
use crate::model::attendance::AttendanceRecord;
use crate::store::{AttendanceStore, StoreError, OPEN_SCAN_CAP};

pub struct SessionManager<S, A> {
    store: S,
    approvals: A,
    config: AttendanceConfig,
    anomalies: AnomalyLogger,
}

impl<S, A> SessionManager<S, A>
where
    S: AttendanceStore,
    A: OvertimeApprovals,
{
    pub fn new(store: S, approvals: A, config: AttendanceConfig, anomalies: AnomalyLogger) -> Self {
        Self {
            store,
            approvals,
            config,
            anomalies,
        }
    }

    /// Opens today's session. Strict policy: any open session, however
    /// old, blocks a new check-in; stale ones are additionally logged so
    /// an administrator can intervene.
    pub async fn check_in(
        &self,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let open = self.store.open_sessions(user_id, OPEN_SCAN_CAP).await?;
        if let Some(oldest) = open.last() {
            let earliest_allowed = now - self.config.grace_period();
            if oldest.check_in_at.is_some_and(|ci| ci < earliest_allowed) {
                self.anomalies
                    .stale_open_session(user_id, oldest, DetectedAt::CheckIn, now);
            }
            return Err(AttendanceError::OpenSessionExists);
        }

        let date = calendar::local_date(now);
        // Stamp same-day approvals granted before check-in.
        let ot_approved = self.approvals.has_approved_overtime(user_id, date).await?;

        match self.store.create_session(user_id, date, now, ot_approved).await {
            Ok(record) => {
                tracing::info!(user_id, date = %record.date, ot_approved, "checked in");
                Ok(record)
            }
            // Lost create race: the other attempt owns today's record.
            Err(StoreError::DuplicateRecord) => Err(AttendanceError::AlreadyCheckedIn),
            Err(e) => Err(e.into()),
        }
    }

    /// Closes the most recent open session, unless it is stale. Multiple
    /// open sessions are logged but do not block the close on their own.
    pub async fn check_out(
        &self,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let open = self.store.open_sessions(user_id, OPEN_SCAN_CAP).await?;
        let Some(newest) = open.first() else {
            return Err(AttendanceError::MustCheckInFirst);
        };

        if open.len() > 1 {
            self.anomalies
                .multiple_active_sessions(user_id, open.len(), &open, now);
        }

        let earliest_allowed = now - self.config.grace_period();
        if newest.check_in_at.is_some_and(|ci| ci < earliest_allowed) {
            self.anomalies
                .stale_open_session(user_id, newest, DetectedAt::CheckOut, now);
            return Err(AttendanceError::SessionExpired);
        }

        match self.store.close_session(newest.id, now).await? {
            Some(record) => {
                tracing::info!(user_id, record_id = record.id, "checked out");
                Ok(record)
            }
            // The conditional update matched nothing: a concurrent
            // checkout already closed this record.
            None => Err(AttendanceError::AlreadyCheckedOut),
        }
    }
}
