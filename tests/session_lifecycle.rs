//! End-to-end lifecycle tests: the manager runs against an in-memory
//! store that honors the same contract as the MySQL one (uniqueness on
//! (user, date), conditional close).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tokio::sync::mpsc;

use attendance_core::anomaly::AnomalyLogger;
use attendance_core::approvals::OvertimeApprovals;
use attendance_core::calendar;
use attendance_core::error::AttendanceError;
use attendance_core::model::anomaly::{AnomalyEntry, AnomalyPayload, DetectedAt};
use attendance_core::model::attendance::AttendanceRecord;
use attendance_core::session::SessionManager;
use attendance_core::store::{AttendanceStore, StoreError, OPEN_SCAN_CAP};
use attendance_core::AttendanceConfig;

const USER: u64 = 7;

#[derive(Default)]
struct Inner {
    rows: Vec<AttendanceRecord>,
    next_id: u64,
}

#[derive(Clone, Default)]
struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    fn seed(&self, record: AttendanceRecord) {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id = inner.next_id.max(record.id);
        inner.rows.push(record);
    }

    fn rows(&self) -> Vec<AttendanceRecord> {
        self.inner.lock().unwrap().rows.clone()
    }

    fn open_count(&self, user_id: u64) -> usize {
        self.rows()
            .iter()
            .filter(|r| r.user_id == user_id && r.is_open())
            .count()
    }
}

impl AttendanceStore for MemoryStore {
    async fn open_sessions(
        &self,
        user_id: u64,
        cap: usize,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut open: Vec<AttendanceRecord> = self
            .rows()
            .into_iter()
            .filter(|r| r.user_id == user_id && r.is_open())
            .collect();
        open.sort_by(|a, b| b.check_in_at.cmp(&a.check_in_at));
        open.truncate(cap);
        Ok(open)
    }

    async fn create_session(
        &self,
        user_id: u64,
        date: NaiveDate,
        now: DateTime<Utc>,
        ot_approved: bool,
    ) -> Result<AttendanceRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .rows
            .iter()
            .any(|r| r.user_id == user_id && r.date == date)
        {
            return Err(StoreError::DuplicateRecord);
        }
        inner.next_id += 1;
        let record = AttendanceRecord {
            id: inner.next_id,
            user_id,
            date,
            check_in_at: Some(now),
            check_out_at: None,
            ot_approved,
        };
        inner.rows.push(record.clone());
        Ok(record)
    }

    async fn close_session(
        &self,
        record_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(record) = inner.rows.iter_mut().find(|r| r.id == record_id) else {
            return Ok(None);
        };
        if record.check_out_at.is_some() {
            return Ok(None);
        }
        record.check_out_at = Some(now);
        Ok(Some(record.clone()))
    }

    async fn records_between(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut rows: Vec<AttendanceRecord> = self
            .rows()
            .into_iter()
            .filter(|r| r.user_id == user_id && r.date >= start && r.date <= end)
            .collect();
        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }
}

#[derive(Clone, Default)]
struct StubApprovals {
    approved: HashSet<(u64, NaiveDate)>,
}

impl OvertimeApprovals for StubApprovals {
    async fn has_approved_overtime(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        Ok(self.approved.contains(&(user_id, date)))
    }
}

struct Harness {
    manager: SessionManager<MemoryStore, StubApprovals>,
    store: MemoryStore,
    anomalies: mpsc::Receiver<AnomalyEntry>,
}

fn harness_with_approvals(approvals: StubApprovals) -> Harness {
    let store = MemoryStore::default();
    let (logger, rx) = AnomalyLogger::channel(16);
    let manager = SessionManager::new(
        store.clone(),
        approvals,
        AttendanceConfig::default(),
        logger,
    );
    Harness {
        manager,
        store,
        anomalies: rx,
    }
}

fn harness() -> Harness {
    harness_with_approvals(StubApprovals::default())
}

fn local(key: &str, hour: u32, minute: u32) -> DateTime<Utc> {
    calendar::at_wall_time(calendar::parse_date_key(key).unwrap(), hour, minute).unwrap()
}

fn open_record(id: u64, user_id: u64, date: &str, check_in_at: DateTime<Utc>) -> AttendanceRecord {
    AttendanceRecord {
        id,
        user_id,
        date: calendar::parse_date_key(date).unwrap(),
        check_in_at: Some(check_in_at),
        check_out_at: None,
        ot_approved: false,
    }
}

#[tokio::test]
async fn check_in_then_check_out_round_trip() {
    let mut h = harness();
    let morning = local("2026-03-16", 8, 30);
    let evening = local("2026-03-16", 17, 30);

    let record = h.manager.check_in(USER, morning).await.unwrap();
    assert_eq!(record.date, calendar::parse_date_key("2026-03-16").unwrap());
    assert_eq!(record.check_in_at, Some(morning));
    assert!(record.is_open());
    assert!(!record.ot_approved);

    let closed = h.manager.check_out(USER, evening).await.unwrap();
    assert_eq!(closed.id, record.id);
    assert_eq!(closed.check_out_at, Some(evening));
    assert_eq!(h.store.open_count(USER), 0);
    assert!(h.anomalies.try_recv().is_err());
}

#[tokio::test]
async fn check_in_stamps_same_day_overtime_approval() {
    let mut approvals = StubApprovals::default();
    approvals
        .approved
        .insert((USER, calendar::parse_date_key("2026-03-16").unwrap()));
    let h = harness_with_approvals(approvals);

    let record = h
        .manager
        .check_in(USER, local("2026-03-16", 8, 30))
        .await
        .unwrap();
    assert!(record.ot_approved);
}

#[tokio::test]
async fn second_check_in_is_rejected_while_open() {
    let mut h = harness();
    let now = local("2026-03-16", 8, 30);
    h.manager.check_in(USER, now).await.unwrap();

    let err = h
        .manager
        .check_in(USER, now + Duration::minutes(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AttendanceError::OpenSessionExists));
    assert_eq!(err.reason(), "OPEN_SESSION_EXISTS");
    // Exactly one record was created and the fresh session is no anomaly.
    assert_eq!(h.store.rows().len(), 1);
    assert!(h.anomalies.try_recv().is_err());
}

#[tokio::test]
async fn lost_create_race_reads_as_already_checked_in() {
    let h = harness();
    let date = "2026-03-16";
    // Today's record exists and is closed, as after a racing winner or an
    // earlier same-day session.
    let mut closed = open_record(1, USER, date, local(date, 8, 0));
    closed.check_out_at = Some(local(date, 12, 0));
    h.store.seed(closed);

    let err = h
        .manager
        .check_in(USER, local(date, 13, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AttendanceError::AlreadyCheckedIn));
    assert_eq!(err.reason(), "ALREADY_CHECKED_IN");
}

#[tokio::test]
async fn check_out_without_history_fails() {
    let h = harness();
    let err = h
        .manager
        .check_out(USER, local("2026-03-16", 17, 30))
        .await
        .unwrap_err();
    assert!(matches!(err, AttendanceError::MustCheckInFirst));
    assert_eq!(err.reason(), "MUST_CHECK_IN_FIRST");
}

#[tokio::test]
async fn stale_session_blocks_checkout_and_is_logged() {
    let mut h = harness();
    let now = local("2026-03-17", 9, 0);
    let stale_check_in = now - AttendanceConfig::default().grace_period() - Duration::minutes(1);
    h.store.seed(open_record(1, USER, "2026-03-16", stale_check_in));

    let err = h.manager.check_out(USER, now).await.unwrap_err();
    assert!(matches!(err, AttendanceError::SessionExpired));
    assert_eq!(err.reason(), "SESSION_EXPIRED");
    // The garbage session is not silently closed.
    assert_eq!(h.store.open_count(USER), 1);

    let entry = h.anomalies.try_recv().expect("stale anomaly logged");
    match entry.payload {
        AnomalyPayload::StaleOpenSession(p) => {
            assert_eq!(p.detected_at, DetectedAt::CheckOut);
            assert_eq!(p.check_in_at, stale_check_in);
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[tokio::test]
async fn checkout_just_inside_the_grace_window_succeeds() {
    let mut h = harness();
    let now = local("2026-03-17", 9, 0);
    let fresh_check_in = now - AttendanceConfig::default().grace_period() + Duration::minutes(1);
    h.store.seed(open_record(1, USER, "2026-03-16", fresh_check_in));

    let closed = h.manager.check_out(USER, now).await.unwrap();
    assert_eq!(closed.check_out_at, Some(now));
    assert!(h.anomalies.try_recv().is_err());
}

#[tokio::test]
async fn stale_session_blocks_check_in_and_is_logged() {
    let mut h = harness();
    let now = local("2026-03-18", 8, 30);
    let stale_check_in = now - Duration::hours(72);
    h.store.seed(open_record(1, USER, "2026-03-15", stale_check_in));

    let err = h.manager.check_in(USER, now).await.unwrap_err();
    // Strict policy: stale or not, an open session blocks check-in.
    assert!(matches!(err, AttendanceError::OpenSessionExists));

    let entry = h.anomalies.try_recv().expect("stale anomaly logged");
    match entry.payload {
        AnomalyPayload::StaleOpenSession(p) => {
            assert_eq!(p.detected_at, DetectedAt::CheckIn);
            assert_eq!(p.date, "2026-03-15");
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[tokio::test]
async fn multiple_open_sessions_are_logged_and_newest_is_closed() {
    let mut h = harness();
    let now = local("2026-03-17", 17, 30);
    h.store
        .seed(open_record(1, USER, "2026-03-17", local("2026-03-17", 8, 30)));
    h.store
        .seed(open_record(2, USER, "2026-03-17", local("2026-03-17", 6, 0)));
    // Oldest first in the store is irrelevant; scan orders newest first.

    let closed = h.manager.check_out(USER, now).await.unwrap();
    assert_eq!(closed.id, 1);
    assert_eq!(h.store.open_count(USER), 1);

    let entry = h.anomalies.try_recv().expect("multi-session anomaly logged");
    match entry.payload {
        AnomalyPayload::MultipleActiveSessions(p) => {
            assert_eq!(p.count, 2);
            assert_eq!(p.sessions.len(), 2);
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[tokio::test]
async fn conditional_close_lets_exactly_one_checkout_win() {
    let h = harness();
    let date = "2026-03-16";
    h.store.seed(open_record(1, USER, date, local(date, 8, 30)));

    let first = h
        .store
        .close_session(1, local(date, 17, 30))
        .await
        .unwrap();
    assert!(first.is_some());
    let second = h
        .store
        .close_session(1, local(date, 17, 31))
        .await
        .unwrap();
    assert!(second.is_none());
    // Through the manager the loser re-reads and sees nothing open.
    let err = h
        .manager
        .check_out(USER, local(date, 17, 32))
        .await
        .unwrap_err();
    assert!(matches!(err, AttendanceError::MustCheckInFirst));
}

#[tokio::test]
async fn cross_midnight_session_closes_on_its_check_in_date() {
    let mut h = harness();
    let late_evening = local("2026-03-16", 23, 0);
    let next_morning = local("2026-03-17", 1, 0);

    let record = h.manager.check_in(USER, late_evening).await.unwrap();
    let closed = h.manager.check_out(USER, next_morning).await.unwrap();
    assert_eq!(closed.id, record.id);
    // The record belongs to the check-in day even though checkout landed
    // on the next date key.
    assert_eq!(closed.date, calendar::parse_date_key("2026-03-16").unwrap());
    assert!(h.anomalies.try_recv().is_err());
}

#[tokio::test]
async fn at_most_one_open_session_after_any_completed_pair() {
    let h = harness();
    let days = ["2026-03-16", "2026-03-17", "2026-03-18"];
    for day in days {
        h.manager.check_in(USER, local(day, 8, 30)).await.unwrap();
        assert!(h.store.open_count(USER) <= 1);
        h.manager.check_out(USER, local(day, 17, 30)).await.unwrap();
        assert_eq!(h.store.open_count(USER), 0);
    }
    assert_eq!(h.store.rows().len(), days.len());
}

#[tokio::test]
async fn open_scan_is_capped() {
    let h = harness();
    for i in 1..=OPEN_SCAN_CAP as u64 + 50 {
        // Corrupted history: hundreds of open rows on distinct dates.
        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(i as i64);
        h.store.seed(AttendanceRecord {
            id: i,
            user_id: USER,
            date: day,
            check_in_at: calendar::at_wall_time(day, 9, 0),
            check_out_at: None,
            ot_approved: false,
        });
    }
    let open = h.store.open_sessions(USER, OPEN_SCAN_CAP).await.unwrap();
    assert_eq!(open.len(), OPEN_SCAN_CAP);
}
