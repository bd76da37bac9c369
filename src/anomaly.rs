//! Best-effort anomaly recording. Entries travel over a bounded channel
//! to a detached writer task, so a slow or failing log store can never
//! fail or roll back the check-in/check-out that triggered it.

use chrono::{DateTime, Duration, Utc};
use sqlx::MySqlPool;
use tokio::sync::mpsc;

use crate::model::anomaly::{
    AnomalyEntry, AnomalyPayload, DetectedAt, MultipleActiveSessions, SessionSummary,
    StaleOpenSession, RETENTION_DAYS, SESSION_SUMMARY_CAP,
};
use crate::model::attendance::AttendanceRecord;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AnomalyLogger {
    tx: mpsc::Sender<AnomalyEntry>,
}

impl AnomalyLogger {
    /// Logger plus the raw receiving end, for embedding a custom writer.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AnomalyEntry>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Logger wired to a detached MySQL writer task.
    pub fn start(pool: MySqlPool) -> Self {
        let (logger, rx) = Self::channel(DEFAULT_QUEUE_CAPACITY);
        tokio::spawn(write_loop(pool, rx));
        logger
    }

    pub fn stale_open_session(
        &self,
        user_id: u64,
        record: &AttendanceRecord,
        detected_at: DetectedAt,
        now: DateTime<Utc>,
    ) {
        // A record with no check-in cannot be a stale open session.
        let Some(check_in_at) = record.check_in_at else {
            return;
        };
        let payload = AnomalyPayload::StaleOpenSession(StaleOpenSession {
            date: record.date_key(),
            check_in_at,
            detected_at,
        });
        self.record(user_id, payload, now);
    }

    pub fn multiple_active_sessions(
        &self,
        user_id: u64,
        count: usize,
        open: &[AttendanceRecord],
        now: DateTime<Utc>,
    ) {
        let sessions: Vec<SessionSummary> = open
            .iter()
            .filter_map(|record| {
                record.check_in_at.map(|check_in_at| SessionSummary {
                    date: record.date_key(),
                    check_in_at,
                })
            })
            .take(SESSION_SUMMARY_CAP)
            .collect();
        let payload =
            AnomalyPayload::MultipleActiveSessions(MultipleActiveSessions { count, sessions });
        self.record(user_id, payload, now);
    }

    fn record(&self, user_id: u64, payload: AnomalyPayload, now: DateTime<Utc>) {
        let entry = match AnomalyEntry::new(user_id, payload, now) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, user_id, "dropping malformed anomaly entry");
                return;
            }
        };
        if let Err(e) = self.tx.try_send(entry) {
            tracing::warn!(error = %e, user_id, "anomaly queue unavailable, entry dropped");
        }
    }
}

async fn write_loop(pool: MySqlPool, mut rx: mpsc::Receiver<AnomalyEntry>) {
    while let Some(entry) = rx.recv().await {
        if let Err(e) = insert_entry(&pool, &entry).await {
            tracing::warn!(
                error = %e,
                anomaly_type = %entry.anomaly_type,
                user_id = entry.user_id,
                "failed to persist anomaly entry"
            );
        }
    }
}

async fn insert_entry(pool: &MySqlPool, entry: &AnomalyEntry) -> anyhow::Result<()> {
    let payload = serde_json::to_string(&entry.payload)?;
    sqlx::query(
        "INSERT INTO anomaly_log (id, user_id, anomaly_type, payload, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&entry.id)
    .bind(entry.user_id)
    .bind(entry.anomaly_type.to_string())
    .bind(payload)
    .bind(entry.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Deletes entries past the retention window. Invoked by the host's
/// scheduler; this core runs nothing periodically on its own.
pub async fn purge_expired(pool: &MySqlPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let cutoff = now - Duration::days(RETENTION_DAYS);
    let result = sqlx::query("DELETE FROM anomaly_log WHERE created_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
