use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::TryStreamExt;
use sqlx::MySqlPool;

use super::{AttendanceStore, StoreError};
use crate::model::attendance::AttendanceRecord;

const RECORD_COLUMNS: &str = "id, user_id, date, check_in_at, check_out_at, ot_approved";

/// MySQL-backed attendance store. The (user_id, date) unique key and the
/// conditional UPDATE carry the concurrency guarantees; no application
/// lock is held.
#[derive(Clone)]
pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_id(&self, record_id: u64) -> Result<AttendanceRecord, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE id = ?");
        sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(into_store_error)?
            .ok_or_else(|| {
                StoreError::Backend(anyhow!("attendance record {record_id} missing after write"))
            })
    }
}

impl AttendanceStore for MySqlAttendanceStore {
    async fn open_sessions(
        &self,
        user_id: u64,
        cap: usize,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance \
             WHERE user_id = ? AND check_in_at IS NOT NULL AND check_out_at IS NULL \
             ORDER BY check_in_at DESC"
        );
        let mut rows = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(user_id)
            .fetch(&self.pool);

        let mut open = Vec::new();
        while let Some(record) = rows.try_next().await.map_err(into_store_error)? {
            open.push(record);
            if open.len() >= cap {
                break;
            }
        }
        Ok(open)
    }

    async fn create_session(
        &self,
        user_id: u64,
        date: NaiveDate,
        now: DateTime<Utc>,
        ot_approved: bool,
    ) -> Result<AttendanceRecord, StoreError> {
        let result = sqlx::query(
            "INSERT INTO attendance (user_id, date, check_in_at, ot_approved) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(date)
        .bind(now)
        .bind(ot_approved)
        .execute(&self.pool)
        .await
        .map_err(into_store_error)?;

        self.fetch_by_id(result.last_insert_id()).await
    }

    async fn close_session(
        &self,
        record_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let result = sqlx::query(
            "UPDATE attendance SET check_out_at = ? WHERE id = ? AND check_out_at IS NULL",
        )
        .bind(now)
        .bind(record_id)
        .execute(&self.pool)
        .await
        .map_err(into_store_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(self.fetch_by_id(record_id).await?))
    }

    async fn records_between(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance \
             WHERE user_id = ? AND date BETWEEN ? AND ? \
             ORDER BY date ASC"
        );
        sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(user_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(into_store_error)
    }
}

/// MySQL signals uniqueness violations with SQLSTATE 23000.
fn into_store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23000") {
            return StoreError::DuplicateRecord;
        }
    }
    StoreError::Backend(err.into())
}
