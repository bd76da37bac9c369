//! Read-only view of the request-approval workflow. This core never
//! mutates approval state; it only asks whether an approved overtime
//! request exists when stamping a new session.

use chrono::NaiveDate;
use sqlx::MySqlPool;

use crate::store::StoreError;

#[allow(async_fn_in_trait)]
pub trait OvertimeApprovals {
    /// Whether an approved overtime request exists for the user on `date`.
    async fn has_approved_overtime(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<bool, StoreError>;
}

/// Reads the approval workflow's table directly.
#[derive(Clone)]
pub struct MySqlOvertimeApprovals {
    pool: MySqlPool,
}

impl MySqlOvertimeApprovals {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

impl OvertimeApprovals for MySqlOvertimeApprovals {
    async fn has_approved_overtime(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM overtime_requests \
             WHERE user_id = ? AND date = ? AND status = 'approved'",
        )
        .bind(user_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.into()))?;
        Ok(count > 0)
    }
}
