use sqlx::MySqlPool;

pub async fn init_db(database_url: &str) -> MySqlPool {
    MySqlPool::connect(database_url)
        .await
        .expect("Failed to connect to database")
}

/// Idempotent schema bootstrap. The unique key on (user_id, date) is what
/// the check-in create race relies on; anomaly_log is indexed on
/// created_at for the retention purge.
pub async fn ensure_schema(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            user_id BIGINT UNSIGNED NOT NULL,
            date DATE NOT NULL,
            check_in_at DATETIME(3) NULL,
            check_out_at DATETIME(3) NULL,
            ot_approved TINYINT(1) NOT NULL DEFAULT 0,
            UNIQUE KEY uq_attendance_user_date (user_id, date),
            KEY idx_attendance_open (user_id, check_out_at)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS anomaly_log (
            id CHAR(36) NOT NULL PRIMARY KEY,
            user_id BIGINT UNSIGNED NOT NULL,
            anomaly_type VARCHAR(64) NOT NULL,
            payload JSON NOT NULL,
            created_at DATETIME(3) NOT NULL,
            KEY idx_anomaly_created (created_at)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
