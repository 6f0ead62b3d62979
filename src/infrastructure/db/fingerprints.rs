use sqlx::SqlitePool;

use crate::domain::error::{AppError, Result};

/// Remembers recent case payload hashes per agent to catch double submits.
pub struct FingerprintRepository {
    pool: SqlitePool,
}

impl FingerprintRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Case id of a submission with the same fingerprint at or after `since` (unix seconds).
    pub async fn find_recent(
        &self,
        fingerprint: &str,
        agent_id: &str,
        since: i64,
    ) -> Result<Option<String>> {
        sqlx::query_scalar(
            r#"
            SELECT case_id FROM submission_fingerprints
            WHERE fingerprint = ? AND agent_id = ? AND submitted_at >= ?
            ORDER BY submitted_at DESC
            LIMIT 1
            "#,
        )
        .bind(fingerprint)
        .bind(agent_id)
        .bind(since)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to read fingerprints: {}", e)))
    }

    pub async fn record(
        &self,
        fingerprint: &str,
        agent_id: &str,
        case_id: &str,
        submitted_at: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO submission_fingerprints (fingerprint, agent_id, case_id, submitted_at) VALUES (?, ?, ?, ?)",
        )
        .bind(fingerprint)
        .bind(agent_id)
        .bind(case_id)
        .bind(submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to record fingerprint: {}", e)))?;
        Ok(())
    }

    /// Drops entries older than `before` (unix seconds).
    pub async fn prune(&self, before: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM submission_fingerprints WHERE submitted_at < ?")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to prune fingerprints: {}", e)))?;
        Ok(result.rows_affected())
    }
}
