//! Activity log for the intake service
//!
//! Every mutation, authentication failure and gateway error lands in the
//! `activity_log` table:
//! - Missing agent, entity id or IP values are stored as `N/A`
//! - Writing the log never fails the operation being logged
//! - Supervisors read it back newest first, optionally filtered

use crate::domain::activity::{ActivityEntry, ActivityFilter, ActivityRecord, NOT_AVAILABLE};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::rows::now_iso;
use sqlx::SqlitePool;
use tracing::{error, info};

pub const MAX_RECENT: i64 = 500;

/// Audit service for agent activity
pub struct AuditService {
    db_pool: SqlitePool,
}

impl AuditService {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Append an entry. Storage errors are logged and swallowed.
    pub async fn log_activity(&self, entry: ActivityEntry) {
        info!(
            action = %entry.action,
            entity = %entry.entity,
            agent = entry.agent_email.as_deref().unwrap_or(NOT_AVAILABLE),
            "Activity"
        );

        if let Err(e) = self.insert(&entry).await {
            error!("Failed to write activity log entry {}: {}", entry.action, e);
        }
    }

    async fn insert(&self, entry: &ActivityEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (
                timestamp,
                agent_id,
                agent_email,
                action,
                entity,
                entity_id,
                details,
                ip_address
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(now_iso())
        .bind(or_not_available(entry.agent_id.as_deref()))
        .bind(or_not_available(entry.agent_email.as_deref()))
        .bind(&entry.action)
        .bind(&entry.entity)
        .bind(or_not_available(entry.entity_id.as_deref()))
        .bind(&entry.details)
        .bind(or_not_available(entry.ip_address.as_deref()))
        .execute(&self.db_pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create activity log: {}", e)))?;
        Ok(())
    }

    /// Newest entries first.
    pub async fn recent(&self, limit: i64, filter: &ActivityFilter) -> Result<Vec<ActivityRecord>> {
        let limit = limit.clamp(1, MAX_RECENT);

        sqlx::query_as::<_, ActivityRecord>(
            r#"
            SELECT
                id, timestamp, agent_id, agent_email, action, entity,
                entity_id, details, ip_address
            FROM activity_log
            WHERE (?1 IS NULL OR action = ?1)
              AND (?2 IS NULL OR entity = ?2)
              AND (?3 IS NULL OR lower(agent_email) = lower(?3))
            ORDER BY id DESC
            LIMIT ?4
            "#,
        )
        .bind(blank_to_none(filter.action.as_deref()))
        .bind(blank_to_none(filter.entity.as_deref()))
        .bind(blank_to_none(filter.agent_email.as_deref()))
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch activity log: {}", e)))
    }
}

fn or_not_available(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn blank_to_none(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::activity::actions;
    use crate::infrastructure::db::connection::init_memory_db;

    async fn service() -> AuditService {
        AuditService::new(init_memory_db().await.unwrap())
    }

    #[tokio::test]
    async fn test_missing_values_become_not_available() {
        let audit = service().await;
        audit
            .log_activity(ActivityEntry::new(actions::AUTH_FAILED, "AUTH", "sin identidad"))
            .await;

        let records = audit.recent(10, &ActivityFilter::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent_email, NOT_AVAILABLE);
        assert_eq!(records[0].entity_id, NOT_AVAILABLE);
        assert_eq!(records[0].ip_address, NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_filtered() {
        let audit = service().await;
        for i in 0..3 {
            audit
                .log_activity(
                    ActivityEntry::new(actions::CREATE_CASE, "CASOS", format!("caso {}", i))
                        .by(Some("1"), Some("Ana@trabajo.gob.sv"))
                        .on(Some(&i.to_string())),
                )
                .await;
        }
        audit
            .log_activity(ActivityEntry::new(actions::CREATE_AGENT, "AGENTES", "nuevo"))
            .await;

        let all = audit.recent(10, &ActivityFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].action, actions::CREATE_AGENT);

        let cases = audit
            .recent(
                2,
                &ActivityFilter {
                    action: Some(actions::CREATE_CASE.to_string()),
                    agent_email: Some("ana@trabajo.gob.sv".to_string()),
                    ..ActivityFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].entity_id, "2");
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let audit = service().await;
        audit
            .log_activity(ActivityEntry::new(actions::CREATE_CASE, "CASOS", ""))
            .await;
        let records = audit.recent(0, &ActivityFilter::default()).await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
