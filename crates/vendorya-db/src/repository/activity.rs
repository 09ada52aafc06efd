//! # Activity Log Repository
//!
//! Append-only. Rows are written inside the same transaction as the
//! business operation they describe, via [`record`]; the schema aborts any
//! UPDATE or DELETE.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use vendorya_core::audit::{ActivityAction, ActivityLog};
use vendorya_core::{authorize, new_id, EntityKind, Operation, Principal};

use crate::error::DbResult;
use crate::scope::push_scope;

/// One audit entry to write.
#[derive(Debug, Clone)]
pub struct Activity<'a> {
    pub store_id: Option<&'a str>,
    pub user_id: Option<&'a str>,
    pub action: ActivityAction,
    pub entity_kind: EntityKind,
    pub entity_id: &'a str,
    pub details: serde_json::Value,
}

/// Appends an audit row on `conn` (usually the caller's open transaction).
pub async fn record(conn: &mut SqliteConnection, activity: Activity<'_>) -> DbResult<()> {
    debug!(
        action = ?activity.action,
        entity = %activity.entity_kind,
        id = %activity.entity_id,
        "Recording activity"
    );

    sqlx::query(
        r#"
        INSERT INTO activity_logs (id, store_id, user_id, action, entity_kind, entity_id, details, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(new_id())
    .bind(activity.store_id)
    .bind(activity.user_id)
    .bind(activity.action)
    .bind(activity.entity_kind.to_string())
    .bind(activity.entity_id)
    .bind(activity.details.to_string())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ActivityRepository { pool }
    }

    /// Most recent entries visible to `principal`, newest first.
    pub async fn list(&self, principal: &Principal, limit: i64) -> DbResult<Vec<ActivityLog>> {
        let scope = authorize(principal, EntityKind::ActivityLog, Operation::View)?;

        let mut qb = sqlx::QueryBuilder::new("SELECT t.* FROM activity_logs t WHERE 1 = 1");
        push_scope(&mut qb, EntityKind::ActivityLog, "t", &scope, true);
        qb.push(" ORDER BY t.created_at DESC, t.rowid DESC LIMIT ");
        qb.push_bind(limit);

        Ok(qb.build_query_as::<ActivityLog>().fetch_all(&self.pool).await?)
    }

    /// Entries about one entity, oldest first.
    pub async fn for_entity(&self, principal: &Principal, entity_id: &str) -> DbResult<Vec<ActivityLog>> {
        let scope = authorize(principal, EntityKind::ActivityLog, Operation::View)?;

        let mut qb = sqlx::QueryBuilder::new("SELECT t.* FROM activity_logs t WHERE t.entity_id = ");
        qb.push_bind(entity_id.to_string());
        push_scope(&mut qb, EntityKind::ActivityLog, "t", &scope, true);
        qb.push(" ORDER BY t.created_at ASC, t.rowid ASC");

        Ok(qb.build_query_as::<ActivityLog>().fetch_all(&self.pool).await?)
    }
}
