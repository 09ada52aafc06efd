//! # Table Preference Repository
//!
//! `(user, table_id) → JSON`. The blob is validated as JSON and otherwise
//! stored and returned untouched.

use chrono::Utc;
use sqlx::SqlitePool;

use vendorya_core::audit::TablePreference;
use vendorya_core::validation::{validate_json, validate_name};
use vendorya_core::{new_id, Principal};

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct PreferenceRepository {
    pool: SqlitePool,
}

impl PreferenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PreferenceRepository { pool }
    }

    pub async fn get(&self, principal: &Principal, table_id: &str) -> DbResult<Option<TablePreference>> {
        let pref = sqlx::query_as::<_, TablePreference>(
            "SELECT * FROM table_preferences WHERE user_id = ?1 AND table_id = ?2",
        )
        .bind(&principal.user_id)
        .bind(table_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pref)
    }

    pub async fn upsert(&self, principal: &Principal, table_id: &str, config: &str) -> DbResult<TablePreference> {
        validate_name("table_id", table_id, 100)?;
        validate_json("config", config)?;

        let pref = sqlx::query_as::<_, TablePreference>(
            r#"
            INSERT INTO table_preferences (id, user_id, table_id, config, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (user_id, table_id) DO UPDATE SET
                config = excluded.config,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&principal.user_id)
        .bind(table_id)
        .bind(config)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(pref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_acme;
    use crate::{Database, DbConfig, DbError};

    #[tokio::test]
    async fn test_upsert_replaces_blob() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let prefs = db.preferences();

        assert!(prefs.get(&acme.cashier, "products").await.unwrap().is_none());

        let first = prefs.upsert(&acme.cashier, "products", r#"{"sort":"name"}"#).await.unwrap();
        let second = prefs.upsert(&acme.cashier, "products", r#"{"sort":"-price"}"#).await.unwrap();
        assert_eq!(first.id, second.id);

        let stored = prefs.get(&acme.cashier, "products").await.unwrap().unwrap();
        assert_eq!(stored.config, r#"{"sort":"-price"}"#);

        // Per user
        assert!(prefs.get(&acme.owner, "products").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();

        let err = db.preferences().upsert(&acme.cashier, "products", "{not json").await.unwrap_err();
        assert!(matches!(err, DbError::Core(_)));
    }
}
