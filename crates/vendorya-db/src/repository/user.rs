//! # User Repository
//!
//! Staff accounts. Authentication is upstream; this only stores who a
//! user is, which store they belong to and their role.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use vendorya_core::tenant::{Role, User};
use vendorya_core::validation::validate_name;
use vendorya_core::{authorize, new_id, CoreError, EntityKind, Operation, Principal};

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates a staff account.
    ///
    /// Owners may add users to their own store only, and never superusers.
    pub async fn create(
        &self,
        principal: &Principal,
        username: &str,
        email: Option<&str>,
        store_id: Option<&str>,
        role: Role,
    ) -> DbResult<User> {
        authorize(principal, EntityKind::User, Operation::Add)?;
        validate_name("username", username, 150)?;

        let store_id = if principal.is_superuser() {
            store_id.map(str::to_string)
        } else {
            if role == Role::Superuser {
                return Err(CoreError::PermissionDenied("only superusers may grant SUPERUSER".into()).into());
            }
            principal.store_id.clone()
        };

        let user = User {
            id: new_id(),
            username: username.trim().to_string(),
            email: email.map(str::to_string),
            store_id,
            role,
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(username = %user.username, role = ?user.role, "Creating user");

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, store_id, role, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.store_id)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("username", &user.username),
            other => other,
        })?;

        Ok(user)
    }

    /// Active user by id. Inactive accounts are treated as unknown.
    pub async fn get_active(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, store_id, role, is_active, created_at FROM users WHERE id = ?1 AND is_active = 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Principal for an active user id, if any.
    pub async fn principal(&self, id: &str) -> DbResult<Option<Principal>> {
        Ok(self.get_active(id).await?.as_ref().map(Principal::from))
    }
}
