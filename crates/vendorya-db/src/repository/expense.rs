//! # Expense Repository

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use vendorya_core::finance::{Expense, NewExpense};
use vendorya_core::validation::{validate_name, validate_payment_amount};
use vendorya_core::{authorize, new_id, EntityKind, Operation, Principal};

use crate::error::{DbError, DbResult};
use crate::scope::push_scope;

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn create(&self, principal: &Principal, store_id: &str, input: &NewExpense) -> DbResult<Expense> {
        authorize(principal, EntityKind::Expense, Operation::Add)?;
        principal.ensure_store(store_id)?;
        validate_name("description", &input.description, 255)?;
        validate_payment_amount(input.amount)?;

        if let Some(branch_id) = &input.branch_id {
            let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM branches WHERE id = ?1 AND store_id = ?2")
                .bind(branch_id)
                .bind(store_id)
                .fetch_optional(&self.pool)
                .await?;
            if found.is_none() {
                return Err(DbError::not_found("Branch", branch_id));
            }
        }

        let expense = Expense {
            id: new_id(),
            store_id: store_id.to_string(),
            branch_id: input.branch_id.clone(),
            description: input.description.trim().to_string(),
            amount: input.amount,
            spent_by: Some(principal.user_id.clone()),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO expenses (id, store_id, branch_id, description, amount, spent_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.store_id)
        .bind(&expense.branch_id)
        .bind(&expense.description)
        .bind(expense.amount)
        .bind(&expense.spent_by)
        .bind(expense.created_at)
        .execute(&self.pool)
        .await?;

        debug!(expense_id = %expense.id, amount = %expense.amount, "Expense recorded");
        Ok(expense)
    }

    /// Newest first.
    pub async fn list(&self, principal: &Principal, limit: i64) -> DbResult<Vec<Expense>> {
        let scope = authorize(principal, EntityKind::Expense, Operation::View)?;

        let mut qb = sqlx::QueryBuilder::new("SELECT t.* FROM expenses t WHERE 1 = 1");
        push_scope(&mut qb, EntityKind::Expense, "t", &scope, true);
        qb.push(" ORDER BY t.created_at DESC LIMIT ");
        qb.push_bind(limit);

        Ok(qb.build_query_as::<Expense>().fetch_all(&self.pool).await?)
    }
}
