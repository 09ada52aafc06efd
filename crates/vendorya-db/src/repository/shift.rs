//! # Work Shift Repository
//!
//! ```text
//! open(user, store, branch, starting_cash)
//!     └── partial unique index: one OPEN shift per (user, store, branch)
//!
//! close(shift, counted)
//!     now          = end_time
//!     cash_sales   = Σ cash payments by user in store, start_time ≤ t ≤ now
//!     expected     = starting_cash + cash_sales
//!     difference   = counted − expected
//!     UPDATE ... WHERE status = 'OPEN'   (terminal, no reopen)
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use vendorya_core::audit::ActivityAction;
use vendorya_core::finance::{ShiftStatus, WorkShift};
use vendorya_core::tenant::Role;
use vendorya_core::totals::reconcile_shift;
use vendorya_core::validation::validate_price;
use vendorya_core::{authorize, new_id, CoreError, EntityKind, Money, Operation, Principal};

use crate::error::{DbError, DbResult};
use crate::repository::activity::{record, Activity};
use crate::repository::store::resolve_branch;

/// The user's open shift in a store, if any.
pub async fn find_open(conn: &mut SqliteConnection, user_id: &str, store_id: &str) -> DbResult<Option<WorkShift>> {
    let shift = sqlx::query_as::<_, WorkShift>(
        r#"
        SELECT * FROM work_shifts
        WHERE user_id = ?1 AND store_id = ?2 AND status = 'OPEN'
        ORDER BY start_time DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(shift)
}

/// Cash taken by `user_id` in `store_id` within `[from, to]`.
pub async fn cash_sales(
    conn: &mut SqliteConnection,
    user_id: &str,
    store_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> DbResult<Money> {
    let total: Money = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(p.amount), 0)
        FROM payments p
        JOIN payment_methods m ON m.id = p.method_id
        JOIN sales_invoices i ON i.id = p.invoice_id
        WHERE m.is_cash = 1
          AND i.store_id = ?1
          AND p.created_by = ?2
          AND p.created_at >= ?3
          AND p.created_at <= ?4
        "#,
    )
    .bind(store_id)
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Opens a shift for the acting user.
    pub async fn open(
        &self,
        principal: &Principal,
        store_id: &str,
        branch_id: Option<&str>,
        starting_cash: Money,
    ) -> DbResult<WorkShift> {
        authorize(principal, EntityKind::WorkShift, Operation::Add)?;
        principal.ensure_store(store_id)?;
        validate_price("starting_cash", starting_cash)?;

        let branch = {
            let mut conn = self.pool.acquire().await?;
            resolve_branch(&mut conn, store_id, branch_id).await?
        };

        let shift = WorkShift {
            id: new_id(),
            user_id: principal.user_id.clone(),
            store_id: store_id.to_string(),
            branch_id: branch.id,
            status: ShiftStatus::Open,
            start_time: Utc::now(),
            end_time: None,
            starting_cash,
            closing_cash: None,
            expected_cash: None,
            difference: None,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO work_shifts (id, user_id, store_id, branch_id, status, start_time, starting_cash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.user_id)
        .bind(&shift.store_id)
        .bind(&shift.branch_id)
        .bind(shift.status)
        .bind(shift.start_time)
        .bind(shift.starting_cash)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::Core(CoreError::ShiftAlreadyOpen),
            other => other,
        })?;

        record(
            &mut tx,
            Activity {
                store_id: Some(&shift.store_id),
                user_id: Some(&shift.user_id),
                action: ActivityAction::ShiftOpen,
                entity_kind: EntityKind::WorkShift,
                entity_id: &shift.id,
                details: serde_json::json!({
                    "branch_id": shift.branch_id,
                    "starting_cash": shift.starting_cash,
                }),
            },
        )
        .await?;

        tx.commit().await?;

        info!(shift_id = %shift.id, user_id = %shift.user_id, "Shift opened");
        Ok(shift)
    }

    pub async fn get(&self, principal: &Principal, shift_id: &str) -> DbResult<WorkShift> {
        let scope = authorize(principal, EntityKind::WorkShift, Operation::View)?;
        let shift = sqlx::query_as::<_, WorkShift>("SELECT * FROM work_shifts WHERE id = ?1")
            .bind(shift_id)
            .fetch_optional(&self.pool)
            .await?;

        match shift {
            Some(shift) if scope.allows_store(&shift.store_id) => Ok(shift),
            _ => Err(DbError::not_found("WorkShift", shift_id)),
        }
    }

    /// The acting user's open shift in a store.
    pub async fn current(&self, principal: &Principal, store_id: &str) -> DbResult<Option<WorkShift>> {
        authorize(principal, EntityKind::WorkShift, Operation::View)?;
        principal.ensure_store(store_id)?;

        let mut conn = self.pool.acquire().await?;
        find_open(&mut conn, &principal.user_id, store_id).await
    }

    /// Counts the drawer and closes the shift. Cashiers may only close
    /// their own shift.
    pub async fn close(&self, principal: &Principal, shift_id: &str, counted_cash: Money) -> DbResult<WorkShift> {
        authorize(principal, EntityKind::WorkShift, Operation::Change)?;
        validate_price("closing_cash", counted_cash)?;

        let shift = self.get(principal, shift_id).await?;
        if principal.role == Role::Cashier && shift.user_id != principal.user_id {
            return Err(CoreError::PermissionDenied("cannot close another user's shift".into()).into());
        }
        if !shift.is_open() {
            return Err(closed(&shift));
        }

        let mut tx = self.pool.begin().await?;

        // Status flip first: the cash sum then runs under the write lock.
        let claimed = sqlx::query("UPDATE work_shifts SET status = 'CLOSED' WHERE id = ?1 AND status = 'OPEN'")
            .bind(shift_id)
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            return Err(closed(&shift));
        }

        let end_time = Utc::now();
        let sales = cash_sales(&mut tx, &shift.user_id, &shift.store_id, shift.start_time, end_time).await?;
        let rec = reconcile_shift(shift.starting_cash, sales, counted_cash)?;

        sqlx::query(
            r#"
            UPDATE work_shifts
            SET end_time = ?2, closing_cash = ?3, expected_cash = ?4, difference = ?5
            WHERE id = ?1
            "#,
        )
        .bind(shift_id)
        .bind(end_time)
        .bind(counted_cash)
        .bind(rec.expected_cash)
        .bind(rec.difference)
        .execute(&mut *tx)
        .await?;

        record(
            &mut tx,
            Activity {
                store_id: Some(&shift.store_id),
                user_id: Some(&principal.user_id),
                action: ActivityAction::ShiftClose,
                entity_kind: EntityKind::WorkShift,
                entity_id: shift_id,
                details: serde_json::json!({
                    "cash_sales": sales,
                    "expected_cash": rec.expected_cash,
                    "closing_cash": counted_cash,
                    "difference": rec.difference,
                }),
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            shift_id = %shift_id,
            expected = %rec.expected_cash,
            difference = %rec.difference,
            "Shift closed"
        );

        Ok(WorkShift {
            status: ShiftStatus::Closed,
            end_time: Some(end_time),
            closing_cash: Some(counted_cash),
            expected_cash: Some(rec.expected_cash),
            difference: Some(rec.difference),
            ..shift
        })
    }
}

fn closed(shift: &WorkShift) -> DbError {
    CoreError::InvalidStatus {
        entity: "WorkShift",
        id: shift.id.clone(),
        status: "CLOSED".to_string(),
    }
    .into()
}
