//! # Stock Ledger
//!
//! `stock_levels` is a running balance keyed by (variant, branch). Every
//! mutation path goes through [`apply_delta`], a single get-or-create-then-
//! adjust upsert, so the level always equals the sum of applied deltas.
//!
//! ```text
//!   StockTarget list  ◄── stock_targets(variant, qty)
//!     STANDARD → [(variant, qty)]
//!     SERVICE  → []
//!     BUNDLE   → [(component, component_qty × qty), ...]
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use vendorya_core::audit::ActivityAction;
use vendorya_core::catalog::{ProductType, SellableVariant};
use vendorya_core::inventory::{NewStockAdjustment, StockAdjustment, StockLevel};
use vendorya_core::validation::validate_quantity_change;
use vendorya_core::{authorize, new_id, CoreError, EntityKind, Operation, Principal};

use crate::error::{DbError, DbResult};
use crate::repository::activity::{record, Activity};
use crate::scope::push_scope;

/// One (variant, quantity) the ledger should move for a sold or received line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockTarget {
    pub variant_id: String,
    pub sku: String,
    pub quantity: i64,
}

/// Expands a line of `quantity` units into the variants whose stock moves.
pub async fn stock_targets(
    conn: &mut SqliteConnection,
    variant: &SellableVariant,
    quantity: i64,
) -> DbResult<Vec<StockTarget>> {
    match variant.product_type {
        ProductType::Standard => Ok(vec![StockTarget {
            variant_id: variant.variant_id.clone(),
            sku: variant.sku.clone(),
            quantity,
        }]),
        ProductType::Service => Ok(Vec::new()),
        ProductType::Bundle => {
            let components: Vec<(String, String, i64)> = sqlx::query_as(
                r#"
                SELECT b.component_variant_id, v.sku, b.quantity
                FROM bundle_items b
                JOIN product_variants v ON v.id = b.component_variant_id
                WHERE b.bundle_id = ?1
                ORDER BY v.sku
                "#,
            )
            .bind(&variant.product_id)
            .fetch_all(&mut *conn)
            .await?;

            Ok(components
                .into_iter()
                .map(|(variant_id, sku, per_bundle)| StockTarget {
                    variant_id,
                    sku,
                    quantity: per_bundle * quantity,
                })
                .collect())
        }
    }
}

/// Adds a signed delta to the (variant, branch) level, creating it at zero
/// first if missing. Returns the new quantity.
pub async fn apply_delta(
    conn: &mut SqliteConnection,
    variant_id: &str,
    branch_id: &str,
    delta: i64,
) -> DbResult<i64> {
    let quantity: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO stock_levels (id, variant_id, branch_id, quantity, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT (variant_id, branch_id) DO UPDATE SET
            quantity = quantity + excluded.quantity,
            updated_at = excluded.updated_at
        RETURNING quantity
        "#,
    )
    .bind(new_id())
    .bind(variant_id)
    .bind(branch_id)
    .bind(delta)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    debug!(variant_id = %variant_id, branch_id = %branch_id, delta, quantity, "Stock moved");
    Ok(quantity)
}

/// Current level, zero when no row exists yet.
pub async fn current_level(conn: &mut SqliteConnection, variant_id: &str, branch_id: &str) -> DbResult<i64> {
    let quantity: Option<i64> = sqlx::query_scalar(
        "SELECT quantity FROM stock_levels WHERE variant_id = ?1 AND branch_id = ?2",
    )
    .bind(variant_id)
    .bind(branch_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(quantity.unwrap_or(0))
}

/// Removes `target.quantity` units, refusing to go below zero unless the
/// store allows negative stock.
pub async fn deduct(
    conn: &mut SqliteConnection,
    target: &StockTarget,
    branch_id: &str,
    allow_negative: bool,
) -> DbResult<i64> {
    if !allow_negative {
        let available = current_level(conn, &target.variant_id, branch_id).await?;
        if available < target.quantity {
            return Err(CoreError::InsufficientStock {
                sku: target.sku.clone(),
                available,
                requested: target.quantity,
            }
            .into());
        }
    }

    apply_delta(conn, &target.variant_id, branch_id, -target.quantity).await
}

#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Level of one variant at one branch.
    pub async fn level(&self, principal: &Principal, variant_id: &str, branch_id: &str) -> DbResult<i64> {
        let scope = authorize(principal, EntityKind::StockLevel, Operation::View)?;

        let branch_store: Option<String> = sqlx::query_scalar("SELECT store_id FROM branches WHERE id = ?1")
            .bind(branch_id)
            .fetch_optional(&self.pool)
            .await?;
        match branch_store {
            Some(store_id) if scope.allows_store(&store_id) => {}
            _ => return Err(DbError::not_found("Branch", branch_id)),
        }

        let mut conn = self.pool.acquire().await?;
        current_level(&mut conn, variant_id, branch_id).await
    }

    /// Every branch level of a variant visible to `principal`.
    pub async fn levels(&self, principal: &Principal, variant_id: &str) -> DbResult<Vec<StockLevel>> {
        let scope = authorize(principal, EntityKind::StockLevel, Operation::View)?;

        let mut qb = sqlx::QueryBuilder::new("SELECT t.* FROM stock_levels t WHERE t.variant_id = ");
        qb.push_bind(variant_id.to_string());
        push_scope(&mut qb, EntityKind::StockLevel, "t", &scope, true);
        qb.push(" ORDER BY t.branch_id");

        Ok(qb.build_query_as::<StockLevel>().fetch_all(&self.pool).await?)
    }

    /// Records a manual adjustment and moves the ledger in one transaction.
    pub async fn adjust(&self, principal: &Principal, input: &NewStockAdjustment) -> DbResult<StockAdjustment> {
        let scope = authorize(principal, EntityKind::StockAdjustment, Operation::Add)?;
        validate_quantity_change(input.quantity_change)?;

        let owner: Option<(String, String)> = sqlx::query_as(
            r#"
            SELECT v.store_id, b.store_id
            FROM product_variants v, branches b
            WHERE v.id = ?1 AND b.id = ?2 AND v.is_deleted = 0
            "#,
        )
        .bind(&input.variant_id)
        .bind(&input.branch_id)
        .fetch_optional(&self.pool)
        .await?;

        let store_id = match owner {
            Some((variant_store, branch_store)) if variant_store == branch_store && scope.allows_store(&branch_store) => {
                branch_store
            }
            _ => return Err(DbError::not_found("Variant or Branch", &input.variant_id)),
        };

        let adjustment = StockAdjustment {
            id: new_id(),
            variant_id: input.variant_id.clone(),
            branch_id: input.branch_id.clone(),
            quantity_change: input.quantity_change,
            reason: input.reason,
            notes: input.notes.clone(),
            created_by: Some(principal.user_id.clone()),
            created_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stock_adjustments (id, variant_id, branch_id, quantity_change, reason, notes, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&adjustment.id)
        .bind(&adjustment.variant_id)
        .bind(&adjustment.branch_id)
        .bind(adjustment.quantity_change)
        .bind(adjustment.reason)
        .bind(&adjustment.notes)
        .bind(&adjustment.created_by)
        .bind(adjustment.created_at)
        .execute(&mut *tx)
        .await?;

        let quantity = apply_delta(&mut tx, &adjustment.variant_id, &adjustment.branch_id, adjustment.quantity_change).await?;

        record(
            &mut tx,
            Activity {
                store_id: Some(&store_id),
                user_id: Some(&principal.user_id),
                action: ActivityAction::StockAdjust,
                entity_kind: EntityKind::StockAdjustment,
                entity_id: &adjustment.id,
                details: serde_json::json!({
                    "variant_id": adjustment.variant_id,
                    "branch_id": adjustment.branch_id,
                    "quantity_change": adjustment.quantity_change,
                    "reason": adjustment.reason,
                    "quantity_after": quantity,
                }),
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            adjustment_id = %adjustment.id,
            delta = adjustment.quantity_change,
            quantity,
            "Stock adjusted"
        );
        Ok(adjustment)
    }
}
