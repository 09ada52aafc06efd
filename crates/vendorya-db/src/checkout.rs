//! # POS Checkout
//!
//! Turns a cart into a POSTED invoice, stock deductions and one cash
//! payment, all in a single transaction.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Preconditions (read-only, in order)                                    │
//! │    1. open shift for (user, store)   else NoOpenShift                   │
//! │    2. cart non-empty                 else EmptyCart                     │
//! │    3. a customer exists              else NoCustomer  (first by name)   │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    number  = next_invoice_number(store)      ← first statement, a write │
//! │    INSERT sales_invoices (POSTED, number)                               │
//! │    for line in cart:                                                    │
//! │        variant = sellable(store, line.id)    else NotFound              │
//! │        INSERT sales_invoice_items                                       │
//! │        deduct(stock_targets(variant, qty)) at first branch              │
//! │    recompute_totals                                                     │
//! │    cash = cash_method(store)                 ← created on first use     │
//! │    INSERT payments (grand_total, cash, user)                            │
//! │    recompute_paid                                                       │
//! │    activity_log(CHECKOUT)                                               │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error drops the transaction: nothing is persisted.                 │
//! │  A uniqueness clash or busy database is retried once, then Contention.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, instrument};

use vendorya_core::audit::ActivityAction;
use vendorya_core::finance::{CartLine, CheckoutReceipt, InvoiceStatus};
use vendorya_core::tenant::{Branch, Customer, Store};
use vendorya_core::validation::validate_cart_lines;
use vendorya_core::{authorize, new_id, CoreError, EntityKind, Operation, Principal, MAX_CART_ITEMS};

use crate::error::{retry_once, DbError, DbResult};
use crate::repository::activity::{record, Activity};
use crate::repository::catalog::sellable_variant;
use crate::repository::customer::first_customer;
use crate::repository::sales::{cash_method, insert_item, insert_payment, next_invoice_number, recompute_paid, recompute_totals};
use crate::repository::shift::find_open;
use crate::repository::stock::{deduct, stock_targets};
use crate::repository::store::{find_store, first_branch};

/// Everything checkout resolves before opening its transaction.
struct CheckoutContext {
    store: Store,
    branch: Branch,
    customer: Customer,
}

#[derive(Debug, Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
}

impl CheckoutService {
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutService { pool }
    }

    #[instrument(skip(self, principal, lines), fields(user_id = %principal.user_id, lines = lines.len()))]
    pub async fn checkout(&self, principal: &Principal, store_id: &str, lines: &[CartLine]) -> DbResult<CheckoutReceipt> {
        authorize(principal, EntityKind::SalesInvoice, Operation::Add)?;
        principal.ensure_store(store_id)?;

        let ctx = self.preconditions(principal, store_id, lines).await?;

        let receipt = retry_once("checkout", || self.checkout_once(principal, &ctx, lines)).await?;

        info!(
            store_id = %store_id,
            invoice_number = receipt.invoice_number,
            total = %receipt.grand_total,
            "Checkout committed"
        );
        Ok(receipt)
    }

    async fn preconditions(&self, principal: &Principal, store_id: &str, lines: &[CartLine]) -> DbResult<CheckoutContext> {
        let mut conn = self.pool.acquire().await?;
        let store = find_store(&mut conn, store_id).await?;

        if find_open(&mut conn, &principal.user_id, store_id).await?.is_none() {
            return Err(CoreError::NoOpenShift.into());
        }

        if lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        if lines.len() > MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS }.into());
        }

        let customer = first_customer(&mut conn, store_id).await?.ok_or(CoreError::NoCustomer)?;

        validate_cart_lines(lines)?;

        let branch = first_branch(&mut conn, store_id).await?.ok_or_else(|| CoreError::NoBranch {
            store_id: store_id.to_string(),
        })?;

        Ok(CheckoutContext { store, branch, customer })
    }

    async fn checkout_once(&self, principal: &Principal, ctx: &CheckoutContext, lines: &[CartLine]) -> DbResult<CheckoutReceipt> {
        let store_id = ctx.store.id.as_str();
        let mut tx = self.pool.begin().await?;

        let number = next_invoice_number(&mut tx, store_id).await?;
        let invoice_id = new_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO sales_invoices (
                id, store_id, branch_id, customer_id, invoice_number, status, date,
                subtotal, shipping, discount, grand_total, paid_amount, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, 0, 0, 0, ?8, ?7, ?7)
            "#,
        )
        .bind(&invoice_id)
        .bind(store_id)
        .bind(&ctx.branch.id)
        .bind(&ctx.customer.id)
        .bind(number)
        .bind(InvoiceStatus::Posted)
        .bind(now)
        .bind(&principal.user_id)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            let variant = sellable_variant(&mut tx, store_id, &line.id)
                .await?
                .ok_or_else(|| DbError::not_found("Variant", &line.id))?;

            insert_item(&mut tx, &invoice_id, &variant, line.qty).await?;

            for target in stock_targets(&mut tx, &variant, line.qty).await? {
                deduct(&mut tx, &target, &ctx.branch.id, ctx.store.allow_negative_stock).await?;
            }
        }

        let totals = recompute_totals(&mut tx, &invoice_id).await?;

        let cash = cash_method(&mut tx, store_id).await?;
        insert_payment(&mut tx, &invoice_id, &cash.id, totals.grand_total, &principal.user_id).await?;
        recompute_paid(&mut tx, &invoice_id).await?;

        record(
            &mut tx,
            Activity {
                store_id: Some(store_id),
                user_id: Some(&principal.user_id),
                action: ActivityAction::Checkout,
                entity_kind: EntityKind::SalesInvoice,
                entity_id: &invoice_id,
                details: serde_json::json!({
                    "invoice_number": number,
                    "grand_total": totals.grand_total,
                    "lines": lines.len(),
                }),
            },
        )
        .await?;

        tx.commit().await?;

        debug!(invoice_id = %invoice_id, number, "Checkout transaction committed");
        Ok(CheckoutReceipt {
            invoice_id,
            invoice_number: number,
            grand_total: totals.grand_total,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{seed_acme, AcmeSeed};
    use crate::{Database, DbConfig};
    use vendorya_core::catalog::{NewProduct, NewVariant, ProductType};
    use vendorya_core::finance::{NewPurchase, NewPurchaseItem, Payment, SalesInvoice};
    use vendorya_core::inventory::{AdjustmentReason, NewStockAdjustment};
    use vendorya_core::tenant::Role;
    use vendorya_core::Money;

    fn cart(acme: &AcmeSeed, qty: i64) -> Vec<CartLine> {
        vec![CartLine {
            id: acme.variant.id.clone(),
            qty,
        }]
    }

    async fn count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn last_number(db: &Database, store_id: &str) -> i64 {
        sqlx::query_scalar("SELECT last_number FROM invoice_sequences WHERE store_id = ?1")
            .bind(store_id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_acme_scenario() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let before = last_number(&db, &acme.store.id).await;

        let receipt = db.checkout().checkout(&acme.cashier, &acme.store.id, &cart(&acme, 2)).await.unwrap();

        assert_eq!(receipt.invoice_number, before + 1);
        assert_eq!(receipt.grand_total, Money::from_major_minor(100, 0));

        let invoice: SalesInvoice = db.sales().get(&acme.cashier, &receipt.invoice_id).await.unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Posted);
        assert_eq!(invoice.customer_id, acme.customer.id);
        assert_eq!(invoice.paid_amount, invoice.grand_total);

        assert_eq!(db.stock().level(&acme.cashier, &acme.variant.id, &acme.branch.id).await.unwrap(), 3);

        let payments: Vec<Payment> = db.sales().payments(&acme.cashier, &receipt.invoice_id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount.cents(), 10_000);
        assert_eq!(payments[0].created_by.as_deref(), Some(acme.cashier.user_id.as_str()));

        let method: String = sqlx::query_scalar("SELECT name FROM payment_methods WHERE id = ?1")
            .bind(&payments[0].method_id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(method, "Cash");

        let log = db.activity().for_entity(&acme.owner, &receipt.invoice_id).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, ActivityAction::Checkout);
    }

    #[tokio::test]
    async fn test_preconditions_in_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();

        // The owner has no shift: shift is checked before the empty cart.
        let err = db.checkout().checkout(&acme.owner, &acme.store.id, &[]).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::NoOpenShift)));

        let err = db.checkout().checkout(&acme.cashier, &acme.store.id, &[]).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::EmptyCart)));

        db.scoped()
            .soft_delete(&acme.owner, EntityKind::Customer, &acme.customer.id)
            .await
            .unwrap();
        let err = db.checkout().checkout(&acme.cashier, &acme.store.id, &cart(&acme, 1)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::NoCustomer)));

        assert_eq!(count(&db, "sales_invoices").await, 0);
    }

    #[tokio::test]
    async fn test_failed_line_rolls_back_everything() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let before = last_number(&db, &acme.store.id).await;

        let lines = vec![
            CartLine {
                id: acme.variant.id.clone(),
                qty: 2,
            },
            CartLine {
                id: "no-such-variant".into(),
                qty: 1,
            },
        ];
        let err = db.checkout().checkout(&acme.cashier, &acme.store.id, &lines).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        assert_eq!(count(&db, "sales_invoices").await, 0);
        assert_eq!(count(&db, "sales_invoice_items").await, 0);
        assert_eq!(count(&db, "payments").await, 0);
        assert_eq!(last_number(&db, &acme.store.id).await, before);
        assert_eq!(db.stock().level(&acme.cashier, &acme.variant.id, &acme.branch.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_negative_stock_policy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();

        db.stores().set_allow_negative_stock(&acme.owner, &acme.store.id, false).await.unwrap();
        let err = db.checkout().checkout(&acme.cashier, &acme.store.id, &cart(&acme, 6)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { available: 5, requested: 6, .. })));
        assert_eq!(count(&db, "sales_invoices").await, 0);

        db.stores().set_allow_negative_stock(&acme.owner, &acme.store.id, true).await.unwrap();
        db.checkout().checkout(&acme.cashier, &acme.store.id, &cart(&acme, 6)).await.unwrap();
        assert_eq!(db.stock().level(&acme.cashier, &acme.variant.id, &acme.branch.id).await.unwrap(), -1);
    }

    #[tokio::test]
    async fn test_oversized_prices_never_reach_a_payment() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let huge = Money::from_cents(i64::MAX / 2 + 1);

        let err = db
            .catalog()
            .create_variant(
                &acme.owner,
                &NewVariant {
                    product_id: acme.product.id.clone(),
                    sell_price: huge,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

        // A price written around the catalog checks still cannot overflow
        sqlx::query("UPDATE product_variants SET sell_price = ?2 WHERE id = ?1")
            .bind(&acme.variant.id)
            .bind(huge)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.checkout().checkout(&acme.cashier, &acme.store.id, &cart(&acme, 2)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(vendorya_core::ValidationError::AmountTooLarge { .. }))
        ));
        assert_eq!(count(&db, "sales_invoices").await, 0);
        assert_eq!(count(&db, "payments").await, 0);
        assert_eq!(db.stock().level(&acme.cashier, &acme.variant.id, &acme.branch.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_service_and_bundle_lines() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let catalog = db.catalog();

        let service = catalog
            .create_product(
                &acme.owner,
                &NewProduct {
                    name: "Gift wrapping".into(),
                    product_type: ProductType::Service,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let wrap = catalog
            .create_variant(
                &acme.owner,
                &NewVariant {
                    product_id: service.id.clone(),
                    sell_price: Money::from_cents(1_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let bundle = catalog
            .create_product(
                &acme.owner,
                &NewProduct {
                    name: "Twin pack".into(),
                    product_type: ProductType::Bundle,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let pack = catalog
            .create_variant(
                &acme.owner,
                &NewVariant {
                    product_id: bundle.id.clone(),
                    sell_price: Money::from_cents(9_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        catalog.add_bundle_item(&acme.owner, &bundle.id, &acme.variant.id, 2).await.unwrap();

        let lines = vec![
            CartLine { id: wrap.id.clone(), qty: 3 },
            CartLine { id: pack.id.clone(), qty: 1 },
        ];
        let receipt = db.checkout().checkout(&acme.cashier, &acme.store.id, &lines).await.unwrap();
        assert_eq!(receipt.grand_total.cents(), 12_000);

        let stock = db.stock();
        assert_eq!(stock.level(&acme.cashier, &acme.variant.id, &acme.branch.id).await.unwrap(), 3);
        assert_eq!(stock.level(&acme.cashier, &wrap.id, &acme.branch.id).await.unwrap(), 0);
        assert_eq!(stock.level(&acme.cashier, &pack.id, &acme.branch.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ledger_sums_every_path() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let before = db.stock().level(&acme.owner, &acme.variant.id, &acme.branch.id).await.unwrap();

        let po = db
            .purchases()
            .create_draft(
                &acme.owner,
                &acme.store.id,
                &NewPurchase {
                    branch_id: acme.branch.id.clone(),
                    supplier_id: acme.supplier.id.clone(),
                    reference: None,
                    items: vec![NewPurchaseItem {
                        variant_id: acme.variant.id.clone(),
                        quantity: 10,
                        unit_cost: Money::from_cents(3_000),
                    }],
                },
            )
            .await
            .unwrap();
        db.purchases().receive(&acme.owner, &po.id).await.unwrap();

        db.checkout().checkout(&acme.cashier, &acme.store.id, &cart(&acme, 3)).await.unwrap();

        db.stock()
            .adjust(
                &acme.owner,
                &NewStockAdjustment {
                    variant_id: acme.variant.id.clone(),
                    branch_id: acme.branch.id.clone(),
                    quantity_change: -1,
                    reason: AdjustmentReason::Theft,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let after = db.stock().level(&acme.owner, &acme.variant.id, &acme.branch.id).await.unwrap();
        assert_eq!(after, before + 6);
    }

    #[tokio::test]
    async fn test_outsider_cannot_checkout_into_store() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();

        let outsider = Principal::new(acme.cashier.user_id.clone(), Role::Cashier, Some("elsewhere".into()));
        let err = db.checkout().checkout(&outsider, &acme.store.id, &cart(&acme, 1)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::PermissionDenied(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_get_unique_increasing_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("pos.db"))
            .max_connections(5)
            .busy_timeout(std::time::Duration::from_secs(30));
        let db = Database::new(config).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let before = last_number(&db, &acme.store.id).await;

        let mut handles = Vec::new();
        for _ in 0..5 {
            let db = db.clone();
            let cashier = acme.cashier.clone();
            let store_id = acme.store.id.clone();
            let lines = cart(&acme, 1);
            handles.push(tokio::spawn(async move {
                db.checkout().checkout(&cashier, &store_id, &lines).await
            }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().invoice_number);
        }
        numbers.sort_unstable();

        let expected: Vec<i64> = (before + 1..=before + 5).collect();
        assert_eq!(numbers, expected);
        assert_eq!(db.stock().level(&acme.cashier, &acme.variant.id, &acme.branch.id).await.unwrap(), 0);
    }
}
