//! # Tenant-Scoped Generic Access
//!
//! List / get / delete / restore for any [`EntityKind`], with the tenant
//! predicate from [`crate::scope`] applied uniformly.
//!
//! ```text
//! soft_delete(kind, id)  → is_deleted = 1, deleted_at = now   (reversible)
//! restore(kind, id)      → is_deleted = 0, deleted_at = NULL
//! hard_delete(kind, id)  → DELETE; RESTRICT foreign keys surface as
//!                          ProtectedReference, verbatim
//! ```

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use vendorya_core::audit::ActivityAction;
use vendorya_core::{authorize, AccessScope, CoreError, EntityKind, Operation, Principal};

use crate::error::{DbError, DbResult};
use crate::repository::activity::{record, Activity};
use crate::scope::{push_scope, store_expr};

#[derive(Debug, Clone)]
pub struct ScopedRepository {
    pool: SqlitePool,
}

impl ScopedRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ScopedRepository { pool }
    }

    /// Rows of `kind` visible to `principal`, oldest first.
    ///
    /// `include_deleted` only has an effect for superusers.
    pub async fn list<T>(
        &self,
        principal: &Principal,
        kind: EntityKind,
        include_deleted: bool,
        limit: i64,
    ) -> DbResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut scope = authorize(principal, kind, Operation::View)?;
        if include_deleted {
            scope = scope.including_deleted();
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT t.* FROM {} t WHERE 1 = 1", kind.table()));
        push_scope(&mut qb, kind, "t", &scope, scope.hides_deleted());
        qb.push(" ORDER BY t.rowid LIMIT ");
        qb.push_bind(limit);

        Ok(qb.build_query_as::<T>().fetch_all(&self.pool).await?)
    }

    pub async fn get<T>(&self, principal: &Principal, kind: EntityKind, id: &str) -> DbResult<T>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let scope = authorize(principal, kind, Operation::View)?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT t.* FROM {} t WHERE t.id = ", kind.table()));
        qb.push_bind(id.to_string());
        push_scope(&mut qb, kind, "t", &scope, scope.hides_deleted());

        qb.build_query_as::<T>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(kind.to_string(), id))
    }

    /// Owning store of a row the scope can reach. NotFound otherwise.
    async fn resolve(
        &self,
        kind: EntityKind,
        id: &str,
        scope: &AccessScope,
        hide_deleted: bool,
    ) -> DbResult<Option<String>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM {} t WHERE t.id = ",
            store_expr(kind, "t"),
            kind.table()
        ));
        qb.push_bind(id.to_string());
        push_scope(&mut qb, kind, "t", scope, hide_deleted);

        qb.build_query_scalar::<Option<String>>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(kind.to_string(), id))
    }

    pub async fn soft_delete(&self, principal: &Principal, kind: EntityKind, id: &str) -> DbResult<()> {
        self.set_deleted(principal, kind, id, true).await
    }

    pub async fn restore(&self, principal: &Principal, kind: EntityKind, id: &str) -> DbResult<()> {
        self.set_deleted(principal, kind, id, false).await
    }

    async fn set_deleted(&self, principal: &Principal, kind: EntityKind, id: &str, deleted: bool) -> DbResult<()> {
        let scope = authorize(principal, kind, Operation::Delete)?;
        if !kind.is_soft_deletable() {
            return Err(CoreError::PermissionDenied(format!("{} cannot be soft-deleted", kind)).into());
        }

        // Restore must reach rows that are currently hidden.
        let store_id = self.resolve(kind, id, &scope, deleted).await?;

        let mut tx = self.pool.begin().await?;

        let sql = if deleted {
            format!("UPDATE {} SET is_deleted = 1, deleted_at = ?2 WHERE id = ?1", kind.table())
        } else {
            format!("UPDATE {} SET is_deleted = 0, deleted_at = NULL WHERE id = ?1", kind.table())
        };
        let mut query = sqlx::query(&sql).bind(id);
        if deleted {
            query = query.bind(Utc::now());
        }
        query.execute(&mut *tx).await?;

        record(
            &mut tx,
            Activity {
                store_id: store_id.as_deref(),
                user_id: Some(&principal.user_id),
                action: if deleted { ActivityAction::Delete } else { ActivityAction::Restore },
                entity_kind: kind,
                entity_id: id,
                details: serde_json::json!({ "soft": true }),
            },
        )
        .await?;

        tx.commit().await?;

        info!(kind = %kind, id = %id, deleted, "Soft delete flag changed");
        Ok(())
    }

    /// Removes the row for good. Protected references abort the delete.
    pub async fn hard_delete(&self, principal: &Principal, kind: EntityKind, id: &str) -> DbResult<()> {
        let scope = authorize(principal, kind, Operation::Delete)?;
        let store_id = self.resolve(kind, id, &scope, false).await?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DELETE FROM {} WHERE id = ?1", kind.table()))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { message } => DbError::ProtectedReference {
                    entity: kind.to_string(),
                    id: id.to_string(),
                    message,
                },
                other => other,
            })?;

        record(
            &mut tx,
            Activity {
                store_id: store_id.as_deref(),
                user_id: Some(&principal.user_id),
                action: ActivityAction::Delete,
                entity_kind: kind,
                entity_id: id,
                details: serde_json::json!({ "soft": false }),
            },
        )
        .await?;

        tx.commit().await?;

        info!(kind = %kind, id = %id, "Row deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_acme;
    use crate::{Database, DbConfig};
    use vendorya_core::catalog::{NewProduct, NewVariant, Product, ProductVariant};
    use vendorya_core::inventory::StockLevel;
    use vendorya_core::tenant::{Address, NewAddress, NewStore, Role};

    #[tokio::test]
    async fn test_address_soft_delete_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let scoped = db.scoped();

        let spare = db
            .stores()
            .create_address(
                &acme.owner,
                None,
                &NewAddress {
                    street_1: "9 Spare Rd".into(),
                    street_2: None,
                    city: "Giza".into(),
                    country: None,
                },
            )
            .await
            .unwrap();

        scoped.soft_delete(&acme.owner, EntityKind::Address, &spare.id).await.unwrap();
        let visible: Vec<Address> = scoped.list(&acme.owner, EntityKind::Address, false, 100).await.unwrap();
        assert!(visible.iter().all(|a| a.id != spare.id));
        assert!(scoped.get::<Address>(&acme.owner, EntityKind::Address, &spare.id).await.is_err());

        scoped.restore(&acme.owner, EntityKind::Address, &spare.id).await.unwrap();
        let back: Address = scoped.get(&acme.owner, EntityKind::Address, &spare.id).await.unwrap();
        assert!(!back.is_deleted);
        assert!(back.deleted_at.is_none());

        let log = db.activity().for_entity(&acme.owner, &spare.id).await.unwrap();
        let actions: Vec<_> = log.iter().map(|l| l.action).collect();
        assert_eq!(actions, vec![ActivityAction::Delete, ActivityAction::Restore]);
    }

    #[tokio::test]
    async fn test_superuser_can_opt_into_deleted_rows() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let scoped = db.scoped();

        scoped.soft_delete(&acme.owner, EntityKind::Customer, &acme.customer.id).await.unwrap();

        let hidden: Vec<vendorya_core::tenant::Customer> =
            scoped.list(&acme.root, EntityKind::Customer, false, 100).await.unwrap();
        assert!(hidden.is_empty());
        let all: Vec<vendorya_core::tenant::Customer> =
            scoped.list(&acme.root, EntityKind::Customer, true, 100).await.unwrap();
        assert_eq!(all.len(), 1);

        // No effect for staff
        let staff: Vec<vendorya_core::tenant::Customer> =
            scoped.list(&acme.owner, EntityKind::Customer, true, 100).await.unwrap();
        assert!(staff.is_empty());
    }

    #[tokio::test]
    async fn test_referenced_address_is_protected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();

        let err = db
            .scoped()
            .hard_delete(&acme.owner, EntityKind::Address, &acme.address.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ProtectedReference { .. }));

        // Soft delete is never blocked
        db.scoped().soft_delete(&acme.owner, EntityKind::Address, &acme.address.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_tenant_isolation_across_relation_shapes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let scoped = db.scoped();

        // A second tenant with its own product, variant and stock
        let globex = db
            .stores()
            .create(
                &acme.root,
                &NewStore {
                    name: "Globex".into(),
                    owner_id: None,
                    default_language: None,
                    currency_symbol: None,
                    allow_negative_stock: true,
                },
            )
            .await
            .unwrap();
        let addr = db
            .stores()
            .create_address(
                &acme.root,
                Some(&globex.id),
                &NewAddress {
                    street_1: "1 Elm St".into(),
                    street_2: None,
                    city: "Alexandria".into(),
                    country: None,
                },
            )
            .await
            .unwrap();
        let branch = db
            .stores()
            .create_branch(&acme.root, Some(&globex.id), "HQ", &addr.id, true)
            .await
            .unwrap();
        let product = db
            .catalog()
            .create_product(
                &acme.root,
                &NewProduct {
                    store_id: Some(globex.id.clone()),
                    name: "Widget".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let variant = db
            .catalog()
            .create_variant(&acme.root, &NewVariant { product_id: product.id.clone(), ..Default::default() })
            .await
            .unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        crate::repository::stock::apply_delta(&mut conn, &variant.id, &branch.id, 4).await.unwrap();
        drop(conn);

        for principal in [&acme.owner, &acme.cashier] {
            let products: Vec<Product> = scoped.list(principal, EntityKind::Product, false, 100).await.unwrap();
            assert!(!products.is_empty());
            assert!(products.iter().all(|p| p.store_id == acme.store.id));

            let variants: Vec<ProductVariant> =
                scoped.list(principal, EntityKind::ProductVariant, false, 100).await.unwrap();
            assert!(!variants.is_empty());
            assert!(variants.iter().all(|v| v.id != variant.id));

            let levels: Vec<StockLevel> = scoped.list(principal, EntityKind::StockLevel, false, 100).await.unwrap();
            assert!(!levels.is_empty());
            assert!(levels.iter().all(|l| l.branch_id == acme.branch.id));

            assert!(scoped
                .get::<Product>(principal, EntityKind::Product, &product.id)
                .await
                .is_err());
        }

        // Staff without a store see nothing at all
        let orphan = Principal::new("orphan", Role::Manager, None);
        let none: Vec<Product> = scoped.list(&orphan, EntityKind::Product, false, 100).await.unwrap();
        assert!(none.is_empty());

        let everything: Vec<Product> = scoped.list(&acme.root, EntityKind::Product, false, 100).await.unwrap();
        assert_eq!(everything.len(), 2);
    }
}
