//! # Store Repository
//!
//! Tenants, their addresses and branches.
//!
//! ```text
//! create()          → stores row + invoice_sequences row (last_number = 0)
//! create_address()  → addresses row, store forced for staff
//! create_branch()   → branches row bound 1:1 to an address
//! first_branch()    → main branch first, then oldest
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use vendorya_core::access::assign_store;
use vendorya_core::tenant::{Address, Branch, NewAddress, NewStore, Store, SubscriptionPlan};
use vendorya_core::validation::validate_name;
use vendorya_core::{authorize, new_id, EntityKind, Operation, Principal};

use crate::error::{DbError, DbResult};

/// Branch used when a request does not name one.
pub async fn first_branch(conn: &mut SqliteConnection, store_id: &str) -> DbResult<Option<Branch>> {
    let branch = sqlx::query_as::<_, Branch>(
        r#"
        SELECT id, store_id, name, address_id, is_main_branch, created_at, updated_at
        FROM branches
        WHERE store_id = ?1
        ORDER BY is_main_branch DESC, created_at ASC, id ASC
        LIMIT 1
        "#,
    )
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(branch)
}

/// Loads a store, ignoring soft-deleted ones.
pub async fn find_store(conn: &mut SqliteConnection, store_id: &str) -> DbResult<Store> {
    sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = ?1 AND is_deleted = 0")
        .bind(store_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Store", store_id))
}

/// Resolves an optional branch id to a branch of `store_id`.
pub async fn resolve_branch(
    conn: &mut SqliteConnection,
    store_id: &str,
    branch_id: Option<&str>,
) -> DbResult<Branch> {
    match branch_id {
        Some(id) => sqlx::query_as::<_, Branch>(
            r#"
            SELECT id, store_id, name, address_id, is_main_branch, created_at, updated_at
            FROM branches WHERE id = ?1 AND store_id = ?2
            "#,
        )
        .bind(id)
        .bind(store_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Branch", id)),
        None => first_branch(conn, store_id).await?.ok_or_else(|| {
            vendorya_core::CoreError::NoBranch {
                store_id: store_id.to_string(),
            }
            .into()
        }),
    }
}

#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
}

impl StoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StoreRepository { pool }
    }

    /// Creates a tenant together with its invoice counter.
    pub async fn create(&self, principal: &Principal, input: &NewStore) -> DbResult<Store> {
        authorize(principal, EntityKind::Store, Operation::Add)?;
        validate_name("name", &input.name, 200)?;

        let now = Utc::now();
        let store = Store {
            id: new_id(),
            name: input.name.trim().to_string(),
            owner_id: input.owner_id.clone(),
            plan: SubscriptionPlan::Free,
            is_active: true,
            default_supplier_id: None,
            default_category_id: None,
            default_language: input.default_language.clone().unwrap_or_else(|| "en".to_string()),
            currency_symbol: input.currency_symbol.clone().unwrap_or_else(|| "EGP".to_string()),
            allow_negative_stock: input.allow_negative_stock,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        debug!(name = %store.name, "Creating store");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stores (
                id, name, owner_id, plan, is_active, default_language, currency_symbol,
                allow_negative_stock, is_deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7, 0, ?8, ?8)
            "#,
        )
        .bind(&store.id)
        .bind(&store.name)
        .bind(&store.owner_id)
        .bind(store.plan)
        .bind(&store.default_language)
        .bind(&store.currency_symbol)
        .bind(store.allow_negative_stock)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO invoice_sequences (store_id, last_number) VALUES (?1, 0)")
            .bind(&store.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(store_id = %store.id, name = %store.name, "Store created");
        Ok(store)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Store> {
        let mut conn = self.pool.acquire().await?;
        find_store(&mut conn, id).await
    }

    /// Store whose supplier prefix seeds codes when a product names none.
    pub async fn set_default_supplier(
        &self,
        principal: &Principal,
        store_id: &str,
        supplier_id: Option<&str>,
    ) -> DbResult<()> {
        authorize(principal, EntityKind::Store, Operation::Change)?;
        principal.ensure_store(store_id)?;

        let result = sqlx::query(
            r#"
            UPDATE stores SET default_supplier_id = ?2, updated_at = ?3
            WHERE id = ?1 AND is_deleted = 0
              AND (?2 IS NULL OR EXISTS (SELECT 1 FROM suppliers WHERE id = ?2 AND store_id = ?1))
            "#,
        )
        .bind(store_id)
        .bind(supplier_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Store or Supplier", store_id));
        }
        Ok(())
    }

    pub async fn set_allow_negative_stock(
        &self,
        principal: &Principal,
        store_id: &str,
        allow: bool,
    ) -> DbResult<()> {
        authorize(principal, EntityKind::Store, Operation::Change)?;
        principal.ensure_store(store_id)?;

        let result = sqlx::query(
            "UPDATE stores SET allow_negative_stock = ?2, updated_at = ?3 WHERE id = ?1 AND is_deleted = 0",
        )
        .bind(store_id)
        .bind(allow)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Store", store_id));
        }
        Ok(())
    }

    pub async fn create_address(
        &self,
        principal: &Principal,
        store_id: Option<&str>,
        input: &NewAddress,
    ) -> DbResult<Address> {
        authorize(principal, EntityKind::Address, Operation::Add)?;
        let store_id = assign_store(principal, store_id)?;
        validate_name("street_1", &input.street_1, 255)?;
        validate_name("city", &input.city, 100)?;

        let now = Utc::now();
        let address = Address {
            id: new_id(),
            store_id,
            street_1: input.street_1.trim().to_string(),
            street_2: input.street_2.clone(),
            city: input.city.trim().to_string(),
            country: input.country.clone().unwrap_or_else(|| "Egypt".to_string()),
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO addresses (id, store_id, street_1, street_2, city, country, is_deleted, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
            "#,
        )
        .bind(&address.id)
        .bind(&address.store_id)
        .bind(&address.street_1)
        .bind(&address.street_2)
        .bind(&address.city)
        .bind(&address.country)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(address)
    }

    pub async fn create_branch(
        &self,
        principal: &Principal,
        store_id: Option<&str>,
        name: &str,
        address_id: &str,
        is_main_branch: bool,
    ) -> DbResult<Branch> {
        authorize(principal, EntityKind::Branch, Operation::Add)?;
        let store_id = assign_store(principal, store_id)?;
        validate_name("name", name, 200)?;

        let owns_address: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM addresses WHERE id = ?1 AND store_id = ?2 AND is_deleted = 0",
        )
        .bind(address_id)
        .bind(&store_id)
        .fetch_optional(&self.pool)
        .await?;
        if owns_address.is_none() {
            return Err(DbError::not_found("Address", address_id));
        }

        let now = Utc::now();
        let branch = Branch {
            id: new_id(),
            store_id,
            name: name.trim().to_string(),
            address_id: address_id.to_string(),
            is_main_branch,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO branches (id, store_id, name, address_id, is_main_branch, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&branch.id)
        .bind(&branch.store_id)
        .bind(&branch.name)
        .bind(&branch.address_id)
        .bind(branch.is_main_branch)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(branch_id = %branch.id, store_id = %branch.store_id, "Branch created");
        Ok(branch)
    }

    pub async fn first_branch(&self, store_id: &str) -> DbResult<Option<Branch>> {
        let mut conn = self.pool.acquire().await?;
        first_branch(&mut conn, store_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use vendorya_core::tenant::Role;

    fn root() -> Principal {
        Principal::new("root", Role::Superuser, None)
    }

    #[tokio::test]
    async fn test_create_store_seeds_sequence() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db
            .stores()
            .create(
                &root(),
                &NewStore {
                    name: "Acme".into(),
                    owner_id: None,
                    default_language: None,
                    currency_symbol: None,
                    allow_negative_stock: true,
                },
            )
            .await
            .unwrap();

        let last: i64 = sqlx::query_scalar("SELECT last_number FROM invoice_sequences WHERE store_id = ?1")
            .bind(&store.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(last, 0);
        assert_eq!(db.stores().get_by_id(&store.id).await.unwrap().currency_symbol, "EGP");
    }

    #[tokio::test]
    async fn test_staff_cannot_create_store() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = Principal::new("o", Role::Owner, Some("s".into()));
        let err = db
            .stores()
            .create(
                &owner,
                &NewStore {
                    name: "Nope".into(),
                    owner_id: None,
                    default_language: None,
                    currency_symbol: None,
                    allow_negative_stock: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(vendorya_core::CoreError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_first_branch_prefers_main() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db
            .stores()
            .create(
                &root(),
                &NewStore {
                    name: "Acme".into(),
                    owner_id: None,
                    default_language: None,
                    currency_symbol: None,
                    allow_negative_stock: true,
                },
            )
            .await
            .unwrap();
        let addr = |street: &str| NewAddress {
            street_1: street.into(),
            street_2: None,
            city: "Cairo".into(),
            country: None,
        };
        let a1 = db.stores().create_address(&root(), Some(&store.id), &addr("1 Nile St")).await.unwrap();
        let a2 = db.stores().create_address(&root(), Some(&store.id), &addr("2 Nile St")).await.unwrap();

        db.stores().create_branch(&root(), Some(&store.id), "Annex", &a1.id, false).await.unwrap();
        let main = db.stores().create_branch(&root(), Some(&store.id), "Main", &a2.id, true).await.unwrap();

        let first = db.stores().first_branch(&store.id).await.unwrap().unwrap();
        assert_eq!(first.id, main.id);
    }
}
