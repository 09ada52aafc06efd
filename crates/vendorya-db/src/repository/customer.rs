//! # Customer Repository
//!
//! Per-store customers with a unique phone number and a signed running
//! balance (positive = the customer owes the store).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use vendorya_core::access::assign_store;
use vendorya_core::tenant::{Customer, NewCustomer};
use vendorya_core::validation::{validate_name, validate_phone};
use vendorya_core::{authorize, new_id, EntityKind, Money, Operation, Principal};

use crate::error::{DbError, DbResult};

/// The walk-in placeholder used by checkout: first live customer by name.
pub async fn first_customer(conn: &mut SqliteConnection, store_id: &str) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT * FROM customers
        WHERE store_id = ?1 AND is_deleted = 0
        ORDER BY name ASC, created_at ASC
        LIMIT 1
        "#,
    )
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn create(&self, principal: &Principal, input: &NewCustomer) -> DbResult<Customer> {
        authorize(principal, EntityKind::Customer, Operation::Add)?;
        let store_id = assign_store(principal, input.store_id.as_deref())?;
        validate_name("name", &input.name, 200)?;
        validate_phone(&input.phone_number)?;

        let now = Utc::now();
        let customer = Customer {
            id: new_id(),
            store_id,
            name: input.name.trim().to_string(),
            phone_number: input.phone_number.trim().to_string(),
            notes: input.notes.clone(),
            shipping_address_id: None,
            billing_address_id: None,
            balance: Money::zero(),
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        debug!(name = %customer.name, store_id = %customer.store_id, "Creating customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, store_id, name, phone_number, notes, balance, is_deleted, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.store_id)
        .bind(&customer.name)
        .bind(&customer.phone_number)
        .bind(&customer.notes)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("phone_number", &customer.phone_number),
            other => other,
        })?;

        Ok(customer)
    }

    /// Applies a signed delta to the running balance and returns the new one.
    pub async fn adjust_balance(&self, principal: &Principal, customer_id: &str, delta: Money) -> DbResult<Money> {
        let scope = authorize(principal, EntityKind::Customer, Operation::Change)?;

        let store_id: Option<String> = sqlx::query_scalar(
            "SELECT store_id FROM customers WHERE id = ?1 AND is_deleted = 0",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        match store_id {
            Some(store_id) if scope.allows_store(&store_id) => {}
            _ => return Err(DbError::not_found("Customer", customer_id)),
        }

        let balance: Money = sqlx::query_scalar(
            r#"
            UPDATE customers SET balance = balance + ?2, updated_at = ?3
            WHERE id = ?1
            RETURNING balance
            "#,
        )
        .bind(customer_id)
        .bind(delta)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        info!(customer_id = %customer_id, delta = %delta, balance = %balance, "Customer balance adjusted");
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_acme;
    use crate::{Database, DbConfig};
    use vendorya_core::tenant::Role;

    #[tokio::test]
    async fn test_phone_unique_per_store() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();

        let input = NewCustomer {
            store_id: None,
            name: "Someone".into(),
            phone_number: acme.customer.phone_number.clone(),
            notes: None,
        };
        let err = db.customers().create(&acme.cashier, &input).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "phone_number"));
    }

    #[tokio::test]
    async fn test_store_is_forced_for_staff() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();

        let input = NewCustomer {
            store_id: Some("some-other-store".into()),
            name: "Zed".into(),
            phone_number: "01234567890".into(),
            notes: None,
        };
        let c = db.customers().create(&acme.cashier, &input).await.unwrap();
        assert_eq!(c.store_id, acme.store.id);
    }

    #[tokio::test]
    async fn test_adjust_balance_signed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let id = &acme.customer.id;

        let b = db.customers().adjust_balance(&acme.cashier, id, Money::from_cents(2_500)).await.unwrap();
        assert_eq!(b.cents(), 2_500);
        let b = db.customers().adjust_balance(&acme.cashier, id, Money::from_cents(-4_000)).await.unwrap();
        assert_eq!(b.cents(), -1_500);

        let outsider = Principal::new("x", Role::Owner, Some("other".into()));
        assert!(db.customers().adjust_balance(&outsider, id, Money::from_cents(1)).await.is_err());
    }
}
