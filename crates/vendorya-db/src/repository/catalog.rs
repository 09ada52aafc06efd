//! # Catalog Repository
//!
//! Products, variants, lookup tables, custom attributes and bundles.
//!
//! ## Code / SKU Generation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_product(code: None, supplier: S)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  prefix = S.code_prefix ?? store.default_supplier.code_prefix ?? "00"   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  highest = max numeric code with that prefix (by length, then text)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  code = next_sequential_code(prefix, highest)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT ── UNIQUE(store_id, code) collision? ── regenerate once         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use vendorya_core::access::assign_store;
use vendorya_core::attributes::validate_attributes;
use vendorya_core::catalog::{
    AttributeDefinition, BundleItem, Category, NewAttributeDefinition, NewProduct, NewVariant,
    Product, ProductType, ProductVariant, SellableVariant, Supplier, Tax,
};
use vendorya_core::codes::{next_sequential_code, resolve_prefix};
use vendorya_core::validation::{
    validate_code_prefix, validate_name, validate_price, validate_quantity, validate_sku,
    validate_tax_rate_bps,
};
use vendorya_core::{authorize, new_id, AccessScope, CoreError, EntityKind, Operation, Principal, TaxRate};

use crate::error::{DbError, DbResult};

// =============================================================================
// Transaction helpers
// =============================================================================

/// A live variant of `store_id` with the product fields checkout needs.
pub async fn sellable_variant(
    conn: &mut SqliteConnection,
    store_id: &str,
    variant_id: &str,
) -> DbResult<Option<SellableVariant>> {
    let variant = sqlx::query_as::<_, SellableVariant>(
        r#"
        SELECT
            v.id AS variant_id,
            v.product_id,
            p.store_id,
            p.name AS product_name,
            p.product_type,
            v.sku,
            v.sell_price,
            COALESCE(t.rate, 0) AS tax_rate
        FROM product_variants v
        JOIN products p ON p.id = v.product_id
        LEFT JOIN taxes t ON t.id = p.tax_id
        WHERE v.id = ?1 AND p.store_id = ?2
          AND v.is_deleted = 0 AND p.is_deleted = 0
        "#,
    )
    .bind(variant_id)
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(variant)
}

/// Highest existing code `<prefix><digits>` in `table` for a store.
async fn highest_code(
    conn: &mut SqliteConnection,
    table: &'static str,
    column: &'static str,
    store_id: &str,
    prefix: &str,
) -> DbResult<Option<String>> {
    let sql = format!(
        r#"
        SELECT {column} FROM {table}
        WHERE store_id = ?1
          AND substr({column}, 1, length(?2)) = ?2
          AND length({column}) > length(?2)
          AND substr({column}, length(?2) + 1) NOT GLOB '*[^0-9]*'
        ORDER BY length({column}) DESC, {column} DESC
        LIMIT 1
        "#
    );

    let code: Option<String> = sqlx::query_scalar(&sql)
        .bind(store_id)
        .bind(prefix)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(code)
}

/// Prefix from the given supplier, else the store default supplier.
async fn code_prefix(
    conn: &mut SqliteConnection,
    store_id: &str,
    supplier_id: Option<&str>,
) -> DbResult<String> {
    let supplier_prefix: Option<String> = match supplier_id {
        Some(id) => {
            sqlx::query_scalar("SELECT code_prefix FROM suppliers WHERE id = ?1 AND store_id = ?2")
                .bind(id)
                .bind(store_id)
                .fetch_optional(&mut *conn)
                .await?
        }
        None => None,
    };

    let default_prefix: Option<String> = sqlx::query_scalar(
        r#"
        SELECT s.code_prefix FROM stores st
        JOIN suppliers s ON s.id = st.default_supplier_id
        WHERE st.id = ?1
        "#,
    )
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(resolve_prefix(supplier_prefix.as_deref(), default_prefix.as_deref()).to_string())
}

/// Fails with NotFound unless `id` is a live row of `table` in `store_id`.
async fn ensure_in_store(
    pool: &SqlitePool,
    entity: &'static str,
    table: &'static str,
    store_id: &str,
    id: &str,
) -> DbResult<()> {
    let sql = format!("SELECT 1 FROM {table} WHERE id = ?1 AND store_id = ?2 AND is_deleted = 0");
    let found: Option<i64> = sqlx::query_scalar(&sql)
        .bind(id)
        .bind(store_id)
        .fetch_optional(pool)
        .await?;
    found.map(|_| ()).ok_or_else(|| DbError::not_found(entity, id))
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Lookup tables
    // -------------------------------------------------------------------------

    pub async fn create_tax(
        &self,
        principal: &Principal,
        store_id: Option<&str>,
        name: &str,
        rate: TaxRate,
    ) -> DbResult<Tax> {
        authorize(principal, EntityKind::Tax, Operation::Add)?;
        let store_id = assign_store(principal, store_id)?;
        validate_name("name", name, 100)?;
        validate_tax_rate_bps(rate.bps())?;

        let tax = Tax {
            id: new_id(),
            store_id,
            name: name.trim().to_string(),
            rate,
            is_deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO taxes (id, store_id, name, rate, is_deleted, created_at) VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        )
        .bind(&tax.id)
        .bind(&tax.store_id)
        .bind(&tax.name)
        .bind(tax.rate)
        .bind(tax.created_at)
        .execute(&self.pool)
        .await?;

        Ok(tax)
    }

    pub async fn create_supplier(
        &self,
        principal: &Principal,
        store_id: Option<&str>,
        name: &str,
        contact_info: Option<&str>,
        code_prefix: &str,
    ) -> DbResult<Supplier> {
        authorize(principal, EntityKind::Supplier, Operation::Add)?;
        let store_id = assign_store(principal, store_id)?;
        validate_name("name", name, 200)?;
        validate_code_prefix(code_prefix)?;

        let supplier = Supplier {
            id: new_id(),
            store_id,
            name: name.trim().to_string(),
            contact_info: contact_info.map(str::to_string),
            code_prefix: code_prefix.to_string(),
            is_deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, store_id, name, contact_info, code_prefix, is_deleted, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.store_id)
        .bind(&supplier.name)
        .bind(&supplier.contact_info)
        .bind(&supplier.code_prefix)
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code_prefix", &supplier.code_prefix),
            other => other,
        })?;

        Ok(supplier)
    }

    pub async fn create_category(
        &self,
        principal: &Principal,
        store_id: Option<&str>,
        name: &str,
        parent_id: Option<&str>,
    ) -> DbResult<Category> {
        authorize(principal, EntityKind::Category, Operation::Add)?;
        let store_id = assign_store(principal, store_id)?;
        validate_name("name", name, 200)?;
        if let Some(parent) = parent_id {
            ensure_in_store(&self.pool, "Category", "categories", &store_id, parent).await?;
        }

        let category = Category {
            id: new_id(),
            store_id,
            name: name.trim().to_string(),
            parent_id: parent_id.map(str::to_string),
            is_deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO categories (id, store_id, name, parent_id, is_deleted, created_at) VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        )
        .bind(&category.id)
        .bind(&category.store_id)
        .bind(&category.name)
        .bind(&category.parent_id)
        .bind(category.created_at)
        .execute(&self.pool)
        .await?;

        Ok(category)
    }

    // -------------------------------------------------------------------------
    // Custom attributes
    // -------------------------------------------------------------------------

    pub async fn create_attribute_definition(
        &self,
        principal: &Principal,
        store_id: Option<&str>,
        input: &NewAttributeDefinition,
    ) -> DbResult<AttributeDefinition> {
        authorize(principal, EntityKind::AttributeDefinition, Operation::Add)?;
        let store_id = assign_store(principal, store_id)?;
        validate_name("name", &input.name, 100)?;
        validate_sku(&input.key)?;

        let def = AttributeDefinition {
            id: new_id(),
            store_id,
            name: input.name.trim().to_string(),
            key: input.key.trim().to_lowercase(),
            input_type: input.input_type,
            options: serde_json::to_string(&input.options).map_err(|e| DbError::Internal(e.to_string()))?,
            is_deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO attribute_definitions (id, store_id, name, key, input_type, options, is_deleted, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
            "#,
        )
        .bind(&def.id)
        .bind(&def.store_id)
        .bind(&def.name)
        .bind(&def.key)
        .bind(def.input_type)
        .bind(&def.options)
        .bind(def.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("key", &def.key),
            other => other,
        })?;

        Ok(def)
    }

    /// Validates `values` against the store's definitions, then upserts one
    /// row per (variant, definition). All or nothing.
    pub async fn set_attributes(
        &self,
        principal: &Principal,
        variant_id: &str,
        values: &BTreeMap<String, String>,
    ) -> DbResult<BTreeMap<String, String>> {
        let scope = authorize(principal, EntityKind::ProductAttribute, Operation::Change)?;
        let store_id = self.variant_store(&scope, variant_id).await?;

        let definitions = sqlx::query_as::<_, AttributeDefinition>(
            "SELECT * FROM attribute_definitions WHERE store_id = ?1 AND is_deleted = 0",
        )
        .bind(&store_id)
        .fetch_all(&self.pool)
        .await?;

        let validated = validate_attributes(&definitions, values)?;

        let mut tx = self.pool.begin().await?;
        for attr in &validated {
            sqlx::query(
                r#"
                INSERT INTO product_attributes (id, variant_id, definition_id, value)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (variant_id, definition_id) DO UPDATE SET value = excluded.value
                "#,
            )
            .bind(new_id())
            .bind(variant_id)
            .bind(&attr.definition_id)
            .bind(&attr.value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(variant_id = %variant_id, count = validated.len(), "Attributes saved");
        self.attributes(principal, variant_id).await
    }

    /// Canonical `key → value` map of a variant's custom fields.
    pub async fn attributes(&self, principal: &Principal, variant_id: &str) -> DbResult<BTreeMap<String, String>> {
        let scope = authorize(principal, EntityKind::ProductAttribute, Operation::View)?;
        self.variant_store(&scope, variant_id).await?;

        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT d.key, a.value
            FROM product_attributes a
            JOIN attribute_definitions d ON d.id = a.definition_id
            WHERE a.variant_id = ?1 AND d.is_deleted = 0
            ORDER BY d.key
            "#,
        )
        .bind(variant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Store of a live variant, if `scope` may see it.
    async fn variant_store(&self, scope: &AccessScope, variant_id: &str) -> DbResult<String> {
        let store_id: Option<String> = sqlx::query_scalar(
            "SELECT store_id FROM product_variants WHERE id = ?1 AND is_deleted = 0",
        )
        .bind(variant_id)
        .fetch_optional(&self.pool)
        .await?;

        match store_id {
            Some(store_id) if scope.allows_store(&store_id) => Ok(store_id),
            _ => Err(DbError::not_found("Variant", variant_id)),
        }
    }

    // -------------------------------------------------------------------------
    // Products & variants
    // -------------------------------------------------------------------------

    /// Creates a product, generating its code when none is given.
    pub async fn create_product(&self, principal: &Principal, input: &NewProduct) -> DbResult<Product> {
        authorize(principal, EntityKind::Product, Operation::Add)?;
        let store_id = assign_store(principal, input.store_id.as_deref())?;
        validate_name("name", &input.name, 200)?;
        validate_price("base_price", input.base_price)?;
        if let Some(code) = &input.code {
            validate_sku(code)?;
        }

        for (entity, table, id) in [
            ("Supplier", "suppliers", input.supplier_id.as_deref()),
            ("Category", "categories", input.category_id.as_deref()),
            ("Tax", "taxes", input.tax_id.as_deref()),
        ] {
            if let Some(id) = id {
                ensure_in_store(&self.pool, entity, table, &store_id, id).await?;
            }
        }

        match self.insert_product(&store_id, input).await {
            Err(e) if input.code.is_none() && e.is_retryable() => {
                warn!(store_id = %store_id, "Generated product code collided, retrying");
                self.insert_product(&store_id, input).await
            }
            other => other,
        }
    }

    async fn insert_product(&self, store_id: &str, input: &NewProduct) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;

        let code = match &input.code {
            Some(code) => code.trim().to_string(),
            None => {
                let prefix = code_prefix(&mut conn, store_id, input.supplier_id.as_deref()).await?;
                let highest = highest_code(&mut conn, "products", "code", store_id, &prefix).await?;
                next_sequential_code(&prefix, highest.as_deref())
            }
        };

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            store_id: store_id.to_string(),
            name: input.name.trim().to_string(),
            code,
            product_type: input.product_type,
            category_id: input.category_id.clone(),
            supplier_id: input.supplier_id.clone(),
            tax_id: input.tax_id.clone(),
            description: input.description.clone(),
            unit: input.unit.clone().unwrap_or_else(|| "pcs".to_string()),
            base_price: input.base_price,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, store_id, name, code, product_type, category_id, supplier_id, tax_id,
                description, unit, base_price, is_deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, ?12, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.store_id)
        .bind(&product.name)
        .bind(&product.code)
        .bind(product.product_type)
        .bind(&product.category_id)
        .bind(&product.supplier_id)
        .bind(&product.tax_id)
        .bind(&product.description)
        .bind(&product.unit)
        .bind(product.base_price)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        info!(product_id = %product.id, code = %product.code, "Product created");
        Ok(product)
    }

    /// Creates a variant, generating its SKU when none is given.
    pub async fn create_variant(&self, principal: &Principal, input: &NewVariant) -> DbResult<ProductVariant> {
        let scope = authorize(principal, EntityKind::ProductVariant, Operation::Add)?;
        validate_price("cost_price", input.cost_price)?;
        validate_price("sell_price", input.sell_price)?;
        if let Some(sku) = &input.sku {
            validate_sku(sku)?;
        }

        let owner: Option<(String, Option<String>)> = sqlx::query_as(
            "SELECT store_id, supplier_id FROM products WHERE id = ?1 AND is_deleted = 0",
        )
        .bind(&input.product_id)
        .fetch_optional(&self.pool)
        .await?;

        let (store_id, supplier_id) = match owner {
            Some((store_id, supplier_id)) if scope.allows_store(&store_id) => (store_id, supplier_id),
            _ => return Err(DbError::not_found("Product", &input.product_id)),
        };

        match self.insert_variant(&store_id, supplier_id.as_deref(), input).await {
            Err(e) if input.sku.is_none() && e.is_retryable() => {
                warn!(store_id = %store_id, "Generated SKU collided, retrying");
                self.insert_variant(&store_id, supplier_id.as_deref(), input).await
            }
            other => other,
        }
    }

    async fn insert_variant(
        &self,
        store_id: &str,
        supplier_id: Option<&str>,
        input: &NewVariant,
    ) -> DbResult<ProductVariant> {
        let mut conn = self.pool.acquire().await?;

        let sku = match &input.sku {
            Some(sku) => sku.trim().to_string(),
            None => {
                let prefix = code_prefix(&mut conn, store_id, supplier_id).await?;
                let highest = highest_code(&mut conn, "product_variants", "sku", store_id, &prefix).await?;
                next_sequential_code(&prefix, highest.as_deref())
            }
        };

        let now = Utc::now();
        let variant = ProductVariant {
            id: new_id(),
            product_id: input.product_id.clone(),
            sku,
            barcode: input.barcode.clone(),
            cost_price: input.cost_price,
            sell_price: input.sell_price,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO product_variants (
                id, product_id, store_id, sku, barcode, cost_price, sell_price,
                is_deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(store_id)
        .bind(&variant.sku)
        .bind(&variant.barcode)
        .bind(variant.cost_price)
        .bind(variant.sell_price)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        debug!(variant_id = %variant.id, sku = %variant.sku, "Variant created");
        Ok(variant)
    }

    pub async fn get_variant(&self, principal: &Principal, variant_id: &str) -> DbResult<ProductVariant> {
        let scope = authorize(principal, EntityKind::ProductVariant, Operation::View)?;
        self.variant_store(&scope, variant_id).await?;

        sqlx::query_as::<_, ProductVariant>("SELECT * FROM product_variants WHERE id = ?1")
            .bind(variant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Variant", variant_id))
    }

    pub async fn update_variant_prices(
        &self,
        principal: &Principal,
        variant_id: &str,
        cost_price: vendorya_core::Money,
        sell_price: vendorya_core::Money,
    ) -> DbResult<()> {
        let scope = authorize(principal, EntityKind::ProductVariant, Operation::Change)?;
        validate_price("cost_price", cost_price)?;
        validate_price("sell_price", sell_price)?;
        self.variant_store(&scope, variant_id).await?;

        sqlx::query("UPDATE product_variants SET cost_price = ?2, sell_price = ?3, updated_at = ?4 WHERE id = ?1")
            .bind(variant_id)
            .bind(cost_price)
            .bind(sell_price)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Bundles
    // -------------------------------------------------------------------------

    /// Adds `quantity` of a component variant to a BUNDLE product.
    pub async fn add_bundle_item(
        &self,
        principal: &Principal,
        bundle_id: &str,
        component_variant_id: &str,
        quantity: i64,
    ) -> DbResult<BundleItem> {
        let scope = authorize(principal, EntityKind::BundleItem, Operation::Add)?;
        validate_quantity(quantity)?;

        let bundle: Option<(String, ProductType)> = sqlx::query_as(
            "SELECT store_id, product_type FROM products WHERE id = ?1 AND is_deleted = 0",
        )
        .bind(bundle_id)
        .fetch_optional(&self.pool)
        .await?;

        let store_id = match bundle {
            Some((store_id, ProductType::Bundle)) if scope.allows_store(&store_id) => store_id,
            Some((store_id, other)) if scope.allows_store(&store_id) => {
                return Err(CoreError::InvalidStatus {
                    entity: "Product",
                    id: bundle_id.to_string(),
                    status: format!("{:?}", other),
                }
                .into())
            }
            _ => return Err(DbError::not_found("Product", bundle_id)),
        };

        let component = {
            let mut conn = self.pool.acquire().await?;
            sellable_variant(&mut conn, &store_id, component_variant_id).await?
        };
        match component {
            Some(c) if c.product_type == ProductType::Standard => {}
            Some(_) => {
                return Err(CoreError::InvalidStatus {
                    entity: "Variant",
                    id: component_variant_id.to_string(),
                    status: "not a STANDARD product".to_string(),
                }
                .into())
            }
            None => return Err(DbError::not_found("Variant", component_variant_id)),
        }

        let item = BundleItem {
            id: new_id(),
            bundle_id: bundle_id.to_string(),
            component_variant_id: component_variant_id.to_string(),
            quantity,
        };

        sqlx::query(
            "INSERT INTO bundle_items (id, bundle_id, component_variant_id, quantity) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&item.id)
        .bind(&item.bundle_id)
        .bind(&item.component_variant_id)
        .bind(item.quantity)
        .execute(&self.pool)
        .await?;

        Ok(item)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_acme;
    use crate::{Database, DbConfig};
    use vendorya_core::catalog::AttributeInputType;
    use vendorya_core::Money;

    fn product(name: &str) -> NewProduct {
        NewProduct {
            name: name.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_codes_follow_supplier_prefix() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let catalog = db.catalog();

        // The seeded product already took 13001
        let mut input = product("Juice");
        input.supplier_id = Some(acme.supplier.id.clone());
        let p = catalog.create_product(&acme.owner, &input).await.unwrap();
        assert_eq!(p.code, "13002");

        let v1 = catalog
            .create_variant(&acme.owner, &NewVariant { product_id: p.id.clone(), ..Default::default() })
            .await
            .unwrap();
        let v2 = catalog
            .create_variant(&acme.owner, &NewVariant { product_id: p.id.clone(), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(v1.sku, "13002");
        assert_eq!(v2.sku, "13003");
    }

    #[tokio::test]
    async fn test_code_prefix_falls_back_to_default_supplier_then_00() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let catalog = db.catalog();

        let p = catalog.create_product(&acme.owner, &product("Loose item")).await.unwrap();
        assert_eq!(p.code, "00001");

        db.stores()
            .set_default_supplier(&acme.owner, &acme.store.id, Some(&acme.supplier.id))
            .await
            .unwrap();
        let p = catalog.create_product(&acme.owner, &product("Defaulted")).await.unwrap();
        assert_eq!(p.code, "13002");
    }

    #[tokio::test]
    async fn test_non_numeric_codes_are_ignored_by_scan() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let catalog = db.catalog();

        let mut legacy = product("Legacy");
        legacy.code = Some("00-LEGACY".into());
        catalog.create_product(&acme.owner, &legacy).await.unwrap();

        let p = catalog.create_product(&acme.owner, &product("Fresh")).await.unwrap();
        assert_eq!(p.code, "00001");
    }

    #[tokio::test]
    async fn test_explicit_duplicate_code_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();

        let mut dup = product("Dup");
        dup.code = Some(acme.product.code.clone());
        let err = db.catalog().create_product(&acme.owner, &dup).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_cashier_cannot_create_products() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let err = db.catalog().create_product(&acme.cashier, &product("x")).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_set_attributes_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let catalog = db.catalog();

        catalog
            .create_attribute_definition(
                &acme.owner,
                None,
                &NewAttributeDefinition {
                    name: "Size".into(),
                    key: "size".into(),
                    input_type: AttributeInputType::Select,
                    options: vec!["S".into(), "M".into()],
                },
            )
            .await
            .unwrap();

        let mut values = BTreeMap::new();
        values.insert("size".to_string(), "M".to_string());
        let saved = catalog.set_attributes(&acme.owner, &acme.variant.id, &values).await.unwrap();
        assert_eq!(saved.get("size").map(String::as_str), Some("M"));

        values.insert("size".to_string(), "S".to_string());
        let saved = catalog.set_attributes(&acme.owner, &acme.variant.id, &values).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved["size"], "S");

        values.insert("size".to_string(), "XXL".to_string());
        assert!(catalog.set_attributes(&acme.owner, &acme.variant.id, &values).await.is_err());

        let mut unknown = BTreeMap::new();
        unknown.insert("colour".to_string(), "red".to_string());
        assert!(catalog.set_attributes(&acme.owner, &acme.variant.id, &unknown).await.is_err());
    }

    #[tokio::test]
    async fn test_bundle_accepts_only_standard_components() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let catalog = db.catalog();

        let mut input = product("Gift box");
        input.product_type = ProductType::Bundle;
        let bundle = catalog.create_product(&acme.owner, &input).await.unwrap();

        let item = catalog.add_bundle_item(&acme.owner, &bundle.id, &acme.variant.id, 2).await.unwrap();
        assert_eq!(item.quantity, 2);

        let err = catalog.add_bundle_item(&acme.owner, &acme.product.id, &acme.variant.id, 1).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_sellable_variant_includes_tax_rate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        let catalog = db.catalog();

        let vat = catalog.create_tax(&acme.owner, None, "VAT", TaxRate::from_bps(1400)).await.unwrap();
        let mut input = product("Taxed");
        input.tax_id = Some(vat.id.clone());
        let p = catalog.create_product(&acme.owner, &input).await.unwrap();
        let v = catalog
            .create_variant(
                &acme.owner,
                &NewVariant {
                    product_id: p.id.clone(),
                    sell_price: Money::from_cents(1_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let s = sellable_variant(&mut conn, &acme.store.id, &v.id).await.unwrap().unwrap();
        assert_eq!(s.tax_rate.bps(), 1400);
        assert!(sellable_variant(&mut conn, "other-store", &v.id).await.unwrap().is_none());
    }
}
