//! # Search Repository
//!
//! ## Global Search
//! ```text
//! q (≥ 3 chars) ──► Products   name / code     ─┐
//!                   Suppliers  name             ├─► 5 hits each {name, url}
//!                   Categories name             │   (empty when the role
//!                   Customers  name / phone    ─┘    cannot view the kind)
//! ```
//!
//! Products are labelled `name (code)`, customers `name (phone)`. Shorter
//! queries return empty results rather than an error.
//!
//! ## POS Variant Search
//! Up to 10 variants by product name, SKU or barcode, with stock at the
//! store's first branch.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use vendorya_core::validation::validate_search_query;
use vendorya_core::{authorize, EntityKind, Money, Operation, Principal, GLOBAL_SEARCH_LIMIT, VARIANT_SEARCH_LIMIT};

use crate::error::DbResult;
use crate::repository::store::first_branch;

/// One navigable search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SearchHit {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(rename = "Products")]
    pub products: Vec<SearchHit>,
    #[serde(rename = "Suppliers")]
    pub suppliers: Vec<SearchHit>,
    #[serde(rename = "Categories")]
    pub categories: Vec<SearchHit>,
    #[serde(rename = "Customers")]
    pub customers: Vec<SearchHit>,
}

/// A POS search row. `price` goes over the wire in major units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantHit {
    pub id: String,
    pub name: String,
    #[serde(with = "vendorya_core::money::major_units")]
    pub price: Money,
    pub stock: i64,
}

/// Where one global-search group comes from.
#[derive(Clone, Copy)]
struct HitSource {
    kind: EntityKind,
    url_segment: &'static str,
    label: &'static str,
    matches: &'static str,
}

const PRODUCT_HITS: HitSource = HitSource {
    kind: EntityKind::Product,
    url_segment: "products",
    label: "t.name || ' (' || t.code || ')'",
    matches: "t.name LIKE ?2 ESCAPE '\\' OR t.code LIKE ?2 ESCAPE '\\'",
};

const SUPPLIER_HITS: HitSource = HitSource {
    kind: EntityKind::Supplier,
    url_segment: "suppliers",
    label: "t.name",
    matches: "t.name LIKE ?2 ESCAPE '\\'",
};

const CATEGORY_HITS: HitSource = HitSource {
    kind: EntityKind::Category,
    url_segment: "categories",
    label: "t.name",
    matches: "t.name LIKE ?2 ESCAPE '\\'",
};

const CUSTOMER_HITS: HitSource = HitSource {
    kind: EntityKind::Customer,
    url_segment: "customers",
    label: "t.name || ' (' || t.phone_number || ')'",
    matches: "t.name LIKE ?2 ESCAPE '\\' OR t.phone_number LIKE ?2 ESCAPE '\\'",
};

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: String,
    product_name: String,
    sku: String,
    sell_price: Money,
    stock: i64,
}

/// `%q%` with LIKE wildcards in `q` escaped by `\`.
pub fn like_pattern(q: &str) -> String {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[derive(Debug, Clone)]
pub struct SearchRepository {
    pool: SqlitePool,
}

impl SearchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SearchRepository { pool }
    }

    pub async fn global(&self, principal: &Principal, store_id: &str, q: &str) -> DbResult<SearchResults> {
        principal.ensure_store(store_id)?;
        let Some(q) = validate_search_query(q)? else {
            return Ok(SearchResults::default());
        };
        let pattern = like_pattern(&q);

        let results = SearchResults {
            products: self.hits(principal, &PRODUCT_HITS, store_id, &pattern).await?,
            suppliers: self.hits(principal, &SUPPLIER_HITS, store_id, &pattern).await?,
            categories: self.hits(principal, &CATEGORY_HITS, store_id, &pattern).await?,
            customers: self.hits(principal, &CUSTOMER_HITS, store_id, &pattern).await?,
        };

        debug!(
            store_id = %store_id,
            products = results.products.len(),
            suppliers = results.suppliers.len(),
            categories = results.categories.len(),
            customers = results.customers.len(),
            "Global search"
        );
        Ok(results)
    }

    /// Hits for one entity kind; empty when the role may not view it.
    async fn hits(
        &self,
        principal: &Principal,
        source: &HitSource,
        store_id: &str,
        pattern: &str,
    ) -> DbResult<Vec<SearchHit>> {
        let HitSource {
            kind,
            url_segment,
            label,
            matches,
        } = *source;
        if authorize(principal, kind, Operation::View).is_err() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {label} AS name, '/{url_segment}/' || t.id AS url
            FROM {table} t
            WHERE t.store_id = ?1 AND t.is_deleted = 0 AND ({matches})
            ORDER BY t.name
            LIMIT ?3
            "#,
            table = kind.table(),
        );

        let hits = sqlx::query_as::<_, SearchHit>(&sql)
            .bind(store_id)
            .bind(pattern)
            .bind(GLOBAL_SEARCH_LIMIT)
            .fetch_all(&self.pool)
            .await?;
        Ok(hits)
    }

    /// POS lookup by product name, SKU or barcode.
    pub async fn variants(&self, principal: &Principal, store_id: &str, q: &str) -> DbResult<Vec<VariantHit>> {
        authorize(principal, EntityKind::ProductVariant, Operation::View)?;
        principal.ensure_store(store_id)?;
        let Some(q) = validate_search_query(q)? else {
            return Ok(Vec::new());
        };

        let branch = {
            let mut conn = self.pool.acquire().await?;
            first_branch(&mut conn, store_id).await?
        };

        let rows = sqlx::query_as::<_, VariantRow>(
            r#"
            SELECT
                v.id,
                p.name AS product_name,
                v.sku,
                v.sell_price,
                COALESCE(s.quantity, 0) AS stock
            FROM product_variants v
            JOIN products p ON p.id = v.product_id
            LEFT JOIN stock_levels s ON s.variant_id = v.id AND s.branch_id = ?2
            WHERE p.store_id = ?1
              AND v.is_deleted = 0 AND p.is_deleted = 0
              AND (p.name LIKE ?3 ESCAPE '\' OR v.sku LIKE ?3 ESCAPE '\' OR v.barcode LIKE ?3 ESCAPE '\')
            ORDER BY p.name, v.sku
            LIMIT ?4
            "#,
        )
        .bind(store_id)
        .bind(branch.map(|b| b.id))
        .bind(like_pattern(&q))
        .bind(VARIANT_SEARCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| VariantHit {
                id: r.id,
                name: format!("{} ({})", r.product_name, r.sku),
                price: r.sell_price,
                stock: r.stock,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_acme;
    use crate::{Database, DbConfig, DbError};
    use vendorya_core::tenant::{NewCustomer, Role};
    use vendorya_core::CoreError;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("abc"), "%abc%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[tokio::test]
    async fn test_global_search_groups_and_limits() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();

        for i in 0..7 {
            db.customers()
                .create(
                    &acme.owner,
                    &NewCustomer {
                        store_id: None,
                        name: format!("Colin {}", i),
                        phone_number: format!("0100000000{}", i),
                        notes: None,
                    },
                )
                .await
                .unwrap();
        }

        let results = db.search().global(&acme.owner, &acme.store.id, "col").await.unwrap();
        assert_eq!(results.customers.len(), 5);
        assert!(results.customers[0].url.starts_with("/customers/"));
        assert_eq!(results.customers[0].name, "Colin 0 (01000000000)");
        assert_eq!(results.products.len(), 1);
        assert_eq!(results.products[0].url, format!("/products/{}", acme.product.id));
        assert_eq!(results.products[0].name, format!("{} ({})", acme.product.name, acme.product.code));

        let json = serde_json::to_value(&results).unwrap();
        assert!(json.get("Products").is_some());
        assert!(json.get("Customers").is_some());
    }

    #[tokio::test]
    async fn test_cashier_gets_empty_groups_for_hidden_kinds() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();

        let results = db.search().global(&acme.cashier, &acme.store.id, "acme").await.unwrap();
        assert!(results.suppliers.is_empty());
        assert!(results.categories.is_empty());
    }

    #[tokio::test]
    async fn test_short_query_is_empty_and_foreign_store_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();

        let results = db.search().global(&acme.owner, &acme.store.id, "co").await.unwrap();
        assert!(results.products.is_empty());
        assert!(results.customers.is_empty());
        assert!(db.search().variants(&acme.cashier, &acme.store.id, " c ").await.unwrap().is_empty());

        let err = db.search().global(&acme.owner, &acme.store.id, &"c".repeat(101)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

        let outsider = Principal::new("x", Role::Owner, Some("elsewhere".into()));
        let err = db.search().global(&outsider, &acme.store.id, "cola").await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_variant_search_reports_first_branch_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();

        let hits = db.search().variants(&acme.cashier, &acme.store.id, "col").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, acme.variant.id);
        assert_eq!(hits[0].stock, 5);
        assert_eq!(hits[0].price.cents(), 5_000);
        assert_eq!(serde_json::to_value(&hits[0]).unwrap()["price"], 50.0);
        assert_eq!(hits[0].name, format!("{} ({})", acme.product.name, acme.variant.sku));

        let by_sku = db.search().variants(&acme.cashier, &acme.store.id, &acme.variant.sku).await.unwrap();
        assert_eq!(by_sku.len(), 1);
    }
}
