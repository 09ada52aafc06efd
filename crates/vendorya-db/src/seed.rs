//! # Demo Store Seed
//!
//! Builds one complete tenant, "Acme Market", through the repositories so
//! every row passes the same checks real traffic does. The `seed` binary
//! uses it for local development and the test suites use it as a fixture.
//!
//! ```text
//! root (SUPERUSER)
//!   └── Acme Market (allow_negative_stock = false, no default supplier)
//!         ├── owner   (OWNER)
//!         ├── cashier (CASHIER) ── open shift, 200.00 in the drawer
//!         ├── Main branch ── 1 Market St
//!         ├── Walk-in Customer
//!         └── Nile Beverages (prefix 13)
//!               └── Cola 330ml  code 13001
//!                     └── variant 13001  sell 50.00, 5 in stock
//! ```

use tracing::info;

use vendorya_core::catalog::{NewProduct, NewVariant, Product, ProductVariant, Supplier};
use vendorya_core::finance::WorkShift;
use vendorya_core::tenant::{Address, Branch, Customer, NewAddress, NewCustomer, NewStore, Role, Store, User};
use vendorya_core::{Money, Principal};

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::stock::apply_delta;

/// Units of the seeded variant on hand at the main branch.
pub const SEED_STOCK: i64 = 5;

/// Handles to everything [`seed_acme`] created.
#[derive(Debug, Clone)]
pub struct AcmeSeed {
    pub root: Principal,
    pub store: Store,
    pub owner: Principal,
    pub cashier: Principal,
    pub cashier_user: User,
    pub address: Address,
    pub branch: Branch,
    pub customer: Customer,
    pub supplier: Supplier,
    pub product: Product,
    pub variant: ProductVariant,
    pub shift: WorkShift,
}

pub async fn seed_acme(db: &Database) -> DbResult<AcmeSeed> {
    let users = db.users();

    // The first superuser has nobody to create it.
    let bootstrap = Principal::new("bootstrap", Role::Superuser, None);
    let root_user = users.create(&bootstrap, "root", None, None, Role::Superuser).await?;
    let root = Principal::from(&root_user);

    let store = db
        .stores()
        .create(
            &root,
            &NewStore {
                name: "Acme Market".into(),
                owner_id: None,
                default_language: None,
                currency_symbol: None,
                allow_negative_stock: false,
            },
        )
        .await?;

    let owner_user = users
        .create(&root, "acme-owner", Some("owner@acme.test"), Some(&store.id), Role::Owner)
        .await?;
    let owner = Principal::from(&owner_user);

    let cashier_user = users
        .create(&root, "acme-cashier", None, Some(&store.id), Role::Cashier)
        .await?;
    let cashier = Principal::from(&cashier_user);

    let address = db
        .stores()
        .create_address(
            &owner,
            None,
            &NewAddress {
                street_1: "1 Market St".into(),
                street_2: None,
                city: "Cairo".into(),
                country: None,
            },
        )
        .await?;
    let branch = db.stores().create_branch(&owner, None, "Main", &address.id, true).await?;

    let customer = db
        .customers()
        .create(
            &owner,
            &NewCustomer {
                store_id: None,
                name: "Walk-in Customer".into(),
                phone_number: "01111111111".into(),
                notes: None,
            },
        )
        .await?;

    let catalog = db.catalog();
    let supplier = catalog.create_supplier(&owner, None, "Nile Beverages", None, "13").await?;
    let product = catalog
        .create_product(
            &owner,
            &NewProduct {
                name: "Cola 330ml".into(),
                supplier_id: Some(supplier.id.clone()),
                ..Default::default()
            },
        )
        .await?;
    let variant = catalog
        .create_variant(
            &owner,
            &NewVariant {
                product_id: product.id.clone(),
                cost_price: Money::from_major_minor(30, 0),
                sell_price: Money::from_major_minor(50, 0),
                ..Default::default()
            },
        )
        .await?;

    {
        let mut conn = db.pool().acquire().await?;
        apply_delta(&mut conn, &variant.id, &branch.id, SEED_STOCK).await?;
    }

    let shift = db
        .shifts()
        .open(&cashier, &store.id, None, Money::from_major_minor(200, 0))
        .await?;

    info!(store_id = %store.id, variant_sku = %variant.sku, "Seeded Acme Market");

    Ok(AcmeSeed {
        root,
        store,
        owner,
        cashier,
        cashier_user,
        address,
        branch,
        customer,
        supplier,
        product,
        variant,
        shift,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;

    #[tokio::test]
    async fn test_seed_is_checkout_ready() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();

        assert_eq!(acme.product.code, "13001");
        assert_eq!(acme.variant.sku, "13001");
        assert!(acme.shift.is_open());
        assert_eq!(acme.shift.user_id, acme.cashier_user.id);
        assert_eq!(acme.shift.branch_id, acme.branch.id);
        assert_eq!(
            db.stock().level(&acme.owner, &acme.variant.id, &acme.branch.id).await.unwrap(),
            SEED_STOCK
        );
    }
}
