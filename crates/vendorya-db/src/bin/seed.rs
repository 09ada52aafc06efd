//! # Demo Data Generator
//!
//! Creates the Acme Market tenant plus a small beverage catalog.
//!
//! ## Usage
//! ```bash
//! # Seed ./vendorya_dev.db
//! cargo run -p vendorya-db --bin seed
//!
//! # Specify database path
//! cargo run -p vendorya-db --bin seed -- --db ./data/vendorya.db
//! ```
//!
//! The run is skipped when the database already holds a store.

use std::env;

use vendorya_core::catalog::{NewProduct, NewVariant};
use vendorya_core::Money;
use vendorya_db::seed::seed_acme;
use vendorya_db::{Database, DbConfig};

/// Extra products: (name, sell price in cents).
const BEVERAGES: &[(&str, i64)] = &[
    ("Orange Juice 1L", 4_500),
    ("Mineral Water 600ml", 800),
    ("Iced Tea 500ml", 2_200),
    ("Energy Drink 250ml", 3_500),
    ("Lemonade 330ml", 1_900),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./vendorya_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Vendorya Demo Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./vendorya_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Vendorya Demo Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let stores: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores")
        .fetch_one(db.pool())
        .await?;
    if stores > 0 {
        println!("⚠ Database already has {} store(s), skipping.", stores);
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let acme = seed_acme(&db).await?;
    println!("✓ Store '{}' ({})", acme.store.name, acme.store.id);
    println!("  owner   user id: {}", acme.owner.user_id);
    println!("  cashier user id: {} (shift open)", acme.cashier.user_id);

    let catalog = db.catalog();
    for (name, cents) in BEVERAGES {
        let product = catalog
            .create_product(
                &acme.owner,
                &NewProduct {
                    name: (*name).to_string(),
                    supplier_id: Some(acme.supplier.id.clone()),
                    ..Default::default()
                },
            )
            .await?;
        let variant = catalog
            .create_variant(
                &acme.owner,
                &NewVariant {
                    product_id: product.id.clone(),
                    sell_price: Money::from_cents(*cents),
                    ..Default::default()
                },
            )
            .await?;
        println!("  + {:<22} {}  {}", name, variant.sku, variant.sell_price);
    }

    db.close().await;
    println!();
    println!("✓ Done. Send requests with header x-user-id: <user id>");
    Ok(())
}
