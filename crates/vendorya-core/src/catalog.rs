//! # Catalog Types
//!
//! Sellable items and the per-store lookup tables around them.
//!
//! ```text
//! Product (STANDARD | SERVICE | BUNDLE)
//!   ├── category?, supplier?, tax?
//!   ├── ProductVariant (sku, barcode, cost, sell price) 1..n
//!   │     └── ProductAttribute (definition ↔ value), unique per pair
//!   └── BundleItem (component variant × qty)      [BUNDLE only]
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::TaxRate;

// =============================================================================
// Lookup tables
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Tax {
    pub id: String,
    pub store_id: String,
    pub name: String,
    pub rate: TaxRate,
    pub is_deleted: bool,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub store_id: String,
    pub name: String,
    pub contact_info: Option<String>,
    /// Exactly two digits, unique per store. Seeds product codes and SKUs.
    pub code_prefix: String,
    pub is_deleted: bool,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub store_id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub is_deleted: bool,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Custom attributes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum AttributeInputType {
    #[default]
    Text,
    Select,
    Number,
}

/// Schema row for one custom field of a store.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AttributeDefinition {
    pub id: String,
    pub store_id: String,
    pub name: String,
    /// Slug used as the key of the attribute map.
    pub key: String,
    pub input_type: AttributeInputType,
    /// JSON array of allowed values (SELECT only).
    pub options: String,
    pub is_deleted: bool,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl AttributeDefinition {
    /// Allowed values for a SELECT field. Malformed JSON yields no options.
    pub fn option_list(&self) -> Vec<String> {
        serde_json::from_str(&self.options).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttributeDefinition {
    pub name: String,
    pub key: String,
    pub input_type: AttributeInputType,
    #[serde(default)]
    pub options: Vec<String>,
}

/// One stored value of a custom field for a variant.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductAttribute {
    pub id: String,
    pub variant_id: String,
    pub definition_id: String,
    pub value: String,
}

// =============================================================================
// Product & Variant
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ProductType {
    #[default]
    Standard,
    /// Never tracked in stock.
    Service,
    /// Stock is drawn from the component variants.
    Bundle,
}

impl ProductType {
    pub const fn tracks_stock(&self) -> bool {
        matches!(self, ProductType::Standard)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub store_id: String,
    pub name: String,
    /// Auto-generated `<prefix><NNN>` when not supplied. Unique per store.
    pub code: String,
    pub product_type: ProductType,
    pub category_id: Option<String>,
    pub supplier_id: Option<String>,
    pub tax_id: Option<String>,
    pub description: Option<String>,
    pub unit: String,
    pub base_price: Money,
    pub is_deleted: bool,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProduct {
    /// Ignored for non-superusers.
    pub store_id: Option<String>,
    pub name: String,
    pub code: Option<String>,
    #[serde(default)]
    pub product_type: ProductType,
    pub category_id: Option<String>,
    pub supplier_id: Option<String>,
    pub tax_id: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    #[serde(default)]
    pub base_price: Money,
}

/// A concrete sellable SKU.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductVariant {
    pub id: String,
    pub product_id: String,
    pub sku: String,
    pub barcode: Option<String>,
    /// Overwritten with the unit cost of every received purchase line.
    pub cost_price: Money,
    pub sell_price: Money,
    pub is_deleted: bool,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVariant {
    pub product_id: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    #[serde(default)]
    pub cost_price: Money,
    #[serde(default)]
    pub sell_price: Money,
}

/// A variant joined with the product fields checkout needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SellableVariant {
    pub variant_id: String,
    pub product_id: String,
    pub store_id: String,
    pub product_name: String,
    pub product_type: ProductType,
    pub sku: String,
    pub sell_price: Money,
    /// Zero when the product has no tax.
    pub tax_rate: TaxRate,
}

impl SellableVariant {
    /// Label used on invoice lines and search results.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.product_name, self.sku)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BundleItem {
    pub id: String,
    pub bundle_id: String,
    pub component_variant_id: String,
    pub quantity: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_standard_products_track_stock() {
        assert!(ProductType::Standard.tracks_stock());
        assert!(!ProductType::Service.tracks_stock());
        assert!(!ProductType::Bundle.tracks_stock());
    }

    #[test]
    fn test_option_list_tolerates_bad_json() {
        let mut def = AttributeDefinition {
            id: "d".into(),
            store_id: "s".into(),
            name: "Size".into(),
            key: "size".into(),
            input_type: AttributeInputType::Select,
            options: r#"["S","M","L"]"#.into(),
            is_deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
        };
        assert_eq!(def.option_list(), vec!["S", "M", "L"]);

        def.options = "not json".into();
        assert!(def.option_list().is_empty());
    }

    #[test]
    fn test_display_name() {
        let v = SellableVariant {
            variant_id: "v".into(),
            product_id: "p".into(),
            store_id: "s".into(),
            product_name: "Cola".into(),
            product_type: ProductType::Standard,
            sku: "13001".into(),
            sell_price: Money::from_cents(500),
            tax_rate: TaxRate::zero(),
        };
        assert_eq!(v.display_name(), "Cola (13001)");
    }
}
