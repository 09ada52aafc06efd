//! # Validation Module
//!
//! Input validation run before business logic and before SQL.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: HTTP extractor     JSON shape, types                          │
//! │  Layer 2: THIS MODULE        lengths, ranges, formats                   │
//! │  Layer 3: SQLite             NOT NULL, UNIQUE, FOREIGN KEY, triggers    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vendorya_core::validation::{validate_search_query, validate_quantity};
//!
//! assert_eq!(validate_search_query("  col ").unwrap().as_deref(), Some("col"));
//! assert_eq!(validate_search_query("co").unwrap(), None);
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::finance::CartLine;
use crate::money::Money;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS, MIN_SEARCH_LEN};

pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a free-text name (product, store, customer, supplier...).
pub fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a SKU or product code.
///
/// ```rust
/// use vendorya_core::validation::validate_sku;
///
/// assert!(validate_sku("13001").is_ok());
/// assert!(validate_sku("COKE-330").is_ok());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Supplier code prefix: exactly two ASCII digits.
pub fn validate_code_prefix(prefix: &str) -> ValidationResult<()> {
    if prefix.len() != 2 || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "code_prefix".to_string(),
            reason: "must be exactly 2 digits".to_string(),
        });
    }
    Ok(())
}

/// Phone numbers: digits with an optional leading `+`, 6 to 20 digits.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    let digits = phone.strip_prefix('+').unwrap_or(phone);

    if digits.is_empty() {
        return Err(ValidationError::Required {
            field: "phone_number".to_string(),
        });
    }

    if !digits.bytes().all(|b| b.is_ascii_digit()) || !(6..=20).contains(&digits.len()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone_number".to_string(),
            reason: "must be 6 to 20 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query and returns it trimmed.
///
/// ## Rules
/// - Fewer than 3 characters after trimming: `None`, callers answer with
///   empty results
/// - At most 100 characters
pub fn validate_search_query(query: &str) -> ValidationResult<Option<String>> {
    let query = query.trim();
    let len = query.chars().count();

    if len < MIN_SEARCH_LEN {
        return Ok(None);
    }

    if len > 100 {
        return Err(ValidationError::TooLong {
            field: "q".to_string(),
            max: 100,
        });
    }

    Ok(Some(query.to_string()))
}

/// Preference blobs must be valid JSON.
pub fn validate_json(field: &str, raw: &str) -> ValidationResult<()> {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: e.to_string(),
        })
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Stock adjustments are signed but never zero.
pub fn validate_quantity_change(delta: i64) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::InvalidFormat {
            field: "quantity_change".to_string(),
            reason: "must not be zero".to_string(),
        });
    }
    Ok(())
}

/// Prices may be zero (free items) but never negative or above
/// MAX_PRICE_CENTS.
pub fn validate_price(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() || amount.cents() > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    if amount.cents() > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "payment amount".to_string(),
            min: 1,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// ## Rules
/// - Between 0 and 10000 bps (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the shape of a checkout cart. Emptiness is a precondition
/// handled by checkout itself, not here.
pub fn validate_cart_lines(lines: &[CartLine]) -> ValidationResult<()> {
    if lines.len() > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    for line in lines {
        if line.id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "id".to_string(),
            });
        }
        validate_quantity(line.qty)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("13001").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Acme", 200).is_ok());
        assert!(validate_name("name", "  ", 200).is_err());
        assert!(validate_name("name", &"A".repeat(201), 200).is_err());
    }

    #[test]
    fn test_validate_code_prefix() {
        assert!(validate_code_prefix("13").is_ok());
        assert!(validate_code_prefix("00").is_ok());
        assert!(validate_code_prefix("1").is_err());
        assert!(validate_code_prefix("123").is_err());
        assert!(validate_code_prefix("1a").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("01001234567").is_ok());
        assert!(validate_phone("+201001234567").is_ok());
        assert!(validate_phone("").is_err());
        assert!(validate_phone("12-34").is_err());
        assert!(validate_phone("123").is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query(" acme ").unwrap().as_deref(), Some("acme"));
        assert_eq!(validate_search_query("ac").unwrap(), None);
        assert_eq!(validate_search_query("   ").unwrap(), None);
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_json() {
        assert!(validate_json("config", r#"{"columns":["name"]}"#).is_ok());
        assert!(validate_json("config", "{oops").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_quantity_change() {
        assert!(validate_quantity_change(-3).is_ok());
        assert!(validate_quantity_change(0).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_price("sell_price", Money::zero()).is_ok());
        assert!(validate_price("sell_price", Money::from_cents(-1)).is_err());
        assert!(validate_price("sell_price", Money::from_cents(MAX_PRICE_CENTS)).is_ok());
        assert!(validate_price("sell_price", Money::from_cents(MAX_PRICE_CENTS + 1)).is_err());
        assert!(validate_price("sell_price", Money::from_cents(i64::MAX / 2 + 1)).is_err());
        assert!(validate_payment_amount(Money::from_cents(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
        assert!(validate_tax_rate_bps(10000).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }

    #[test]
    fn test_validate_cart_lines() {
        let ok = vec![CartLine { id: "v1".into(), qty: 2 }];
        assert!(validate_cart_lines(&ok).is_ok());

        let zero_qty = vec![CartLine { id: "v1".into(), qty: 0 }];
        assert!(validate_cart_lines(&zero_qty).is_err());

        let blank_id = vec![CartLine { id: " ".into(), qty: 1 }];
        assert!(validate_cart_lines(&blank_id).is_err());

        let too_many: Vec<_> = (0..=MAX_CART_ITEMS)
            .map(|i| CartLine { id: format!("v{}", i), qty: 1 })
            .collect();
        assert!(validate_cart_lines(&too_many).is_err());
    }
}
