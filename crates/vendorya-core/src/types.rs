//! # Shared Value Types
//!
//! Small value types used by several entity modules.
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 string, immutable, used for relations
//! - a business key where one exists (product code, SKU, invoice number,
//!   phone number), human-readable and unique per store

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (1400 bps = 14%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Generates a new entity ID (UUID v4).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_default_is_zero() {
        assert!(TaxRate::default().is_zero());
        assert_eq!(TaxRate::from_bps(1400).bps(), 1400);
    }

    #[test]
    fn test_new_id_is_uuid() {
        let id = new_id();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_ne!(id, new_id());
    }
}
