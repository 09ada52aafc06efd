//! # Invoice & Shift Arithmetic
//!
//! Totals are always recomputed from scratch from the persisted children,
//! never patched incrementally, so calling any of these twice on the same
//! input gives the same answer.
//!
//! ```text
//! line:     net = unit_price × qty
//!           tax = round_half_away(net × bps / 10000)
//!           total = net + tax
//!
//! invoice:  subtotal    = Σ line.total
//!           grand_total = subtotal + shipping − discount
//!           paid_amount = Σ payment.amount
//!
//! shift:    expected    = starting_cash + Σ cash payments since start
//!           difference  = counted − expected
//! ```
//!
//! Every step is checked: an amount that leaves the `i64` cent range is an
//! `AmountTooLarge` validation error, never a wrapped or panicking value.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::TaxRate;
use crate::validation::ValidationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub tax_amount: Money,
    pub total: Money,
}

/// Amounts for one invoice line, tax included.
pub fn line_amounts(unit_price: Money, quantity: i64, rate: TaxRate) -> ValidationResult<LineAmounts> {
    let net = unit_price
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| ValidationError::amount_too_large("line total"))?;
    let tax_amount = net.calculate_tax(rate);
    let total = net
        .checked_add(tax_amount)
        .ok_or_else(|| ValidationError::amount_too_large("line total"))?;
    Ok(LineAmounts { tax_amount, total })
}

/// `unit × qty` for lines without tax (refunds, purchases).
pub fn line_total(unit: Money, quantity: i64) -> ValidationResult<Money> {
    unit.checked_multiply_quantity(quantity)
        .ok_or_else(|| ValidationError::amount_too_large("line total"))
}

pub fn sum_amounts<I>(field: &str, amounts: I) -> ValidationResult<Money>
where
    I: IntoIterator<Item = Money>,
{
    Money::checked_sum(amounts).ok_or_else(|| ValidationError::amount_too_large(field))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub grand_total: Money,
}

impl InvoiceTotals {
    pub fn compute<I>(line_totals: I, shipping: Money, discount: Money) -> ValidationResult<Self>
    where
        I: IntoIterator<Item = Money>,
    {
        let subtotal = sum_amounts("subtotal", line_totals)?;
        let grand_total = subtotal
            .checked_add(shipping)
            .and_then(|total| total.checked_sub(discount))
            .ok_or_else(|| ValidationError::amount_too_large("grand_total"))?;
        Ok(Self { subtotal, grand_total })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftReconciliation {
    pub expected_cash: Money,
    pub difference: Money,
}

pub fn reconcile_shift(
    starting_cash: Money,
    cash_sales: Money,
    counted_cash: Money,
) -> ValidationResult<ShiftReconciliation> {
    let expected_cash = starting_cash
        .checked_add(cash_sales)
        .ok_or_else(|| ValidationError::amount_too_large("expected_cash"))?;
    let difference = counted_cash
        .checked_sub(expected_cash)
        .ok_or_else(|| ValidationError::amount_too_large("difference"))?;
    Ok(ShiftReconciliation {
        expected_cash,
        difference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_without_tax() {
        let line = line_amounts(Money::from_cents(5_000), 2, TaxRate::zero()).unwrap();
        assert_eq!(line.tax_amount, Money::zero());
        assert_eq!(line.total.cents(), 10_000);
    }

    #[test]
    fn test_line_with_tax() {
        // 3 × 10.00 at 14% = 30.00 + 4.20
        let line = line_amounts(Money::from_cents(1_000), 3, TaxRate::from_bps(1400)).unwrap();
        assert_eq!(line.tax_amount.cents(), 420);
        assert_eq!(line.total.cents(), 3_420);
    }

    #[test]
    fn test_invoice_totals() {
        let totals = InvoiceTotals::compute(
            [Money::from_cents(3_420), Money::from_cents(10_000)],
            Money::from_cents(500),
            Money::from_cents(920),
        )
        .unwrap();
        assert_eq!(totals.subtotal.cents(), 13_420);
        assert_eq!(totals.grand_total.cents(), 13_000);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let lines = vec![Money::from_cents(3_333), Money::from_cents(6_667)];
        let first = InvoiceTotals::compute(lines.clone(), Money::zero(), Money::zero()).unwrap();
        let second = InvoiceTotals::compute(lines, Money::zero(), Money::zero()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_invoice() {
        let totals = InvoiceTotals::compute(Vec::new(), Money::zero(), Money::zero()).unwrap();
        assert_eq!(totals.grand_total, Money::zero());
    }

    #[test]
    fn test_shift_short_and_over() {
        let r = reconcile_shift(Money::from_cents(10_000), Money::from_cents(25_000), Money::from_cents(34_500)).unwrap();
        assert_eq!(r.expected_cash.cents(), 35_000);
        assert_eq!(r.difference.cents(), -500);

        let r = reconcile_shift(Money::from_cents(10_000), Money::zero(), Money::from_cents(10_100)).unwrap();
        assert_eq!(r.difference.cents(), 100);
    }

    #[test]
    fn test_overflowing_line_is_rejected() {
        let err = line_amounts(Money::from_cents(i64::MAX / 2 + 1), 2, TaxRate::zero()).unwrap_err();
        assert!(matches!(err, ValidationError::AmountTooLarge { .. }));

        // Net fits, tax pushes it over
        let err = line_amounts(Money::from_cents(i64::MAX - 10), 1, TaxRate::from_bps(10_000)).unwrap_err();
        assert!(matches!(err, ValidationError::AmountTooLarge { .. }));
    }

    #[test]
    fn test_overflowing_invoice_is_rejected() {
        let huge = Money::from_cents(i64::MAX / 2 + 1);
        assert!(InvoiceTotals::compute([huge, huge], Money::zero(), Money::zero()).is_err());
        assert!(InvoiceTotals::compute([huge], huge, Money::zero()).is_err());
    }

    #[test]
    fn test_largest_valid_cart_fits() {
        use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

        let line = line_amounts(Money::from_cents(MAX_PRICE_CENTS), MAX_ITEM_QUANTITY, TaxRate::from_bps(10_000)).unwrap();
        let totals = InvoiceTotals::compute(vec![line.total; MAX_CART_ITEMS], Money::zero(), Money::zero()).unwrap();
        assert!(totals.grand_total.is_positive());
    }
}
