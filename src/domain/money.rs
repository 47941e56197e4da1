use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::SettlementError;

/// Rounds a ledger amount to two fractional digits, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts a ledger amount to integer minor currency units for the gateway
/// wire format (e.g. 450.00 INR -> 45000 paise).
pub fn to_minor_units(amount: Decimal) -> Result<i64, SettlementError> {
    let minor = round_money(amount) * Decimal::from(100);
    minor
        .to_i64()
        .ok_or_else(|| SettlementError::Validation(format!("amount {amount} out of range")))
}
