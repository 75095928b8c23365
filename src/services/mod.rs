pub mod checks;
pub mod importer;
pub mod invoices;
pub mod users;
pub mod vendors;

use rust_decimal::Decimal;

/// Normalizes a monetary value to exactly two fraction digits so amounts
/// serialize identically regardless of which store backend they round-tripped
/// through.
pub(crate) fn to_money(amount: Decimal) -> Decimal {
    let mut normalized = amount.round_dp(2);
    normalized.rescale(2);
    normalized
}
