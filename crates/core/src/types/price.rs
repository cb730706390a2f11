//! Decimal price helpers.
//!
//! Amounts are kept as [`Decimal`] so that `3 * 10.5` is exactly `31.5`.
//! All arithmetic saturates instead of overflowing.

use rust_decimal::Decimal;

/// Subtotal for `quantity` units at `unit_price`.
#[must_use]
pub fn line_subtotal(quantity: u32, unit_price: Decimal) -> Decimal {
    Decimal::from(quantity).saturating_mul(unit_price)
}

/// Format an amount in Mexican pesos for display (e.g., `$1,234.50 MXN`).
#[must_use]
pub fn format_mxn(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}${grouped}.{cents} MXN")
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_line_subtotal_is_exact() {
        let price = Decimal::from_str("10.5").expect("decimal");
        assert_eq!(line_subtotal(3, price), Decimal::from_str("31.5").expect("decimal"));
        assert_eq!(line_subtotal(0, price), Decimal::ZERO);
    }

    #[test]
    fn test_line_subtotal_saturates() {
        assert_eq!(line_subtotal(u32::MAX, Decimal::MAX), Decimal::MAX);
    }

    #[test]
    fn test_format_mxn() {
        assert_eq!(format_mxn(Decimal::ZERO), "$0.00 MXN");
        assert_eq!(
            format_mxn(Decimal::from_str("1234.5").expect("decimal")),
            "$1,234.50 MXN"
        );
        assert_eq!(
            format_mxn(Decimal::from_str("999999.999").expect("decimal")),
            "$1,000,000.00 MXN"
        );
    }
}
