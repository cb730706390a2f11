//! Lenient numeric parsing.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

/// Read a non-negative decimal from a JSON number or numeric string.
///
/// Returns `None` for anything else, including negative numbers.
#[must_use]
pub fn decimal_from(value: &Value) -> Option<Decimal> {
    let parsed = match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }?;

    (!parsed.is_sign_negative() || parsed.is_zero()).then(|| parsed.normalize())
}

/// Read a whole, non-negative quantity.
///
/// Fractional, negative and non-numeric values yield `None`; values beyond
/// `u32::MAX` saturate.
#[must_use]
pub fn quantity_from(value: &Value) -> Option<u32> {
    let quantity = decimal_from(value)?;
    if !quantity.fract().is_zero() {
        return None;
    }
    Some(u32::try_from(quantity.trunc().mantissa()).unwrap_or(u32::MAX))
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}
