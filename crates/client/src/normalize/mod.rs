//! Conversion of loosely-typed backend payloads into canonical shapes.
//!
//! The backend names the same field differently depending on which endpoint
//! (and which version of it) produced the payload. Rather than guessing
//! structurally, each field is resolved from a fixed, ordered list of
//! candidate keys. Every function here is pure and total: missing or
//! malformed values degrade to zero/empty, never to an error.

mod cart;
mod identity;
mod number;

pub use cart::{
    ITEMS_KEY, PRICE_KEYS, PRODUCT_KEYS, QUANTITY_KEYS, SUBTOTAL_KEY, TOTAL_KEY, normalize_cart,
    normalize_line,
};
pub use identity::{AuthPayload, ROLE_KEYS, normalize_auth, normalize_identity};
pub use number::{decimal_from, quantity_from};

use serde_json::Value;

/// Follow a dotted path (`"producto.precio"`) into a JSON value.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.get(key))
        .filter(|found| !found.is_null())
}

/// First candidate path that resolves to a non-null value.
fn first_present<'a>(value: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates.iter().find_map(|path| lookup(value, path))
}
