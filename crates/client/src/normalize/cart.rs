//! Cart payload normalization.

use rust_decimal::Decimal;
use serde_json::Value;

use tienda_core::{Cart, CartLine, ProductRef, line_subtotal};

use super::number::{decimal_from, quantity_from};
use super::{first_present, lookup};

/// Field holding the cart lines.
pub const ITEMS_KEY: &str = "items";

/// Candidate keys for a line's quantity, in priority order.
pub const QUANTITY_KEYS: &[&str] = &["cantidad", "quantity", "qty"];

/// Candidate keys for a line's unit price, in priority order.
pub const PRICE_KEYS: &[&str] = &["precioUnitario", "precio", "price", "producto.precio"];

/// Field holding a line's own subtotal.
pub const SUBTOTAL_KEY: &str = "subtotal";

/// Field holding the cart total.
pub const TOTAL_KEY: &str = "total";

/// Candidate keys for the product reference, in priority order.
///
/// `producto` may be the id itself or a populated product document.
pub const PRODUCT_KEYS: &[&str] = &["producto._id", "producto.id", "producto", "productoId", "_id"];

/// Candidate keys for the product name, in priority order.
const NAME_KEYS: &[&str] = &["nombre", "producto.nombre", "nombreProducto", "name"];

/// Normalize a cart snapshot from the backend.
///
/// - Lines come from `items` (absent or not a list: no lines).
/// - Each line resolves quantity, unit price and subtotal per
///   [`normalize_line`].
/// - The total is the backend's `total` when present and non-zero,
///   otherwise the sum of the resolved line subtotals.
#[must_use]
pub fn normalize_cart(payload: &Value) -> Cart {
    let lines: Vec<CartLine> = payload
        .get(ITEMS_KEY)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(normalize_line).collect())
        .unwrap_or_default();

    let total = payload
        .get(TOTAL_KEY)
        .and_then(decimal_from)
        .filter(|total| !total.is_zero())
        .unwrap_or_else(|| {
            lines
                .iter()
                .fold(Decimal::ZERO, |sum, line| sum.saturating_add(line.line_subtotal))
        });

    Cart { lines, total }
}

/// Normalize one cart line.
///
/// Quantity and unit price fall back to zero when no candidate key holds a
/// usable value. The subtotal is the line's own `subtotal` when present and
/// non-zero, otherwise `quantity * unit_price`.
#[must_use]
pub fn normalize_line(item: &Value) -> CartLine {
    let quantity = first_present(item, QUANTITY_KEYS)
        .and_then(quantity_from)
        .unwrap_or(0);

    let unit_price = first_present(item, PRICE_KEYS)
        .and_then(decimal_from)
        .unwrap_or(Decimal::ZERO);

    let line_subtotal = item
        .get(SUBTOTAL_KEY)
        .and_then(decimal_from)
        .filter(|subtotal| !subtotal.is_zero())
        .unwrap_or_else(|| line_subtotal(quantity, unit_price));

    let product = PRODUCT_KEYS
        .iter()
        .find_map(|path| lookup(item, path).and_then(Value::as_str))
        .map_or_else(|| ProductRef::new(""), ProductRef::from);

    let name = NAME_KEYS
        .iter()
        .find_map(|path| lookup(item, path).and_then(Value::as_str))
        .map(str::to_string);

    CartLine {
        product,
        name,
        quantity,
        unit_price,
        line_subtotal,
    }
}
