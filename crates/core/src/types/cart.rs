//! Canonical cart model.
//!
//! The remote API names cart fields inconsistently; whatever it sends is
//! normalized into these shapes before anything else sees it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductRef;
use super::price::line_subtotal;

/// One product/quantity/price entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product this line refers to (empty when the remote omitted it).
    pub product: ProductRef,
    /// Product name, when the remote included one.
    pub name: Option<String>,
    /// Number of units.
    pub quantity: u32,
    /// Price of one unit, never negative.
    pub unit_price: Decimal,
    /// `quantity * unit_price` unless the remote supplied its own.
    pub line_subtotal: Decimal,
}

impl CartLine {
    /// Build a line whose subtotal is computed locally.
    #[must_use]
    pub fn new(product: ProductRef, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            product,
            name: None,
            quantity,
            unit_price,
            line_subtotal: line_subtotal(quantity, unit_price),
        }
    }
}

/// The shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Cart {
    /// Lines in the order the remote returned them.
    pub lines: Vec<CartLine>,
    /// Cart total, never negative.
    pub total: Decimal,
}

impl Cart {
    /// An empty cart with a zero total.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            lines: Vec::new(),
            total: Decimal::ZERO,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of the line subtotals.
    #[must_use]
    pub fn lines_total(&self) -> Decimal {
        self.lines
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.line_subtotal))
    }
}
