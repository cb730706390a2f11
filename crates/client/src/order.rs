//! Order placement payload.
//!
//! Built from the canonical cart plus a shipping address. The wire shape
//! follows the backend's order model:
//!
//! ```json
//! {
//!   "items": [{"producto": "...", "cantidad": 2, "precioUnitario": 10.5,
//!              "subtotal": 21.0, "nombreProducto": "..."}],
//!   "total": 21.0,
//!   "direccion": {"calle": "...", "numero": "...", "colonia": "...",
//!                 "municipio": "...", "estado": "...", "cp": "...",
//!                 "telefono": "..."},
//!   "direccionTexto": "...",
//!   "metodo_pago": "pago_en_entrega"
//! }
//! ```

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use tienda_core::{Cart, PaymentMethod, ProductRef, line_subtotal};

use crate::gateway::GatewayError;

const DEFAULT_STATE: &str = "Zacatecas";
const DEFAULT_POSTAL_CODE: &str = "00000";
const DEFAULT_PHONE: &str = "0000000000";

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order form or the cart is not in a state that can be ordered.
    #[error("{0}")]
    Validation(String),

    /// The backend rejected or never received the order.
    #[error(transparent)]
    Remote(#[from] GatewayError),
}

impl OrderError {
    /// Message suitable for a notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Remote(e) => e
                .messages()
                .first()
                .cloned()
                .unwrap_or_else(|| "Could not create the order".to_string()),
        }
    }
}

/// Delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingAddress {
    #[serde(rename = "calle")]
    pub street: String,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "colonia")]
    pub neighborhood: String,
    #[serde(rename = "municipio")]
    pub municipality: String,
    #[serde(rename = "estado")]
    pub state: String,
    #[serde(rename = "cp")]
    pub postal_code: String,
    #[serde(rename = "telefono")]
    pub phone: String,
}

impl ShippingAddress {
    /// Address with the required fields set and the optional ones defaulted.
    #[must_use]
    pub fn new(
        street: impl Into<String>,
        number: impl Into<String>,
        neighborhood: impl Into<String>,
        municipality: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            number: number.into(),
            neighborhood: neighborhood.into(),
            municipality: municipality.into(),
            state: DEFAULT_STATE.to_string(),
            postal_code: DEFAULT_POSTAL_CODE.to_string(),
            phone: DEFAULT_PHONE.to_string(),
        }
    }

    /// Trimmed copy, with blank optional fields replaced by their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Validation`] if street, number, neighborhood or
    /// municipality is blank.
    pub fn normalized(&self) -> Result<Self, OrderError> {
        let required = [
            &self.street,
            &self.number,
            &self.neighborhood,
            &self.municipality,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(OrderError::Validation(
                "Fill in at least street, number, neighborhood and municipality".to_string(),
            ));
        }

        let or_default = |value: &str, default: &str| {
            let value = value.trim();
            let chosen = if value.is_empty() { default } else { value };
            chosen.to_string()
        };

        Ok(Self {
            street: self.street.trim().to_string(),
            number: self.number.trim().to_string(),
            neighborhood: self.neighborhood.trim().to_string(),
            municipality: self.municipality.trim().to_string(),
            state: or_default(&self.state, DEFAULT_STATE),
            postal_code: or_default(&self.postal_code, DEFAULT_POSTAL_CODE),
            phone: or_default(&self.phone, DEFAULT_PHONE),
        })
    }

    /// One-line rendering, e.g. `Juárez #12, Centro, Guadalupe, Zacatecas, CP 98600`.
    #[must_use]
    pub fn one_line(&self) -> String {
        format!(
            "{} #{}, {}, {}, {}, CP {}",
            self.street,
            self.number,
            self.neighborhood,
            self.municipality,
            self.state,
            self.postal_code
        )
    }
}

/// One ordered product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    #[serde(rename = "producto")]
    pub product: ProductRef,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
    #[serde(rename = "precioUnitario", with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(rename = "nombreProducto", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Body of `POST /pedidos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub items: Vec<OrderItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(rename = "direccion")]
    pub address: ShippingAddress,
    #[serde(rename = "direccionTexto")]
    pub address_line: String,
    #[serde(rename = "metodo_pago")]
    pub payment_method: PaymentMethod,
}

impl OrderRequest {
    /// Build an order for everything in `cart`.
    ///
    /// Each item's subtotal is recomputed from quantity and unit price. The
    /// total is the cart total when non-zero, otherwise the sum of the item
    /// subtotals.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Validation`] if the cart is empty, a line has no
    /// product reference, or the address is incomplete.
    pub fn from_cart(
        cart: &Cart,
        address: &ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::Validation("Your cart is empty".to_string()));
        }
        if cart.lines.iter().any(|line| line.product.is_empty()) {
            return Err(OrderError::Validation(
                "A cart line has no product reference".to_string(),
            ));
        }

        let address = address.normalized()?;

        let items: Vec<OrderItem> = cart
            .lines
            .iter()
            .map(|line| OrderItem {
                product: line.product.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line_subtotal(line.quantity, line.unit_price),
                name: line.name.clone(),
            })
            .collect();

        let total = if cart.total.is_zero() {
            items
                .iter()
                .fold(Decimal::ZERO, |sum, item| sum.saturating_add(item.subtotal))
        } else {
            cart.total
        };

        Ok(Self {
            items,
            total,
            address_line: address.one_line(),
            address,
            payment_method,
        })
    }
}
