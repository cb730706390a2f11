//! Status enums for sessions, roles and orders.

use serde::{Deserialize, Serialize};

/// Role field value that marks an administrator.
pub const ADMIN_ROLE: &str = "admin";

/// Role of an authenticated identity.
///
/// The remote API sends a free-form role string. Only the exact admin
/// sentinel maps to [`Role::Admin`]; everything else, including a missing
/// field, is a customer. Route guards and navigation must go through
/// [`Role::from_raw`] rather than comparing strings themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl Role {
    /// Derive the role from the identity's raw role field.
    #[must_use]
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some(ADMIN_ROLE) => Self::Admin,
            _ => Self::Customer,
        }
    }

    /// Whether this role may use the administration screens.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Lifecycle status of the local session.
///
/// Derived from the session state, never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Startup check of a persisted credential has not finished yet.
    Restoring,
    /// No identity is adopted.
    Anonymous,
    /// An identity is adopted.
    Authenticated,
}

/// Payment methods understood by the order endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    PagoEnEntrega,
    /// Bank transfer.
    Transferencia,
    /// Card payment.
    Tarjeta,
}

impl PaymentMethod {
    /// The wire value sent to the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PagoEnEntrega => "pago_en_entrega",
            Self::Transferencia => "transferencia",
            Self::Tarjeta => "tarjeta",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pago_en_entrega" => Ok(Self::PagoEnEntrega),
            "transferencia" => Ok(Self::Transferencia),
            "tarjeta" => Ok(Self::Tarjeta),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_raw() {
        assert_eq!(Role::from_raw(Some("admin")), Role::Admin);
        assert_eq!(Role::from_raw(Some("customer")), Role::Customer);
        assert_eq!(Role::from_raw(Some("cliente")), Role::Customer);
        assert_eq!(Role::from_raw(Some("Admin")), Role::Customer);
        assert_eq!(Role::from_raw(None), Role::Customer);
    }

    #[test]
    fn test_payment_method_wire_values() {
        for method in [
            PaymentMethod::PagoEnEntrega,
            PaymentMethod::Transferencia,
            PaymentMethod::Tarjeta,
        ] {
            let json = serde_json::to_string(&method).expect("serialize");
            assert_eq!(json, format!("\"{}\"", method.as_str()));
            assert_eq!(method.as_str().parse::<PaymentMethod>(), Ok(method));
        }
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }
}
