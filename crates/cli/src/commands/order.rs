//! Order placement command.

use clap::Args;
use tienda_client::{ShippingAddress, Storefront};
use tienda_core::PaymentMethod;

use super::CliError;
use crate::output;

/// Delivery details for `tienda order`.
#[derive(Debug, Args)]
pub struct OrderArgs {
    /// Street
    #[arg(long)]
    street: String,

    /// Street number
    #[arg(long)]
    number: String,

    /// Neighborhood
    #[arg(long)]
    neighborhood: String,

    /// Municipality
    #[arg(long)]
    municipality: String,

    /// State
    #[arg(long)]
    state: Option<String>,

    /// Postal code
    #[arg(long)]
    postal_code: Option<String>,

    /// Contact phone
    #[arg(long)]
    phone: Option<String>,

    /// Payment method (`pago_en_entrega`, `transferencia`, `tarjeta`)
    #[arg(long, default_value = "pago_en_entrega")]
    payment: PaymentMethod,
}

impl OrderArgs {
    fn address(&self) -> ShippingAddress {
        let mut address = ShippingAddress::new(
            self.street.as_str(),
            self.number.as_str(),
            self.neighborhood.as_str(),
            self.municipality.as_str(),
        );
        if let Some(state) = &self.state {
            address.state.clone_from(state);
        }
        if let Some(postal_code) = &self.postal_code {
            address.postal_code.clone_from(postal_code);
        }
        if let Some(phone) = &self.phone {
            address.phone.clone_from(phone);
        }
        address
    }
}

/// Order everything in the cart.
pub async fn place(storefront: &Storefront, args: &OrderArgs) -> Result<(), CliError> {
    storefront.start().await;

    let id = storefront
        .place_order(&args.address(), args.payment)
        .await?;

    output::order_placed(id.as_ref());
    Ok(())
}
