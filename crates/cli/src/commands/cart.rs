//! Cart commands.

use tienda_client::Storefront;
use tienda_core::{NoticeKind, ProductRef};

use super::CliError;
use crate::output;

/// Print the remote cart.
pub async fn show(storefront: &Storefront) -> Result<(), CliError> {
    storefront.session().restore().await;

    let cart = storefront.cart();
    if !cart.refresh().await {
        return Err(CliError::from_notices(cart.notices(), "Could not load the cart"));
    }

    output::cart(&cart.cart());
    Ok(())
}

/// Add a product and print the updated cart.
pub async fn add(storefront: &Storefront, product: &str, quantity: i64) -> Result<(), CliError> {
    storefront.session().restore().await;

    let cart = storefront.cart();
    if !cart.add_line(&ProductRef::new(product), quantity).await {
        return Err(CliError::from_notices(
            cart.notices(),
            "Could not add to the cart",
        ));
    }

    if let Some(notice) = cart.notices().get(NoticeKind::Success) {
        output::line(&notice.message);
    }
    output::cart(&cart.cart());
    Ok(())
}

/// Empty the cart.
pub async fn clear(storefront: &Storefront) -> Result<(), CliError> {
    storefront.session().restore().await;

    let cart = storefront.cart();
    if !cart.clear().await {
        return Err(CliError::from_notices(
            cart.notices(),
            "Could not empty the cart",
        ));
    }

    if let Some(notice) = cart.notices().get(NoticeKind::Success) {
        output::line(&notice.message);
    }
    Ok(())
}
