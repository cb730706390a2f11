//! Order placement against the fake backend over HTTP.

use secrecy::SecretString;
use serde_json::json;
use tempfile::TempDir;
use tienda_client::{OrderError, ShippingAddress, SignIn, Storefront};
use tienda_core::{PaymentMethod, ProductRef};
use tienda_integration_tests::FakeBackend;

const EMAIL: &str = "luis@example.com";

async fn shopping() -> (FakeBackend, TempDir, Storefront) {
    let backend = FakeBackend::start().await;
    backend.add_user(EMAIL, "secreto2", "Luis", "cliente");
    backend.add_product("p-queso", "Queso fresco", 10.5);

    let dir = TempDir::new().expect("temp dir");
    let config = backend.config(dir.path()).expect("config");
    let storefront = Storefront::from_config(&config).expect("storefront");
    storefront.start().await;
    storefront
        .session()
        .sign_in(&SignIn {
            email: EMAIL.to_string(),
            password: SecretString::from("secreto2"),
            captcha: None,
        })
        .await;
    (backend, dir, storefront)
}

fn address() -> ShippingAddress {
    let mut address = ShippingAddress::new("Juárez", "12", "Centro", "Guadalupe");
    address.postal_code = "98600".to_string();
    address
}

#[tokio::test]
async fn test_place_order_posts_cart_and_empties_it() {
    let (backend, _dir, storefront) = shopping().await;
    storefront
        .cart()
        .add_line(&ProductRef::new("p-queso"), 2)
        .await;

    let id = storefront
        .place_order(&address(), PaymentMethod::PagoEnEntrega)
        .await
        .expect("order placed");
    assert!(id.is_some());

    let orders = backend.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(
        orders[0]["items"],
        json!([{
            "producto": "p-queso",
            "cantidad": 2,
            "precioUnitario": 10.5,
            "subtotal": 21.0,
            "nombreProducto": "Queso fresco"
        }])
    );
    assert_eq!(orders[0]["total"], json!(21.0));
    assert_eq!(orders[0]["metodo_pago"], json!("pago_en_entrega"));
    assert_eq!(
        orders[0]["direccionTexto"],
        json!("Juárez #12, Centro, Guadalupe, Zacatecas, CP 98600")
    );

    assert!(storefront.cart().cart().is_empty());
    assert!(backend.cart_of(EMAIL).is_empty());
}

#[tokio::test]
async fn test_incomplete_address_never_reaches_backend() {
    let (backend, _dir, storefront) = shopping().await;
    storefront
        .cart()
        .add_line(&ProductRef::new("p-queso"), 1)
        .await;

    let mut address = address();
    address.street = String::new();
    let err = storefront
        .place_order(&address, PaymentMethod::default())
        .await
        .expect_err("invalid address");

    assert!(matches!(err, OrderError::Validation(_)));
    assert!(backend.requests_to("pedidos").is_empty());
    assert_eq!(storefront.cart().cart().lines.len(), 1);
}

#[tokio::test]
async fn test_empty_cart_cannot_be_ordered() {
    let (backend, _dir, storefront) = shopping().await;

    let err = storefront
        .place_order(&address(), PaymentMethod::default())
        .await
        .expect_err("empty cart");

    assert_eq!(err.to_string(), "Your cart is empty");
    assert!(backend.orders().is_empty());
}
