//! Cart synchronization against the fake backend over HTTP.

use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::json;
use tempfile::TempDir;
use tienda_client::{SignIn, Storefront};
use tienda_core::{NoticeKind, ProductRef};
use tienda_integration_tests::FakeBackend;

const EMAIL: &str = "luis@example.com";

async fn signed_in(backend: &FakeBackend, dir: &TempDir) -> Storefront {
    let config = backend.config(dir.path()).expect("config");
    let storefront = Storefront::from_config(&config).expect("storefront");
    storefront.session().restore().await;
    storefront
        .session()
        .sign_in(&SignIn {
            email: EMAIL.to_string(),
            password: SecretString::from("secreto2"),
            captcha: None,
        })
        .await;
    storefront
}

async fn backend() -> FakeBackend {
    let backend = FakeBackend::start().await;
    backend.add_user(EMAIL, "secreto2", "Luis", "cliente");
    backend.add_product("p-queso", "Queso fresco", 10.5);
    backend.add_product("p-miel", "Miel", 4.0);
    backend
}

fn dec(text: &str) -> Decimal {
    Decimal::from_str(text).expect("decimal")
}

fn notice(storefront: &Storefront, kind: NoticeKind) -> Option<String> {
    storefront.cart().notices().get(kind).map(|notice| notice.message)
}

#[tokio::test]
async fn test_add_lines_and_compute_total() {
    let backend = backend().await;
    let dir = TempDir::new().expect("temp dir");
    let storefront = signed_in(&backend, &dir).await;
    let cart = storefront.cart();

    assert!(cart.add_line(&ProductRef::new("p-queso"), 3).await);
    assert!(cart.add_line(&ProductRef::new("p-miel"), 1).await);

    let snapshot = cart.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(snapshot.cart.lines.len(), 2);
    assert_eq!(snapshot.cart.lines[0].line_subtotal, dec("31.5"));
    assert_eq!(snapshot.cart.lines[0].name.as_deref(), Some("Queso fresco"));
    // The backend reports total 0; the client sums the lines.
    assert_eq!(snapshot.cart.total, dec("35.5"));
    assert_eq!(
        notice(&storefront, NoticeKind::Success).as_deref(),
        Some("Product added to cart")
    );
}

#[tokio::test]
async fn test_non_positive_quantity_sent_as_one() {
    let backend = backend().await;
    let dir = TempDir::new().expect("temp dir");
    let storefront = signed_in(&backend, &dir).await;

    assert!(storefront.cart().add_line(&ProductRef::new("p-miel"), 0).await);
    assert!(storefront.cart().add_line(&ProductRef::new("p-miel"), -5).await);

    for request in backend.requests_to("carrito/agregar") {
        assert_eq!(request.body, json!({"productoId": "p-miel", "cantidad": 1}));
    }
    assert_eq!(backend.cart_of(EMAIL), vec![("p-miel".to_string(), 2)]);
}

#[tokio::test]
async fn test_rejected_add_keeps_cart() {
    let backend = backend().await;
    let dir = TempDir::new().expect("temp dir");
    let storefront = signed_in(&backend, &dir).await;
    let cart = storefront.cart();

    cart.add_line(&ProductRef::new("p-queso"), 1).await;
    let before = cart.cart();

    assert!(!cart.add_line(&ProductRef::new("p-inexistente"), 1).await);
    assert_eq!(cart.cart(), before);
    assert_eq!(
        notice(&storefront, NoticeKind::Error).as_deref(),
        Some("Producto no encontrado")
    );
}

#[tokio::test]
async fn test_clear_and_refresh() {
    let backend = backend().await;
    let dir = TempDir::new().expect("temp dir");
    let storefront = signed_in(&backend, &dir).await;
    let cart = storefront.cart();

    cart.add_line(&ProductRef::new("p-queso"), 2).await;
    assert!(cart.clear().await);
    assert!(cart.cart().is_empty());
    assert!(backend.cart_of(EMAIL).is_empty());

    assert!(cart.refresh().await);
    assert!(cart.cart().is_empty());
    assert_eq!(notice(&storefront, NoticeKind::Success).as_deref(), Some("Cart emptied"));
}

#[tokio::test]
async fn test_anonymous_refresh_reports_and_keeps_empty_cart() {
    let backend = backend().await;
    let dir = TempDir::new().expect("temp dir");
    let config = backend.config(dir.path()).expect("config");
    let storefront = Storefront::from_config(&config).expect("storefront");

    storefront.start().await;

    assert!(storefront.cart().cart().is_empty());
    assert_eq!(
        notice(&storefront, NoticeKind::Error).as_deref(),
        Some("No autorizado")
    );
    let refresh = backend.requests_to("carrito");
    assert_eq!(refresh.len(), 1);
    assert_eq!(refresh[0].bearer, None);
}

#[tokio::test]
async fn test_cart_reloads_after_restart() {
    let backend = backend().await;
    let dir = TempDir::new().expect("temp dir");

    let first = signed_in(&backend, &dir).await;
    first.cart().add_line(&ProductRef::new("p-miel"), 4).await;
    drop(first);

    let config = backend.config(dir.path()).expect("config");
    let second = Storefront::from_config(&config).expect("storefront");
    second.start().await;

    let cart = second.cart().cart();
    assert_eq!(cart.item_count(), 4);
    assert_eq!(cart.total, dec("16"));
}
