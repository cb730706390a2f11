//! Cart synchronizer: the local mirror of the remote cart.
//!
//! The canonical [`Cart`] is replaced wholesale after every successful read
//! or mutation and never patched in place. Failures leave the previous cart
//! untouched and surface as an error notice.
//!
//! `loading` is raised for the duration of each remote call. It is a
//! cooperative lock: views disable mutation controls while it is set, the
//! synchronizer itself neither queues nor rejects overlapping calls.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use tienda_core::{Cart, NoticeKind, ProductRef};

use crate::gateway::{GatewayError, RemoteGateway};
use crate::normalize::normalize_cart;
use crate::notice::NoticeQueue;

const REFRESH_FAILED: &str = "Could not load the cart";
const ADD_FAILED: &str = "Could not add to the cart";
const CLEAR_FAILED: &str = "Could not empty the cart";
const ADDED: &str = "Product added to cart";
const CLEARED: &str = "Cart emptied";

/// Observable cart state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    pub cart: Cart,
    /// A remote cart call is in flight.
    pub loading: bool,
}

/// Owner of the canonical cart.
pub struct CartSynchronizer {
    gateway: Arc<dyn RemoteGateway>,
    state: watch::Sender<CartSnapshot>,
    notices: NoticeQueue,
}

impl std::fmt::Debug for CartSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSynchronizer")
            .field("state", &*self.state.borrow())
            .field("notices", &self.notices)
            .finish_non_exhaustive()
    }
}

impl CartSynchronizer {
    /// Create a synchronizer holding an empty cart.
    #[must_use]
    pub fn new(gateway: Arc<dyn RemoteGateway>, notices: NoticeQueue) -> Self {
        let (state, _) = watch::channel(CartSnapshot::default());
        Self {
            gateway,
            state,
            notices,
        }
    }

    /// Current cart and loading flag.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.state.borrow().clone()
    }

    /// Current cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.state.borrow().cart.clone()
    }

    /// Whether a remote call is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Watch cart changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.state.subscribe()
    }

    /// Notices raised by cart operations.
    #[must_use]
    pub const fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    /// Fetch the remote cart and replace the local one.
    ///
    /// On failure the last known cart is kept. Returns whether the cart was
    /// replaced.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        self.notices.clear(NoticeKind::Error);
        let _loading = Loading::start(&self.state);

        match self.gateway.cart().await {
            Ok(body) => {
                self.replace(&body);
                true
            }
            Err(e) => {
                self.report(&e, REFRESH_FAILED);
                false
            }
        }
    }

    /// Add `quantity` of `product` to the remote cart.
    ///
    /// Quantities below one are sent as one. The local cart only changes once
    /// the backend confirms. Returns whether the line was added.
    #[instrument(skip(self, product), fields(product = %product))]
    pub async fn add_line(&self, product: &ProductRef, quantity: i64) -> bool {
        self.notices.clear(NoticeKind::Error);
        self.notices.clear(NoticeKind::Success);

        let quantity = coerce_quantity(quantity);
        let _loading = Loading::start(&self.state);

        match self.gateway.add_to_cart(product, quantity).await {
            Ok(body) => {
                self.replace(&body);
                info!(quantity, "Added to cart");
                self.notices.push(NoticeKind::Success, ADDED);
                true
            }
            Err(e) => {
                self.report(&e, ADD_FAILED);
                false
            }
        }
    }

    /// Empty the remote cart.
    ///
    /// On success the local cart is reset to empty without waiting for a
    /// refresh. Returns whether the cart was emptied.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> bool {
        self.notices.clear(NoticeKind::Error);
        let _loading = Loading::start(&self.state);

        match self.gateway.clear_cart().await {
            Ok(()) => {
                self.state.send_modify(|state| state.cart = Cart::empty());
                info!("Cart emptied");
                self.notices.push(NoticeKind::Success, CLEARED);
                true
            }
            Err(e) => {
                self.report(&e, CLEAR_FAILED);
                false
            }
        }
    }

    fn replace(&self, body: &Value) {
        let cart = normalize_cart(body);
        debug!(lines = cart.lines.len(), total = %cart.total, "Cart replaced");
        self.state.send_modify(|state| state.cart = cart);
    }

    fn report(&self, error: &GatewayError, fallback: &str) {
        warn!(error = %error, "Cart request failed");
        let message = error
            .messages()
            .first()
            .cloned()
            .unwrap_or_else(|| fallback.to_string());
        self.notices.push(NoticeKind::Error, message);
    }
}

/// Clamp a requested quantity into `1..=u32::MAX`.
fn coerce_quantity(quantity: i64) -> u32 {
    if quantity < 1 {
        return 1;
    }
    u32::try_from(quantity).unwrap_or(u32::MAX)
}

/// Holds `loading` raised until dropped.
struct Loading<'a> {
    state: &'a watch::Sender<CartSnapshot>,
}

impl<'a> Loading<'a> {
    fn start(state: &'a watch::Sender<CartSnapshot>) -> Self {
        state.send_modify(|state| state.loading = true);
        Self { state }
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|state| state.loading = false);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::gateway::mock::{Endpoint, MockGateway};

    fn fixture() -> (Arc<MockGateway>, CartSynchronizer) {
        let gateway = Arc::new(MockGateway::new());
        let sync = CartSynchronizer::new(gateway.clone(), NoticeQueue::new(Duration::from_secs(4)));
        (gateway, sync)
    }

    fn message(sync: &CartSynchronizer, kind: NoticeKind) -> Option<String> {
        sync.notices().get(kind).map(|n| n.message)
    }

    fn two_line_cart() -> Value {
        json!({
            "items": [
                {"producto": "p1", "cantidad": 3, "precio": 10.5},
                {"producto": "p2", "cantidad": 1, "precio": 4}
            ]
        })
    }

    #[tokio::test]
    async fn test_refresh_replaces_cart() {
        let (gateway, sync) = fixture();
        gateway.respond_ok(Endpoint::Cart, two_line_cart());

        assert!(sync.refresh().await);
        let cart = sync.cart();
        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.total, Decimal::new(355, 1));
        assert!(!sync.is_loading());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_known_good() {
        let (gateway, sync) = fixture();
        gateway
            .respond_ok(Endpoint::Cart, two_line_cart())
            .respond_status(Endpoint::Cart, 500, &[]);

        sync.refresh().await;
        let before = sync.cart();

        assert!(!sync.refresh().await);
        assert_eq!(sync.cart(), before);
        assert_eq!(message(&sync, NoticeKind::Error).as_deref(), Some(REFRESH_FAILED));
        assert!(!sync.is_loading());
    }

    #[tokio::test]
    async fn test_add_line_coerces_quantity() {
        for (requested, sent) in [(0, 1), (-3, 1), (1, 1), (5, 5), (i64::MAX, u32::MAX)] {
            let (gateway, sync) = fixture();
            gateway.respond_ok(Endpoint::AddToCart, json!({"items": []}));

            sync.add_line(&ProductRef::new("p1"), requested).await;
            let calls = gateway.calls_to(Endpoint::AddToCart);
            assert_eq!(
                calls[0].payload,
                json!({"productoId": "p1", "cantidad": sent}),
                "requested {requested}"
            );
        }
    }

    #[tokio::test]
    async fn test_add_line_success() {
        let (gateway, sync) = fixture();
        gateway.respond_ok(Endpoint::AddToCart, two_line_cart());

        assert!(sync.add_line(&ProductRef::new("p1"), 3).await);
        assert_eq!(sync.cart().item_count(), 4);
        assert_eq!(message(&sync, NoticeKind::Success).as_deref(), Some(ADDED));
        assert_eq!(message(&sync, NoticeKind::Error), None);
    }

    #[tokio::test]
    async fn test_add_line_failure_is_not_optimistic() {
        let (gateway, sync) = fixture();
        gateway
            .respond_ok(Endpoint::Cart, two_line_cart())
            .respond_status(Endpoint::AddToCart, 400, &["Sin stock", "Otro"]);

        sync.refresh().await;
        let before = sync.cart();

        assert!(!sync.add_line(&ProductRef::new("p3"), 1).await);
        assert_eq!(sync.cart(), before);
        assert_eq!(message(&sync, NoticeKind::Error).as_deref(), Some("Sin stock"));
        assert_eq!(message(&sync, NoticeKind::Success), None);
    }

    #[tokio::test]
    async fn test_clear_resets_without_refresh() {
        let (gateway, sync) = fixture();
        gateway
            .respond_ok(Endpoint::Cart, two_line_cart())
            .respond_ok(Endpoint::ClearCart, Value::Null);

        sync.refresh().await;
        assert!(sync.clear().await);
        assert!(sync.cart().is_empty());
        assert_eq!(sync.cart().total, Decimal::ZERO);
        assert_eq!(message(&sync, NoticeKind::Success).as_deref(), Some(CLEARED));
        assert_eq!(gateway.calls_to(Endpoint::Cart).len(), 1);
    }

    #[tokio::test]
    async fn test_clear_failure_keeps_cart() {
        let (gateway, sync) = fixture();
        gateway
            .respond_ok(Endpoint::Cart, two_line_cart())
            .respond_status(Endpoint::ClearCart, 503, &[]);

        sync.refresh().await;
        assert!(!sync.clear().await);
        assert_eq!(sync.cart().lines.len(), 2);
        assert_eq!(message(&sync, NoticeKind::Error).as_deref(), Some(CLEAR_FAILED));
    }

    #[tokio::test]
    async fn test_error_notice_cleared_on_next_operation() {
        let (gateway, sync) = fixture();
        gateway
            .respond_status(Endpoint::Cart, 500, &[])
            .respond_ok(Endpoint::Cart, two_line_cart());

        sync.refresh().await;
        assert!(message(&sync, NoticeKind::Error).is_some());

        sync.refresh().await;
        assert_eq!(message(&sync, NoticeKind::Error), None);
    }

    #[tokio::test]
    async fn test_loading_raised_while_in_flight_and_lowered_on_drop() {
        let (gateway, sync) = fixture();
        gateway.stall(Endpoint::Cart);

        let mut refresh = Box::pin(sync.refresh());
        tokio::select! {
            biased;
            _ = refresh.as_mut() => panic!("stalled call completed"),
            () = std::future::ready(()) => {}
        }
        assert!(sync.is_loading());

        // Abandoning the call mid-flight must not leave the flag stuck.
        drop(refresh);
        assert!(!sync.is_loading());
        assert!(sync.cart().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_replacement() {
        let (gateway, sync) = fixture();
        let mut rx = sync.subscribe();
        gateway.respond_ok(Endpoint::Cart, two_line_cart());

        sync.refresh().await;
        assert!(rx.has_changed().expect("alive"));
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.cart.lines.len(), 2);
        assert!(!snapshot.loading);
    }

    #[test]
    fn test_coerce_quantity() {
        assert_eq!(coerce_quantity(i64::MIN), 1);
        assert_eq!(coerce_quantity(0), 1);
        assert_eq!(coerce_quantity(7), 7);
        assert_eq!(coerce_quantity(i64::from(u32::MAX) + 1), u32::MAX);
    }
}
