//! Storefront service object.
//!
//! Wires one gateway into a [`SessionStore`] and a [`CartSynchronizer`] and
//! hosts the order flow, which spans both. Cloning is cheap; clones share
//! state.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, instrument, warn};

use tienda_core::{OrderId, PaymentMethod};

use crate::cart::CartSynchronizer;
use crate::config::{ClientConfig, ConfigError};
use crate::credential::{CredentialStore, FileCredentialStore};
use crate::gateway::{GatewayError, HttpGateway, RemoteGateway};
use crate::guard::{Access, AccessRequirement, guard};
use crate::notice::NoticeQueue;
use crate::order::{OrderError, OrderRequest, ShippingAddress};
use crate::session::SessionStore;

/// Errors building a storefront.
#[derive(Debug, thiserror::Error)]
pub enum StorefrontError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Session, cart and order operations over one backend.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    gateway: Arc<dyn RemoteGateway>,
    session: SessionStore,
    cart: CartSynchronizer,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("session", &self.inner.session)
            .field("cart", &self.inner.cart)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Assemble a storefront. Session and cart each get their own notices.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        credentials: Arc<dyn CredentialStore>,
        notice_ttl: Duration,
    ) -> Self {
        let session = SessionStore::new(
            Arc::clone(&gateway),
            credentials,
            NoticeQueue::new(notice_ttl),
        );
        let cart = CartSynchronizer::new(Arc::clone(&gateway), NoticeQueue::new(notice_ttl));

        Self {
            inner: Arc::new(StorefrontInner {
                gateway,
                session,
                cart,
            }),
        }
    }

    /// Storefront over HTTP with a file-backed credential.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Gateway` if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, StorefrontError> {
        let gateway = HttpGateway::new(config)?;
        let credentials = FileCredentialStore::new(config.credential_file.clone());
        Ok(Self::new(
            Arc::new(gateway),
            Arc::new(credentials),
            config.notice_ttl,
        ))
    }

    /// Storefront configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError` if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn from_env() -> Result<Self, StorefrontError> {
        let config = ClientConfig::from_env()?;
        Self::from_config(&config)
    }

    /// Restore the session, then load the cart.
    #[instrument(skip(self))]
    pub async fn start(&self) {
        let status = self.inner.session.restore().await;
        info!(?status, "Session settled");
        self.inner.cart.refresh().await;
    }

    /// The session store.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// The cart synchronizer.
    #[must_use]
    pub fn cart(&self) -> &CartSynchronizer {
        &self.inner.cart
    }

    /// Order everything in the cart.
    ///
    /// Requires a signed-in session. After the backend accepts the order the
    /// cart is emptied and reloaded. Returns the new order's id when the
    /// backend reports one.
    ///
    /// # Errors
    ///
    /// `OrderError::Validation` if the session, cart or address cannot be
    /// ordered; `OrderError::Remote` if the backend rejects the order.
    #[instrument(skip(self, address))]
    pub async fn place_order(
        &self,
        address: &ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<Option<OrderId>, OrderError> {
        if guard(&self.inner.session.snapshot(), AccessRequirement::SignedIn) != Access::Granted {
            return Err(OrderError::Validation(
                "Sign in to place an order".to_string(),
            ));
        }

        let cart = self.inner.cart.cart();
        let order = OrderRequest::from_cart(&cart, address, payment_method)?;

        let body = self
            .inner
            .gateway
            .create_order(&order)
            .await
            .inspect_err(|e| warn!(error = %e, "Order rejected"))?;
        let id = order_id(&body);
        info!(order = ?id, total = %order.total, "Order placed");

        self.inner.cart.clear().await;
        self.inner.cart.refresh().await;

        Ok(id)
    }
}

/// The created order's id, from the body or its `pedido` envelope.
fn order_id(body: &Value) -> Option<OrderId> {
    let order = body.get("pedido").filter(|v| v.is_object()).unwrap_or(body);
    ["_id", "id"]
        .iter()
        .find_map(|key| order.get(*key).and_then(Value::as_str))
        .filter(|id| !id.is_empty())
        .map(OrderId::from)
}
