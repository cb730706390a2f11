//! In-memory gateway for tests.
//!
//! `MockGateway` implements [`RemoteGateway`] without any network. Queue a
//! result per endpoint with [`MockGateway::respond`]; each call pops the
//! next one. An endpoint with nothing queued fails with a `Request` error, so
//! unexpected calls surface as failures instead of hanging.
//!
//! Every call is recorded together with the credential that was attached at
//! the time, which lets tests assert on what would have gone over the wire.
//!
//! [`MockGateway::stall`] makes an endpoint never answer, for observing
//! in-flight state and abandoned futures.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use tienda_core::ProductRef;

use super::{GatewayError, RemoteGateway, SignIn, SignUp};
use crate::credential::Credential;
use crate::order::OrderRequest;

/// Gateway endpoint, used to script and inspect calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Register,
    Login,
    Logout,
    Profile,
    Cart,
    AddToCart,
    ClearCart,
    CreateOrder,
}

/// A recorded gateway call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub endpoint: Endpoint,
    /// Credential attached when the call was issued.
    pub credential: Option<String>,
    /// Endpoint-specific details (request body as the backend would see it).
    pub payload: Value,
}

/// Scripted, call-recording gateway.
#[derive(Debug, Default)]
pub struct MockGateway {
    responses: Mutex<HashMap<Endpoint, VecDeque<Result<Value, GatewayError>>>>,
    calls: Mutex<Vec<Call>>,
    credential: Mutex<Option<Credential>>,
    stalled: Mutex<HashSet<Endpoint>>,
}

impl MockGateway {
    /// Create a gateway with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next result for `endpoint`.
    pub fn respond(&self, endpoint: Endpoint, result: Result<Value, GatewayError>) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(endpoint)
            .or_default()
            .push_back(result);
        self
    }

    /// Queue a successful response for `endpoint`.
    pub fn respond_ok(&self, endpoint: Endpoint, body: Value) -> &Self {
        self.respond(endpoint, Ok(body))
    }

    /// Queue an HTTP failure for `endpoint`.
    pub fn respond_status(&self, endpoint: Endpoint, status: u16, messages: &[&str]) -> &Self {
        self.respond(
            endpoint,
            Err(GatewayError::Status {
                status,
                messages: messages.iter().map(|m| (*m).to_string()).collect(),
            }),
        )
    }

    /// Make every later call to `endpoint` hang forever.
    pub fn stall(&self, endpoint: Endpoint) -> &Self {
        self.stalled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint);
        self
    }

    /// All calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Calls made to one endpoint.
    #[must_use]
    pub fn calls_to(&self, endpoint: Endpoint) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.endpoint == endpoint)
            .collect()
    }

    /// The credential currently attached.
    #[must_use]
    pub fn credential(&self) -> Option<String> {
        self.credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.expose().to_string())
    }

    async fn reply(&self, endpoint: Endpoint, payload: Value) -> Result<Value, GatewayError> {
        let credential = self.credential();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Call {
                endpoint,
                credential,
                payload,
            });

        let stalled = self
            .stalled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&endpoint);
        if stalled {
            std::future::pending::<()>().await;
        }

        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(GatewayError::Request(format!(
                    "no scripted response for {endpoint:?}"
                )))
            })
    }
}

#[async_trait]
impl RemoteGateway for MockGateway {
    fn set_credential(&self, credential: Option<Credential>) {
        *self
            .credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = credential;
    }

    async fn register(&self, profile: &SignUp) -> Result<Value, GatewayError> {
        self.reply(
            Endpoint::Register,
            serde_json::json!({"nombre": profile.name, "email": profile.email}),
        )
        .await
    }

    async fn login(&self, credentials: &SignIn) -> Result<Value, GatewayError> {
        self.reply(
            Endpoint::Login,
            serde_json::json!({"email": credentials.email, "captcha": credentials.captcha}),
        )
        .await
    }

    async fn logout(&self) -> Result<(), GatewayError> {
        self.reply(Endpoint::Logout, Value::Null).await.map(drop)
    }

    async fn profile(&self) -> Result<Value, GatewayError> {
        self.reply(Endpoint::Profile, Value::Null).await
    }

    async fn cart(&self) -> Result<Value, GatewayError> {
        self.reply(Endpoint::Cart, Value::Null).await
    }

    async fn add_to_cart(
        &self,
        product: &ProductRef,
        quantity: u32,
    ) -> Result<Value, GatewayError> {
        self.reply(
            Endpoint::AddToCart,
            serde_json::json!({"productoId": product.as_str(), "cantidad": quantity}),
        )
        .await
    }

    async fn clear_cart(&self) -> Result<(), GatewayError> {
        self.reply(Endpoint::ClearCart, Value::Null).await.map(drop)
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<Value, GatewayError> {
        let payload = serde_json::to_value(order).unwrap_or(Value::Null);
        self.reply(Endpoint::CreateOrder, payload).await
    }
}
