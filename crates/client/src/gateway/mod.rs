//! Remote gateway: the backend's auth, cart and order endpoints.
//!
//! # Architecture
//!
//! - [`RemoteGateway`] is the seam between the synchronization layer and the
//!   network. Session and cart logic only ever talk to this trait.
//! - [`HttpGateway`] is the production implementation over `reqwest`.
//! - `mock::MockGateway` (tests, or the `mock` feature) replays scripted
//!   responses and records every call.
//!
//! Payloads are returned as raw JSON because the backend is loosely typed;
//! [`crate::normalize`] turns them into canonical shapes.
//!
//! The gateway owns credential transport: once the session store hands it a
//! credential via [`RemoteGateway::set_credential`], every outgoing call
//! carries it as a bearer token.

mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use http::HttpGateway;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use thiserror::Error;

use tienda_core::ProductRef;

use crate::credential::Credential;
use crate::order::OrderRequest;

/// Errors that can occur when calling the remote API.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The request never produced a response (connection, timeout, TLS).
    #[error("Request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {}", format_messages(.messages))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Messages from the body's `message` field.
        messages: Vec<String>,
    },

    /// The response body could not be decoded.
    #[error("Response error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Messages the backend attached to a failed response.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        match self {
            Self::Status { messages, .. } => messages,
            Self::Request(_) | Self::Decode(_) => &[],
        }
    }

    /// Whether the backend rejected the credential.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

fn format_messages(messages: &[String]) -> String {
    if messages.is_empty() {
        "(no error details provided)".to_string()
    } else {
        messages.join("; ")
    }
}

/// Pull the human-readable messages out of an error body.
///
/// The backend sends `message` either as a single string or as a list of
/// strings (one per failed validation). Anything else yields no messages.
#[must_use]
pub fn extract_messages(body: &Value) -> Vec<String> {
    match body.get("message") {
        Some(Value::String(message)) if !message.trim().is_empty() => vec![message.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|message| !message.trim().is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Sign-in form data.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub email: String,
    pub password: SecretString,
    /// Anti-bot challenge token, when the view collected one.
    pub captcha: Option<String>,
}

/// Sign-up form data.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    pub password: SecretString,
}

/// The backend operations the synchronization layer consumes.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Replace the credential attached to subsequent calls.
    fn set_credential(&self, credential: Option<Credential>);

    /// `POST /auth/register`
    async fn register(&self, profile: &SignUp) -> Result<Value, GatewayError>;

    /// `POST /auth/login`
    async fn login(&self, credentials: &SignIn) -> Result<Value, GatewayError>;

    /// `POST /auth/logout`
    async fn logout(&self) -> Result<(), GatewayError>;

    /// `GET /auth/profile`
    async fn profile(&self) -> Result<Value, GatewayError>;

    /// `GET /carrito`
    async fn cart(&self) -> Result<Value, GatewayError>;

    /// `POST /carrito/agregar`
    async fn add_to_cart(&self, product: &ProductRef, quantity: u32)
    -> Result<Value, GatewayError>;

    /// `DELETE /carrito/limpiar`
    async fn clear_cart(&self) -> Result<(), GatewayError>;

    /// `POST /pedidos`
    async fn create_order(&self, order: &OrderRequest) -> Result<Value, GatewayError>;
}
