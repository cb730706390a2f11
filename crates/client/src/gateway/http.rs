//! `reqwest` implementation of the remote gateway.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use tienda_core::ProductRef;

use super::{GatewayError, RemoteGateway, SignIn, SignUp, extract_messages};
use crate::config::ClientConfig;
use crate::credential::Credential;
use crate::order::OrderRequest;

/// How much of an unexpected response body to keep in logs.
const LOG_BODY_LIMIT: usize = 500;

/// Client for the storefront backend's REST API.
///
/// Cheap to clone; clones share the HTTP connection pool and the attached
/// credential.
#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<HttpGatewayInner>,
}

struct HttpGatewayInner {
    client: reqwest::Client,
    base_url: String,
    credential: RwLock<Option<Credential>>,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.inner.base_url)
            .field("credential", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    captcha: Option<&'a str>,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    nombre: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct AddToCartBody<'a> {
    #[serde(rename = "productoId")]
    producto_id: &'a str,
    cantidad: u32,
}

impl HttpGateway {
    /// Create a gateway from client configuration.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Request` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        Self::with_base_url(&config.api_base_url, config.request_timeout)
    }

    /// Create a gateway for an explicit base URL (e.g., `http://localhost:4000/api`).
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Request` if the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(HttpGatewayInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                credential: RwLock::new(None),
            }),
        })
    }

    /// The base URL paths are joined onto.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Start a request, attaching the bearer credential when one is set.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'));
        let builder = self.inner.client.request(method, url);

        let credential = self
            .inner
            .credential
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match credential.as_ref() {
            Some(credential) => builder.bearer_auth(credential.expose()),
            None => builder,
        }
    }

    /// Send a request and decode its JSON body.
    ///
    /// An empty body decodes to `Value::Null`. Non-success statuses become
    /// `GatewayError::Status` carrying the body's messages.
    async fn execute(&self, request: RequestBuilder, path: &str) -> Result<Value, GatewayError> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();

        // Get response body as text first for better error diagnostics
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str::<Value>(&text) {
                Ok(body) => body,
                Err(e) if status.is_success() => {
                    error!(
                        path,
                        error = %e,
                        body = %truncate(&text),
                        "Failed to parse backend response"
                    );
                    return Err(GatewayError::Decode(e.to_string()));
                }
                // Error pages are often HTML; the status alone is enough.
                Err(_) => Value::Null,
            }
        };

        if !status.is_success() {
            if status.is_server_error() {
                error!(status = %status, path, body = %truncate(&text), "Backend returned server error");
            } else {
                warn!(status = %status, path, "Backend rejected request");
            }
            return Err(GatewayError::Status {
                status: status.as_u16(),
                messages: extract_messages(&body),
            });
        }

        debug!(status = %status, path, "Backend call succeeded");
        Ok(body)
    }

    async fn send_empty(&self, method: Method, path: &str) -> Result<Value, GatewayError> {
        self.execute(self.request(method, path), path).await
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Value, GatewayError> {
        self.execute(self.request(method, path).json(body), path).await
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    fn set_credential(&self, credential: Option<Credential>) {
        *self
            .inner
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credential;
    }

    #[instrument(skip(self, profile), fields(email = %profile.email))]
    async fn register(&self, profile: &SignUp) -> Result<Value, GatewayError> {
        let body = RegisterBody {
            nombre: &profile.name,
            email: &profile.email,
            password: profile.password.expose_secret(),
        };
        self.send_json(Method::POST, "auth/register", &body).await
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn login(&self, credentials: &SignIn) -> Result<Value, GatewayError> {
        let body = LoginBody {
            email: &credentials.email,
            password: credentials.password.expose_secret(),
            captcha: credentials.captcha.as_deref(),
        };
        self.send_json(Method::POST, "auth/login", &body).await
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<(), GatewayError> {
        self.send_empty(Method::POST, "auth/logout").await.map(drop)
    }

    #[instrument(skip(self))]
    async fn profile(&self) -> Result<Value, GatewayError> {
        self.send_empty(Method::GET, "auth/profile").await
    }

    #[instrument(skip(self))]
    async fn cart(&self) -> Result<Value, GatewayError> {
        self.send_empty(Method::GET, "carrito").await
    }

    #[instrument(skip(self, product), fields(product = %product))]
    async fn add_to_cart(
        &self,
        product: &ProductRef,
        quantity: u32,
    ) -> Result<Value, GatewayError> {
        let body = AddToCartBody {
            producto_id: product.as_str(),
            cantidad: quantity,
        };
        self.send_json(Method::POST, "carrito/agregar", &body).await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), GatewayError> {
        self.send_empty(Method::DELETE, "carrito/limpiar")
            .await
            .map(drop)
    }

    #[instrument(skip(self, order), fields(lines = order.items.len()))]
    async fn create_order(&self, order: &OrderRequest) -> Result<Value, GatewayError> {
        self.send_json(Method::POST, "pedidos", order).await
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(LOG_BODY_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let gateway =
            HttpGateway::with_base_url("http://localhost:4000/api/", Duration::from_secs(5))
                .expect("gateway");
        assert_eq!(gateway.base_url(), "http://localhost:4000/api");
    }

    #[test]
    fn test_debug_redacts_credential() {
        let gateway = HttpGateway::with_base_url("http://localhost:4000/api", Duration::from_secs(5))
            .expect("gateway");
        gateway.set_credential(Some(Credential::new("very-secret")));
        let debug = format!("{gateway:?}");
        assert!(!debug.contains("very-secret"));
    }

    #[test]
    fn test_add_to_cart_body_uses_backend_field_names() {
        let body = AddToCartBody {
            producto_id: "p1",
            cantidad: 2,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json, serde_json::json!({"productoId": "p1", "cantidad": 2}));
    }

    #[test]
    fn test_login_body_omits_missing_captcha() {
        let body = LoginBody {
            email: "ana@example.com",
            password: "hunter22",
            captcha: None,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert!(json.get("captcha").is_none());
    }
}
