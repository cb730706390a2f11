//! End-to-end test support for the Tienda client.
//!
//! [`FakeBackend`] serves the storefront API (`/api/auth/*`, `/api/carrito*`,
//! `/api/pedidos`) from memory on an ephemeral local port, shaped like the
//! real backend: populated cart lines without subtotals, a zero `total`,
//! `message` as either a string or a list. Tests point a real
//! [`tienda_client::Storefront`] at it over HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tienda-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use tienda_client::{ClientConfig, ConfigError};
use tokio::task::JoinHandle;

/// A request as the backend received it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    /// Token from the `Authorization: Bearer` header.
    pub bearer: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
struct User {
    id: String,
    name: String,
    email: String,
    password: String,
    role: String,
}

impl User {
    fn to_json(&self) -> Value {
        json!({"_id": self.id, "nombre": self.name, "email": self.email, "tipo": self.role})
    }
}

#[derive(Debug, Clone)]
struct Product {
    name: String,
    price: f64,
}

#[derive(Debug, Default)]
struct Store {
    users: HashMap<String, User>,
    tokens: HashMap<String, String>,
    products: HashMap<String, Product>,
    carts: HashMap<String, Vec<(String, u64)>>,
    orders: Vec<Value>,
    requests: Vec<Recorded>,
    next_id: u64,
    fail_logout: bool,
}

impl Store {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:04}", self.next_id)
    }

    fn issue_token(&mut self, email: &str) -> String {
        let token = self.next_id("tok-");
        self.tokens.insert(token.clone(), email.to_string());
        token
    }

    fn user_for(&self, bearer: Option<&str>) -> Option<&User> {
        let email = self.tokens.get(bearer?)?;
        self.users.get(email)
    }

    fn cart_json(&self, email: &str) -> Value {
        let items: Vec<Value> = self
            .carts
            .get(email)
            .into_iter()
            .flatten()
            .filter_map(|(product_id, quantity)| {
                let product = self.products.get(product_id)?;
                Some(json!({
                    "producto": {"_id": product_id, "nombre": product.name, "precio": product.price},
                    "cantidad": quantity
                }))
            })
            .collect();
        // The real backend does not keep the total up to date.
        json!({"items": items, "total": 0})
    }
}

type Shared = Arc<Mutex<Store>>;

/// In-memory storefront backend listening on `127.0.0.1`.
pub struct FakeBackend {
    addr: SocketAddr,
    store: Shared,
    task: JoinHandle<()>,
}

impl FakeBackend {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let store = Shared::default();

        let app = Router::new()
            .route("/api/auth/register", post(register))
            .route("/api/auth/login", post(login))
            .route("/api/auth/logout", post(logout))
            .route("/api/auth/profile", get(profile))
            .route("/api/carrito", get(cart))
            .route("/api/carrito/agregar", post(add_to_cart))
            .route("/api/carrito/limpiar", delete(clear_cart))
            .route("/api/pedidos", post(create_order))
            .with_state(Arc::clone(&store));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("Failed to bind fake backend: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("Fake backend has no address: {e}"));

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, store, task }
    }

    /// `http://127.0.0.1:<port>`
    #[must_use]
    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this backend, keeping the credential
    /// under `dir`.
    ///
    /// # Errors
    ///
    /// Never in practice; the origin is always a valid URL.
    pub fn config(&self, dir: &Path) -> Result<ClientConfig, ConfigError> {
        ClientConfig::for_origin(&self.origin(), dir.join("credentials.json"))
    }

    /// Register an account directly. `role` is the raw `tipo` value.
    pub fn add_user(&self, email: &str, password: &str, name: &str, role: &str) {
        let mut store = self.store();
        let id = store.next_id("u-");
        store.users.insert(
            email.to_string(),
            User {
                id,
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                role: role.to_string(),
            },
        );
    }

    /// Add a product to the catalog.
    pub fn add_product(&self, id: &str, name: &str, price: f64) {
        self.store().products.insert(
            id.to_string(),
            Product {
                name: name.to_string(),
                price,
            },
        );
    }

    /// Invalidate every issued token, as if they had all expired.
    pub fn expire_tokens(&self) {
        self.store().tokens.clear();
    }

    /// Make `POST /auth/logout` answer 500.
    pub fn fail_logout(&self) {
        self.store().fail_logout = true;
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        self.store().requests.clone()
    }

    /// Requests received for `path` (without the `/api` prefix).
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        let path = format!("/api/{}", path.trim_start_matches('/'));
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }

    /// Orders created so far, as received.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.store().orders.clone()
    }

    /// Server-side cart of `email` as `(product id, quantity)` pairs.
    #[must_use]
    pub fn cart_of(&self, email: &str) -> Vec<(String, u64)> {
        self.store().carts.get(email).cloned().unwrap_or_default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        lock(&self.store)
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn lock(store: &Shared) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn record(store: &mut Store, method: Method, uri: &Uri, headers: &HeaderMap, body: Value) {
    store.requests.push(Recorded {
        method,
        path: uri.path().to_string(),
        bearer: bearer(headers),
        body,
    });
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn unauthorized() -> Response {
    reply(StatusCode::UNAUTHORIZED, json!({"message": "No autorizado"}))
}

fn text<'a>(body: &'a Value, key: &str) -> &'a str {
    body.get(key).and_then(Value::as_str).unwrap_or_default()
}

async fn register(
    State(store): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut store = lock(&store);
    record(&mut store, method, &uri, &headers, body.clone());

    let (name, email, password) = (text(&body, "nombre"), text(&body, "email"), text(&body, "password"));

    let mut problems = Vec::new();
    if name.trim().is_empty() {
        problems.push("El nombre es obligatorio");
    }
    if !email.contains('@') {
        problems.push("El email no es válido");
    }
    if password.len() < 6 {
        problems.push("La contraseña debe tener al menos 6 caracteres");
    }
    if !problems.is_empty() {
        return reply(StatusCode::BAD_REQUEST, json!({"message": problems}));
    }
    if store.users.contains_key(email) {
        return reply(
            StatusCode::CONFLICT,
            json!({"message": "El email ya está registrado"}),
        );
    }

    let user = User {
        id: store.next_id("u-"),
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        role: "cliente".to_string(),
    };
    store.users.insert(user.email.clone(), user.clone());
    let token = store.issue_token(&user.email);

    reply(StatusCode::CREATED, json!({"token": token, "user": user.to_json()}))
}

async fn login(
    State(store): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut store = lock(&store);
    record(&mut store, method, &uri, &headers, body.clone());

    let user = store
        .users
        .get(text(&body, "email"))
        .filter(|user| user.password == text(&body, "password"))
        .cloned();

    let Some(user) = user else {
        return reply(
            StatusCode::UNAUTHORIZED,
            json!({"message": ["Credenciales inválidas"]}),
        );
    };

    let token = store.issue_token(&user.email);
    reply(StatusCode::OK, json!({"token": token, "user": user.to_json()}))
}

async fn logout(
    State(store): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let mut store = lock(&store);
    record(&mut store, method, &uri, &headers, Value::Null);

    if store.fail_logout {
        return reply(StatusCode::INTERNAL_SERVER_ERROR, json!({}));
    }
    if let Some(token) = bearer(&headers) {
        store.tokens.remove(&token);
    }
    reply(StatusCode::OK, json!({"message": "Sesión cerrada"}))
}

async fn profile(
    State(store): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let mut store = lock(&store);
    record(&mut store, method, &uri, &headers, Value::Null);

    match store.user_for(bearer(&headers).as_deref()) {
        Some(user) => reply(StatusCode::OK, json!({"user": user.to_json()})),
        None => unauthorized(),
    }
}

async fn cart(
    State(store): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let mut store = lock(&store);
    record(&mut store, method, &uri, &headers, Value::Null);

    let Some(email) = store
        .user_for(bearer(&headers).as_deref())
        .map(|user| user.email.clone())
    else {
        return unauthorized();
    };
    reply(StatusCode::OK, store.cart_json(&email))
}

async fn add_to_cart(
    State(store): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut store = lock(&store);
    record(&mut store, method, &uri, &headers, body.clone());

    let Some(email) = store
        .user_for(bearer(&headers).as_deref())
        .map(|user| user.email.clone())
    else {
        return unauthorized();
    };

    let product_id = text(&body, "productoId").to_string();
    if !store.products.contains_key(&product_id) {
        return reply(
            StatusCode::NOT_FOUND,
            json!({"message": ["Producto no encontrado"]}),
        );
    }
    let Some(quantity) = body.get("cantidad").and_then(Value::as_u64).filter(|q| *q > 0) else {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"message": ["La cantidad debe ser mayor a 0"]}),
        );
    };

    let lines = store.carts.entry(email.clone()).or_default();
    match lines.iter_mut().find(|(id, _)| *id == product_id) {
        Some((_, existing)) => *existing += quantity,
        None => lines.push((product_id, quantity)),
    }

    reply(StatusCode::OK, store.cart_json(&email))
}

async fn clear_cart(
    State(store): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let mut store = lock(&store);
    record(&mut store, method, &uri, &headers, Value::Null);

    let Some(email) = store
        .user_for(bearer(&headers).as_deref())
        .map(|user| user.email.clone())
    else {
        return unauthorized();
    };
    store.carts.remove(&email);
    reply(StatusCode::OK, json!({"message": "Carrito vaciado"}))
}

async fn create_order(
    State(store): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut store = lock(&store);
    record(&mut store, method, &uri, &headers, body.clone());

    if store.user_for(bearer(&headers).as_deref()).is_none() {
        return unauthorized();
    }
    let has_items = body
        .get("items")
        .and_then(Value::as_array)
        .is_some_and(|items| !items.is_empty());
    if !has_items {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"message": ["El pedido no tiene productos"]}),
        );
    }

    let id = store.next_id("o-");
    let mut order = body;
    if let Some(fields) = order.as_object_mut() {
        fields.insert("_id".to_string(), json!(id));
        fields.insert("estado".to_string(), json!("pendiente"));
    }
    store.orders.push(order.clone());

    reply(StatusCode::CREATED, json!({"pedido": order}))
}
