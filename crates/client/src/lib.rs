//! Tienda Client - session and cart synchronization for the storefront.
//!
//! Keeps local UI state consistent with the backend's auth and cart
//! endpoints, which are slow, fallible, and loosely typed.
//!
//! # Architecture
//!
//! - [`gateway`] - The remote API boundary (`RemoteGateway` trait, reqwest implementation)
//! - [`session`] - Credential lifecycle, restoration on startup, role derivation
//! - [`cart`] - Canonical cart, serialized mutations, last-known-good on failure
//! - [`normalize`] - Pure conversion of inconsistent payloads into canonical shapes
//! - [`notice`] - Auto-expiring error/success notices, one per kind
//! - [`storefront`] - Service object wiring the above together for a view layer
//!
//! # Example
//!
//! ```rust,ignore
//! use tienda_client::{ClientConfig, Storefront};
//!
//! let config = ClientConfig::from_env()?;
//! let storefront = Storefront::from_config(&config)?;
//! storefront.start().await;
//!
//! if storefront.session().snapshot().can_purchase() {
//!     storefront.cart().add_line(&"665f1c0e9b1e8a0012345678".into(), 2).await;
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod credential;
pub mod gateway;
pub mod guard;
pub mod normalize;
pub mod notice;
pub mod order;
pub mod session;
pub mod storefront;

pub use cart::{CartSnapshot, CartSynchronizer};
pub use config::{ClientConfig, ConfigError};
pub use credential::{
    Credential, CredentialStore, CredentialStoreError, FileCredentialStore, MemoryCredentialStore,
};
pub use gateway::{GatewayError, HttpGateway, RemoteGateway, SignIn, SignUp};
pub use guard::{Access, AccessRequirement, guard};
pub use notice::{NoticeBoard, NoticeQueue};
pub use order::{OrderError, OrderItem, OrderRequest, ShippingAddress};
pub use session::{SessionSnapshot, SessionStore};
pub use storefront::{Storefront, StorefrontError};
