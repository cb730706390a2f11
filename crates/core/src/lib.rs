//! Tienda Core - Shared types library.
//!
//! This crate provides the canonical local model used across all Tienda
//! components:
//! - `client` - Session and cart synchronization against the remote API
//! - `cli` - Command-line storefront driving the client
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients, no timers. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Identifier newtypes, roles, identities, carts, notices and money

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
