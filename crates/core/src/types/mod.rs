//! Core types for Tienda.
//!
//! This module provides the canonical shapes that the client keeps locally,
//! independent of how the remote API happens to spell them.

pub mod cart;
pub mod id;
pub mod identity;
pub mod notice;
pub mod price;
pub mod status;

pub use cart::{Cart, CartLine};
pub use id::*;
pub use identity::Identity;
pub use notice::{Notice, NoticeKind};
pub use price::{format_mxn, line_subtotal};
pub use status::*;
