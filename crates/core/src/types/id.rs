//! Newtype IDs for type-safe entity references.
//!
//! The remote API identifies documents with opaque strings (usually 24-char
//! hex object ids). Use the `define_id!` macro to create wrappers that keep
//! product, user and order references from being mixed up.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `Display`, `From<String>` and `From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use tienda_core::define_id;
/// define_id!(ShelfId);
/// define_id!(AisleId);
///
/// let shelf = ShelfId::new("665f1c0e9b1e8a0012345678");
/// assert_eq!(shelf.as_str(), "665f1c0e9b1e8a0012345678");
///
/// // These are different types, so this won't compile:
/// // let _: AisleId = shelf;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert into the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Whether the remote sent an empty identifier.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(ProductRef);
define_id!(OrderId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_transparently() {
        let product = ProductRef::new("abc123");
        let json = serde_json::to_string(&product).expect("serialize");
        assert_eq!(json, "\"abc123\"");

        let back: ProductRef = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, product);
    }

    #[test]
    fn test_id_display_and_empty() {
        assert_eq!(UserId::from("u-1").to_string(), "u-1");
        assert!(OrderId::new("").is_empty());
    }
}
