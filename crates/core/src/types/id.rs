//! Newtype IDs for type-safe entity references.
//!
//! The REST API hands out opaque identifiers. Some backends emit them as JSON
//! strings, others as integers; every ID type here accepts both and always
//! serializes back as a string.

use serde::Deserialize;

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` as a plain string, `Deserialize` from a string or an integer
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `AsRef<str>` implementations
///
/// # Example
///
/// ```rust
/// # use bazaar_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new("u-1");
/// let order_id = OrderId::new("u-1");
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// # let _ = (user_id, order_id);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
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

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                $crate::types::id::RawId::deserialize(deserializer).map(|raw| Self(raw.into()))
            }
        }
    };
}

/// Wire representation accepted for any ID: a string or an integer.
#[doc(hidden)]
#[derive(Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Signed(n) => n.to_string(),
            RawId::Unsigned(n) => n.to_string(),
        }
    }
}

// Define standard entity IDs
define_id!(UserId);
define_id!(ProductId);
define_id!(CartLineId);
define_id!(WishlistEntryId);
define_id!(NotificationId);
define_id!(OrderId);
define_id!(AddressId);
define_id!(CategoryId);
define_id!(BrandId);
define_id!(CouponId);
define_id!(ReviewId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_accepts_string_and_integer() {
        let from_text: ProductId = serde_json::from_str("\"prod-1\"").unwrap();
        assert_eq!(from_text.as_str(), "prod-1");

        let from_number: ProductId = serde_json::from_str("42").unwrap();
        assert_eq!(from_number, ProductId::new("42"));
    }

    #[test]
    fn test_id_serializes_as_string() {
        let id = OrderId::from("ord-9");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ord-9\"");
    }

    #[test]
    fn test_id_display() {
        assert_eq!(UserId::new("u-7").to_string(), "u-7");
    }

    #[test]
    fn test_id_rejects_other_json() {
        assert!(serde_json::from_str::<CartLineId>("true").is_err());
        assert!(serde_json::from_str::<CartLineId>("{}").is_err());
    }
}
