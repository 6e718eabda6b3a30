//! Newtype keys for type-safe entity references.
//!
//! Every record in the realtime store lives under a string key. Use the
//! `define_id!` macro to create wrappers that prevent accidentally mixing
//! keys from different collections.

use thiserror::Error;

/// Maximum length of a single store key, in bytes.
pub const MAX_KEY_LENGTH: usize = 768;

/// Characters the realtime store refuses inside a key.
pub const FORBIDDEN_KEY_CHARS: &[char] = &['.', '#', '$', '[', ']', '/'];

/// Errors that can occur when parsing a store key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The key is empty.
    #[error("key cannot be empty")]
    Empty,
    /// The key is longer than the store allows.
    #[error("key must be at most {max} bytes")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The key contains a character the store reserves.
    #[error("key cannot contain '{0}'")]
    ForbiddenChar(char),
}

/// Validate a single store key segment.
///
/// # Errors
///
/// Returns `KeyError` if the key is empty, too long, or contains a reserved
/// character or a control character.
pub fn validate_key(key: &str) -> Result<(), KeyError> {
    if key.is_empty() {
        return Err(KeyError::Empty);
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(KeyError::TooLong {
            max: MAX_KEY_LENGTH,
        });
    }
    if let Some(c) = key
        .chars()
        .find(|c| FORBIDDEN_KEY_CHARS.contains(c) || c.is_control())
    {
        return Err(KeyError::ForbiddenChar(c));
    }
    Ok(())
}

/// Macro to define a type-safe key wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `new()` (unchecked), `parse()` (validated), `as_str()`
/// - `Display`, `AsRef<str>` and `From<&str>`/`From<String>`
///
/// # Example
///
/// ```rust
/// # use droidshop_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new("u1");
/// let order_id = OrderId::new("u1");
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// assert_eq!(user_id.as_str(), order_id.as_str());
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
            /// Wrap a key that is already known to be valid (e.g. read back from the store).
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Parse an untrusted key, such as a URL path segment.
            ///
            /// # Errors
            ///
            /// Returns `KeyError` if the key would be rejected by the store.
            pub fn parse(id: &str) -> ::core::result::Result<Self, $crate::types::id::KeyError> {
                $crate::types::id::validate_key(id)?;
                Ok(Self(id.to_owned()))
            }

            /// Get the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
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
    };
}

// Store keys, one per collection
define_id!(UserId);
define_id!(ProductId);
define_id!(OrderId);

impl OrderId {
    /// Short reference shown to humans: the last five characters of the key.
    ///
    /// Push keys start with a timestamp, so the tail is the random part and
    /// the most distinctive.
    #[must_use]
    pub fn short(&self) -> &str {
        let start = self
            .0
            .char_indices()
            .rev()
            .nth(4)
            .map_or(0, |(index, _)| index);
        self.0.get(start..).unwrap_or(&self.0)
    }
}
