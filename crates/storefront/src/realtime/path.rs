//! Validated paths into the realtime store tree.

use std::fmt;

use droidshop_core::validate_key;

use super::StoreError;

/// A path into the store, e.g. `carts/{uid}/{pid}`.
///
/// Every segment is a valid store key, so a path never contains empty
/// segments or reserved characters. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root of the tree.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Build a path from individual keys.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if any key is rejected by the store.
    pub fn new<I, S>(segments: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        segments
            .into_iter()
            .try_fold(Self::root(), |path, segment| path.child(segment.as_ref()))
    }

    /// Parse a slash-separated path. Leading, trailing and repeated slashes
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if any segment is rejected by the store.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        Self::new(path.split('/').filter(|segment| !segment.is_empty()))
    }

    /// Append one key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if the key is rejected by the store.
    pub fn child(mut self, key: &str) -> Result<Self, StoreError> {
        validate_key(key).map_err(|e| StoreError::InvalidPath(format!("{key:?}: {e}")))?;
        self.segments.push(key.to_owned());
        Ok(self)
    }

    /// The individual keys of this path.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last key, or `None` for the root.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` if `self` equals `prefix` or lies beneath it.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Returns `true` if a write at one path can change the value at the other.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.starts_with(other) || other.starts_with(self)
    }

    /// The keys of `self` below `base`, if `self` lies beneath it.
    #[must_use]
    pub fn strip_prefix(&self, base: &Self) -> Option<&[String]> {
        self.segments.strip_prefix(base.segments.as_slice())
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}
