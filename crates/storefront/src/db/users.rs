//! User profile repository.

use droidshop_core::UserId;

use super::{RepositoryError, collections, decode, encode, path};
use crate::models::User;
use crate::realtime::RealtimeStore;

/// Repository for `users/{uid}`.
pub struct UserRepository<'a> {
    store: &'a dyn RealtimeStore,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a dyn RealtimeStore) -> Self {
        Self { store }
    }

    /// Write the profile for `uid`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn create(&self, uid: &UserId, user: &User) -> Result<(), RepositoryError> {
        let path = path(collections::USERS, &[uid.as_str()])?;
        self.store.set(&path, encode(user)?).await?;
        Ok(())
    }

    /// Read the profile for `uid`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the read fails.
    /// Returns `RepositoryError::DataCorruption` if the record is malformed.
    pub async fn get(&self, uid: &UserId) -> Result<Option<User>, RepositoryError> {
        let path = path(collections::USERS, &[uid.as_str()])?;
        let snapshot = self.store.get(&path).await?;
        decode(&snapshot)
    }
}
