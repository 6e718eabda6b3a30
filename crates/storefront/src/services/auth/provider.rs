//! Identity provider seam.

use async_trait::async_trait;

use droidshop_core::Email;

use super::AuthError;
use crate::models::AuthUser;

/// Creates accounts and verifies passwords.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account. The new account counts as signed in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the email is taken and
    /// `AuthError::WeakPassword` if the password is rejected.
    async fn create_account(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError>;

    /// Verify a password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on a wrong password or an
    /// unknown email.
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError>;
}
