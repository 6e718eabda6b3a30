//! Authentication error types.

use thiserror::Error;

use droidshop_core::UserId;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] droidshop_core::EmailError),

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password rejected by the identity provider.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The account has been disabled by an operator.
    #[error("account disabled")]
    UserDisabled,

    /// The provider is throttling this account or client.
    #[error("too many attempts")]
    TooManyAttempts,

    /// The provider returned an error code we do not classify.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// The provider could not be reached.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading the profile failed.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// The account was created but its profile record was not written.
    #[error("account {uid} created but profile write failed: {source}")]
    ProfileWrite {
        uid: UserId,
        #[source]
        source: RepositoryError,
    },

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message safe to show to the visitor.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidEmail(e) => format!("Invalid email: {e}"),
            Self::InvalidCredentials => "Invalid email or password".to_owned(),
            Self::UserAlreadyExists => "An account with this email already exists".to_owned(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::UserDisabled => "This account has been disabled".to_owned(),
            Self::TooManyAttempts => "Too many attempts. Please try again later".to_owned(),
            Self::ProfileWrite { .. } => {
                "Your account was created but your profile could not be saved. Please sign in again"
                    .to_owned()
            }
            Self::Provider(_) | Self::Http(_) | Self::Repository(_) | Self::PasswordHash => {
                "Authentication failed. Please try again".to_owned()
            }
        }
    }
}
