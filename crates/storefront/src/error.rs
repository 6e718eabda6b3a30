//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Page handlers return `Result<T, AppError>`;
//! form handlers turn expected failures into notices instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::{PlaceOrderError, RepositoryError};
use crate::services::UploadError;
use crate::services::auth::AuthError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Image upload failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Placing an order failed.
    #[error("Order error: {0}")]
    Order(#[from] PlaceOrderError),

    /// A page failed to render.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns `true` for failures on our side that should be reported.
    fn is_server_fault(&self) -> bool {
        match self {
            Self::Repository(_) | Self::Order(_) | Self::Template(_) | Self::Internal(_) => true,
            Self::Upload(err) => !matches!(err, UploadError::NotConfigured),
            Self::Auth(err) => matches!(
                err,
                AuthError::Repository(_)
                    | AuthError::ProfileWrite { .. }
                    | AuthError::PasswordHash
                    | AuthError::Http(_)
                    | AuthError::Provider(_)
            ),
            Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }

    /// Message safe to show to the visitor.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Repository(_) | Self::Template(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Order(PlaceOrderError::NotPlaced(_)) => {
                "Your order could not be placed. Please try again".to_string()
            }
            Self::Order(PlaceOrderError::CartNotCleared { order_id, .. }) => format!(
                "Order #{} was placed, but your cart could not be emptied",
                order_id.short()
            ),
            Self::Upload(UploadError::NotConfigured) => "Image uploads are not configured".to_string(),
            Self::Upload(_) => "Image upload failed".to_string(),
            Self::Auth(err) => err.public_message(),
            Self::NotFound(_) | Self::BadRequest(_) => self.to_string(),
        }
    }

    /// Report server faults to Sentry and the log.
    pub fn report(&self) {
        if self.is_server_fault() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report();

        let status = match &self {
            Self::Repository(_) | Self::Order(_) | Self::Template(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Upload(UploadError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upload(_) => StatusCode::BAD_GATEWAY,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserDisabled => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
                AuthError::Http(_) | AuthError::Provider(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        (status, self.public_message()).into_response()
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "-Nz1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
