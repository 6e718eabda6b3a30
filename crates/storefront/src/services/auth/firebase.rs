//! Identity provider backed by the Firebase Identity Toolkit REST API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use droidshop_core::{Email, UserId};

use super::{AuthError, IdentityProvider};
use crate::models::AuthUser;

/// Default Identity Toolkit endpoint.
pub const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

/// Email/password accounts managed by Firebase Authentication.
#[derive(Clone)]
pub struct FirebaseIdentityProvider {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseIdentityProvider {
    /// Create a provider for the project owning `api_key`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url, api_key: SecretString) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("droidshop/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    async fn call(&self, action: &str, email: &Email, password: &str) -> Result<AuthUser, AuthError> {
        let mut url = self
            .base_url
            .join(&format!("v1/accounts:{action}"))
            .map_err(|e| AuthError::Provider(format!("bad endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());

        let response = self
            .client
            .post(url)
            .json(&PasswordRequest {
                email: email.as_str(),
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let code = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            tracing::debug!(action, code = %code, "Identity provider rejected request");
            return Err(classify(&code));
        }

        let account: AccountResponse = response.json().await?;
        let email = match account.email.as_deref() {
            Some(returned) => Email::parse(returned)?,
            None => email.clone(),
        };
        Ok(AuthUser {
            uid: UserId::new(account.local_id),
            email,
        })
    }
}

/// Map an Identity Toolkit error code to `AuthError`.
///
/// Codes may carry a detail suffix, e.g.
/// `WEAK_PASSWORD : Password should be at least 6 characters`.
fn classify(code: &str) -> AuthError {
    let (name, detail) = code
        .split_once(" : ")
        .map_or((code.trim(), None), |(name, detail)| (name.trim(), Some(detail.trim())));
    match name {
        "EMAIL_EXISTS" => AuthError::UserAlreadyExists,
        "WEAK_PASSWORD" => AuthError::WeakPassword(
            detail.unwrap_or("Password is too weak").to_owned(),
        ),
        "INVALID_EMAIL" | "MISSING_EMAIL" => {
            AuthError::InvalidEmail(droidshop_core::EmailError::InvalidDomain)
        }
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "MISSING_PASSWORD" => {
            AuthError::InvalidCredentials
        }
        "USER_DISABLED" => AuthError::UserDisabled,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyAttempts,
        other => AuthError::Provider(other.to_owned()),
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn create_account(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError> {
        let user = self.call("signUp", email, password).await?;
        tracing::info!(user_id = %user.uid, "Account created");
        Ok(user)
    }

    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError> {
        self.call("signInWithPassword", email, password).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_codes() {
        assert!(matches!(classify("EMAIL_EXISTS"), AuthError::UserAlreadyExists));
        assert!(matches!(
            classify("INVALID_LOGIN_CREDENTIALS"),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(classify("USER_DISABLED"), AuthError::UserDisabled));
        match classify("WEAK_PASSWORD : Password should be at least 6 characters") {
            AuthError::WeakPassword(msg) => {
                assert_eq!(msg, "Password should be at least 6 characters");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_unknown_code() {
        assert!(matches!(classify("OPERATION_NOT_ALLOWED"), AuthError::Provider(_)));
    }
}
