//! In-process identity provider backed by Argon2id hashes.

use std::collections::HashMap;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::sync::RwLock;

use droidshop_core::{Email, UserId};

use super::{AuthError, IdentityProvider};
use crate::models::AuthUser;

/// Minimum password length, matching the hosted provider's rule.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Length of generated account ids.
const UID_LENGTH: usize = 28;

struct Account {
    uid: UserId,
    password_hash: String,
}

/// Accounts held in memory. They do not survive a restart.
#[derive(Default)]
pub struct LocalIdentityProvider {
    accounts: RwLock<HashMap<Email, Account>>,
}

impl LocalIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn create_account(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(email) {
            return Err(AuthError::UserAlreadyExists);
        }
        let uid = generate_uid();
        accounts.insert(
            email.clone(),
            Account {
                uid: uid.clone(),
                password_hash,
            },
        );
        drop(accounts);

        tracing::info!(user_id = %uid, "Account created");
        Ok(AuthUser {
            uid,
            email: email.clone(),
        })
    }

    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError> {
        let accounts = self.accounts.read().await;
        let account = accounts.get(email).ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &account.password_hash)?;
        Ok(AuthUser {
            uid: account.uid.clone(),
            email: email.clone(),
        })
    }
}

/// Validate password strength.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password should be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

fn generate_uid() -> UserId {
    let uid: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(UID_LENGTH)
        .map(char::from)
        .collect();
    UserId::new(uid)
}
