//! Authentication service.
//!
//! Accounts live with an [`IdentityProvider`]; profiles live in the realtime
//! store under `users/{uid}`. [`AuthClient`] ties the two together and
//! drives a [`SessionHandle`] through its states:
//!
//! ```text
//! Unauthenticated -> Authenticated{Loading} -> Authenticated{Loaded(profile)}
//!        ^                                              |
//!        +------------------- logout -------------------+
//! ```

mod error;
pub mod firebase;
pub mod local;
mod provider;
mod session;

use std::sync::Arc;

pub use error::AuthError;
pub use firebase::FirebaseIdentityProvider;
pub use local::LocalIdentityProvider;
pub use provider::IdentityProvider;
pub use session::SessionHandle;

use droidshop_core::{Email, UserId};

use crate::db::UserRepository;
use crate::models::{AuthUser, Profile, SessionState, User};
use crate::realtime::{RealtimeStore, Subscription};

/// Registration, sign-in and profile lookup.
#[derive(Clone)]
pub struct AuthClient {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn RealtimeStore>,
}

impl AuthClient {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn RealtimeStore>) -> Self {
        Self { identity, store }
    }

    /// Create an account and its profile, then sign the session in.
    ///
    /// New profiles are never admins.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::WeakPassword` or
    /// `AuthError::UserAlreadyExists` if the account is rejected, and
    /// `AuthError::ProfileWrite` if the account was created but its profile
    /// was not. In the latter case the session stays signed out.
    pub async fn register(
        &self,
        session: &SessionHandle,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthUser, AuthError> {
        let email = Email::parse(email)?;
        let user = self.identity.create_account(&email, password).await?;

        let profile = User::new(name.trim(), email);
        UserRepository::new(self.store.as_ref())
            .create(&user.uid, &profile)
            .await
            .map_err(|source| {
                tracing::error!(user_id = %user.uid, error = %source, "Profile write failed after account creation");
                AuthError::ProfileWrite {
                    uid: user.uid.clone(),
                    source,
                }
            })?;

        self.establish(session, user.clone()).await;
        Ok(user)
    }

    /// Verify credentials and sign the session in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on a wrong password or an
    /// unknown email.
    pub async fn login(
        &self,
        session: &SessionHandle,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let email = Email::parse(email)?;
        let user = self.identity.sign_in(&email, password).await?;
        self.establish(session, user.clone()).await;
        tracing::info!(user_id = %user.uid, "User signed in");
        Ok(user)
    }

    /// Sign the session out.
    pub fn logout(&self, session: &SessionHandle) {
        if let Some(user) = session.user() {
            tracing::info!(user_id = %user.uid, "User signed out");
        }
        session.replace(SessionState::Unauthenticated);
    }

    /// Restore a session for an identity remembered from an earlier request.
    pub async fn resume(&self, session: &SessionHandle, user: AuthUser) {
        self.establish(session, user).await;
    }

    /// Read the profile for `uid`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the read fails.
    pub async fn get_user_data(&self, uid: &UserId) -> Result<Option<User>, AuthError> {
        Ok(UserRepository::new(self.store.as_ref()).get(uid).await?)
    }

    /// Observe `session`; see [`SessionHandle::observe`].
    pub fn observe_session<F>(&self, session: &SessionHandle, callback: F) -> Subscription
    where
        F: FnMut(SessionState) + Send + 'static,
    {
        session.observe(callback)
    }

    /// Mark the session signed in, then load the profile.
    ///
    /// A failed lookup is treated as a missing profile. If this future is
    /// dropped mid-lookup the session falls back to signed out, so it never
    /// stays in the loading state.
    async fn establish(&self, session: &SessionHandle, user: AuthUser) {
        session.replace(SessionState::Authenticated {
            user: user.clone(),
            profile: Profile::Loading,
        });
        let pending = PendingProfile {
            session,
            user: &user,
        };

        let profile = match self.get_user_data(&user.uid).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(user_id = %user.uid, error = %e, "Profile lookup failed");
                None
            }
        };

        // A concurrent logout or sign-in wins over this lookup.
        if session.user().as_ref() == Some(&user) {
            session.replace(SessionState::Authenticated {
                user: user.clone(),
                profile: Profile::Loaded(profile),
            });
        }
        drop(pending);
    }
}

/// Guard for an in-flight profile lookup.
struct PendingProfile<'a> {
    session: &'a SessionHandle,
    user: &'a AuthUser,
}

impl Drop for PendingProfile<'_> {
    fn drop(&mut self) {
        self.session.abandon_loading(self.user);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::realtime::testing::FaultyStore;
    use crate::realtime::{MemoryStore, StorePath};

    fn client(store: &MemoryStore) -> AuthClient {
        AuthClient::new(
            Arc::new(LocalIdentityProvider::new()),
            Arc::new(store.clone()),
        )
    }

    #[tokio::test]
    async fn test_register_writes_non_admin_profile_and_signs_in() {
        let store = MemoryStore::new();
        let auth = client(&store);
        let session = SessionHandle::new();

        let user = auth
            .register(&session, "Luke@Rebels.example", "skywalker", " Luke ")
            .await
            .unwrap();

        let profile = auth.get_user_data(&user.uid).await.unwrap().unwrap();
        assert_eq!(profile.name, "Luke");
        assert_eq!(profile.email.as_str(), "luke@rebels.example");
        assert!(!profile.is_admin);

        let state = session.current();
        assert_eq!(state.user(), Some(&user));
        assert_eq!(state.profile(), Some(&profile));
        assert!(!state.is_admin());
    }

    #[tokio::test]
    async fn test_duplicate_registration_fails() {
        let store = MemoryStore::new();
        let auth = client(&store);
        let session = SessionHandle::new();
        auth.register(&session, "leia@rebels.example", "organa1", "Leia")
            .await
            .unwrap();
        let err = auth
            .register(&SessionHandle::new(), "leia@rebels.example", "organa2", "Leia")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_admin_flag_comes_from_profile() {
        let store = MemoryStore::new();
        let auth = client(&store);
        let session = SessionHandle::new();
        let user = auth
            .register(&session, "admin@droidshop.example", "password", "Admin")
            .await
            .unwrap();
        auth.logout(&session);
        assert_eq!(session.current(), SessionState::Unauthenticated);

        let flag = StorePath::parse(&format!("users/{}/isAdmin", user.uid)).unwrap();
        store.set(&flag, json!(true)).await.unwrap();

        auth.login(&session, "admin@droidshop.example", "password")
            .await
            .unwrap();
        assert!(session.current().is_admin());
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_admin() {
        let store = MemoryStore::new();
        let provider = Arc::new(LocalIdentityProvider::new());
        let email = Email::parse("ghost@droidshop.example").unwrap();
        provider.create_account(&email, "boo-boo").await.unwrap();
        let auth = AuthClient::new(provider, Arc::new(store.clone()));
        let session = SessionHandle::new();

        auth.login(&session, "ghost@droidshop.example", "boo-boo")
            .await
            .unwrap();
        let state = session.current();
        assert!(state.user().is_some());
        assert!(state.profile().is_none());
        assert!(!state.is_loading());
        assert!(!state.is_admin());
    }

    #[tokio::test]
    async fn test_observe_session_sees_sign_in() {
        let store = MemoryStore::new();
        let auth = client(&store);
        let session = SessionHandle::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = auth.observe_session(&session, move |state| {
            sink.lock().unwrap().push(state.user().is_some());
        });
        assert_eq!(*seen.lock().unwrap(), vec![false]);

        auth.register(&session, "han@rebels.example", "falcon", "Han")
            .await
            .unwrap();
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(1);
        while !seen.lock().unwrap().contains(&true) {
            assert!(tokio::time::Instant::now() < deadline);
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_profile_write_failure_keeps_account_but_signs_nobody_in() {
        let mut store = FaultyStore::new(MemoryStore::new());
        store.fail_set_under = Some("users");
        let auth = AuthClient::new(Arc::new(LocalIdentityProvider::new()), Arc::new(store));
        let session = SessionHandle::new();

        let err = auth
            .register(&session, "wedge@rebels.example", "antilles", "Wedge")
            .await
            .unwrap_err();
        let AuthError::ProfileWrite { uid, .. } = err else {
            panic!("expected a profile write failure, got {err:?}");
        };
        assert_eq!(session.current(), SessionState::Unauthenticated);
        assert!(auth.get_user_data(&uid).await.unwrap().is_none());

        // The identity exists, so the same credentials now sign in.
        let user = auth
            .login(&session, "wedge@rebels.example", "antilles")
            .await
            .unwrap();
        assert_eq!(user.uid, uid);
        let state = session.current();
        assert!(state.profile().is_none());
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn test_cancelled_sign_in_does_not_leave_session_loading() {
        let mut store = FaultyStore::new(MemoryStore::new());
        store.get_delay = Some(Duration::from_millis(200));
        let auth = AuthClient::new(Arc::new(LocalIdentityProvider::new()), Arc::new(store));
        let session = SessionHandle::new();
        let user = AuthUser {
            uid: UserId::new("u-biggs"),
            email: Email::parse("biggs@rebels.example").unwrap(),
        };

        let resume = auth.resume(&session, user);
        assert!(tokio::time::timeout(Duration::from_millis(50), resume)
            .await
            .is_err());

        assert!(!session.current().is_loading());
        let resolved = tokio::time::timeout(Duration::from_millis(50), session.resolved())
            .await
            .unwrap();
        assert_eq!(resolved, SessionState::Unauthenticated);
    }
}
