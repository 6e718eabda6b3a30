//! Observable session state.

use std::sync::Arc;

use tokio::sync::watch;

use crate::models::{AuthUser, SessionState};
use crate::realtime::Subscription;

/// Shared, observable authentication state for one visitor.
///
/// Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionHandle")
            .field(&*self.state.borrow())
            .finish()
    }
}

impl SessionHandle {
    /// A signed-out session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(watch::Sender::new(SessionState::Unauthenticated)),
        }
    }

    /// The state right now.
    #[must_use]
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// The signed-in identity, if any.
    #[must_use]
    pub fn user(&self) -> Option<AuthUser> {
        self.state.borrow().user().cloned()
    }

    pub(crate) fn replace(&self, next: SessionState) {
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
    }

    /// Sign out if `user` is still waiting for a profile lookup that will
    /// never finish. Any other state is left alone.
    pub(crate) fn abandon_loading(&self, user: &AuthUser) {
        self.state.send_if_modified(|state| {
            let stranded = state.is_loading() && state.user() == Some(user);
            if stranded {
                *state = SessionState::Unauthenticated;
            }
            stranded
        });
    }

    /// Invoke `callback` with the current state now, and again after every
    /// change until the returned handle is dropped or unsubscribed.
    pub fn observe<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(SessionState) + Send + 'static,
    {
        let mut rx = self.state.subscribe();
        let current = rx.borrow_and_update().clone();
        callback(current);
        Subscription::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                callback(state);
            }
        })
    }

    /// Wait until the profile lookup that follows sign-in has finished.
    pub async fn resolved(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        let state = rx.wait_for(|state| !state.is_loading()).await;
        state.map_or_else(|_| self.current(), |state| state.clone())
    }

    /// Resolves once nobody is signed in.
    pub async fn signed_out(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| state.user().is_none()).await;
    }

    /// Resolves once the session leaves `user`: sign-out or a different
    /// account signing in.
    pub async fn left(&self, user: &AuthUser) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| state.user() != Some(user)).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use droidshop_core::{Email, UserId};

    use super::*;
    use crate::models::Profile;

    fn ada() -> AuthUser {
        AuthUser {
            uid: UserId::new("u1"),
            email: Email::parse("ada@example.com").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_observe_fires_immediately_and_on_change() {
        let handle = SessionHandle::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = handle.observe(move |state| sink.lock().unwrap().push(state));
        assert_eq!(seen.lock().unwrap().len(), 1);

        handle.replace(SessionState::Authenticated {
            user: ada(),
            profile: Profile::Loaded(None),
        });
        tokio::time::timeout(Duration::from_secs(1), async {
            while seen.lock().unwrap().len() < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        subscription.unsubscribe();
        handle.replace(SessionState::Unauthenticated);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_resolved_waits_for_profile() {
        let handle = SessionHandle::new();
        handle.replace(SessionState::Authenticated {
            user: ada(),
            profile: Profile::Loading,
        });
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.resolved().await })
        };
        handle.replace(SessionState::Authenticated {
            user: ada(),
            profile: Profile::Loaded(None),
        });
        let state = waiter.await.unwrap();
        assert!(!state.is_loading());
    }

    #[test]
    fn test_abandon_loading_only_clears_a_pending_lookup() {
        let handle = SessionHandle::new();
        let loaded = SessionState::Authenticated {
            user: ada(),
            profile: Profile::Loaded(None),
        };
        handle.replace(loaded.clone());
        handle.abandon_loading(&ada());
        assert_eq!(handle.current(), loaded);

        handle.replace(SessionState::Authenticated {
            user: ada(),
            profile: Profile::Loading,
        });
        handle.abandon_loading(&ada());
        assert_eq!(handle.current(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_signed_out_resolves_on_logout() {
        let handle = SessionHandle::new();
        handle.replace(SessionState::Authenticated {
            user: ada(),
            profile: Profile::Loaded(None),
        });
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.signed_out().await })
        };
        handle.replace(SessionState::Unauthenticated);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
