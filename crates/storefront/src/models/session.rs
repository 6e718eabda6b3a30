//! Session-related types.

use serde::{Deserialize, Serialize};

use droidshop_core::{Email, UserId};

use super::User;

/// The signed-in identity, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: UserId,
    pub email: Email,
}

/// Progress of the profile lookup that follows sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    /// The lookup has not finished yet.
    Loading,
    /// The lookup finished. `None` means no profile record exists.
    Loaded(Option<User>),
}

/// What the application knows about the current visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated { user: AuthUser, profile: Profile },
}

impl SessionState {
    /// The signed-in identity, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::Authenticated { user, .. } => Some(user),
            Self::Unauthenticated => None,
        }
    }

    /// The loaded profile, if any.
    #[must_use]
    pub const fn profile(&self) -> Option<&User> {
        match self {
            Self::Authenticated {
                profile: Profile::Loaded(Some(user)),
                ..
            } => Some(user),
            _ => None,
        }
    }

    /// Returns `true` while the profile lookup is still in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(
            self,
            Self::Authenticated {
                profile: Profile::Loading,
                ..
            }
        )
    }

    /// Admin rights require a loaded profile with `isAdmin` set.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.profile().is_some_and(|user| user.is_admin)
    }
}

/// Session keys.
pub mod keys {
    /// Per-browser id used to find the live session handle.
    pub const CLIENT_ID: &str = "client_id";

    /// The signed-in [`AuthUser`](super::AuthUser).
    pub const CURRENT_USER: &str = "current_user";
}
