//! Authentication extractors and declarative route access.
//!
//! [`CurrentSession`] resolves the visitor's live [`SessionHandle`] from the
//! cookie and waits out any pending profile lookup, so handlers never see
//! the loading state. [`Access`] encodes who may reach a route and where
//! everyone else is sent.

use axum::{
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::session::keys;
use crate::models::{AuthUser, SessionState};
use crate::routes::access_for;
use crate::services::auth::SessionHandle;
use crate::state::AppState;

/// Who may reach a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone.
    Public,
    /// Signed-in visitors. Others are sent to `/login`.
    SignedIn,
    /// Signed-in visitors whose loaded profile has `isAdmin`. Others are sent
    /// to `/`.
    Admin,
}

impl Access {
    /// Returns `true` if `state` satisfies this rule.
    #[must_use]
    pub fn allows(self, state: &SessionState) -> bool {
        match self {
            Self::Public => true,
            Self::SignedIn => state.user().is_some(),
            Self::Admin => state.is_admin(),
        }
    }

    /// Where a visitor who fails this rule is sent.
    #[must_use]
    pub const fn denied_redirect(self) -> &'static str {
        match self {
            Self::SignedIn => "/login",
            Self::Public | Self::Admin => "/",
        }
    }

    /// Check `state`, producing the redirect on denial.
    ///
    /// # Errors
    ///
    /// Returns `AccessRejection::Redirect` if the rule is not met.
    pub fn check(self, state: &SessionState) -> Result<(), AccessRejection> {
        if self.allows(state) {
            Ok(())
        } else {
            Err(AccessRejection::Redirect(self.denied_redirect()))
        }
    }
}

/// Rejection from the access extractors.
#[derive(Debug)]
pub enum AccessRejection {
    /// Send the visitor elsewhere.
    Redirect(&'static str),
    /// Session lookup failed.
    Error(AppError),
}

impl IntoResponse for AccessRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(to) => Redirect::to(to).into_response(),
            Self::Error(err) => err.into_response(),
        }
    }
}

impl From<AppError> for AccessRejection {
    fn from(err: AppError) -> Self {
        Self::Error(err)
    }
}

fn session_error(err: tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {err}"))
}

/// The visitor's cookie session, live handle and resolved state.
#[derive(Clone)]
pub struct CurrentSession {
    pub session: Session,
    pub handle: SessionHandle,
    pub state: SessionState,
}

impl CurrentSession {
    async fn load(parts: &mut Parts, app: &AppState) -> Result<Self, AppError> {
        let session = Session::from_request_parts(parts, app)
            .await
            .map_err(|(_, msg)| AppError::Internal(msg.to_string()))?;

        let client_id = match session.get::<Uuid>(keys::CLIENT_ID).await.map_err(session_error)? {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                session
                    .insert(keys::CLIENT_ID, id)
                    .await
                    .map_err(session_error)?;
                id
            }
        };

        let handle = app.sessions().handle(client_id).await;
        if handle.user().is_none()
            && let Some(user) = session
                .get::<AuthUser>(keys::CURRENT_USER)
                .await
                .map_err(session_error)?
        {
            tracing::debug!(user_id = %user.uid, "Restoring session");
            app.auth().resume(&handle, user).await;
        }

        let state = handle.resolved().await;
        Ok(Self {
            session,
            handle,
            state,
        })
    }

    /// The signed-in identity, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&AuthUser> {
        self.state.user()
    }

    /// Remember `user` in the cookie session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the session cannot be modified.
    pub async fn remember(&self, user: &AuthUser) -> Result<(), AppError> {
        self.session.cycle_id().await.map_err(session_error)?;
        self.session
            .insert(keys::CURRENT_USER, user)
            .await
            .map_err(session_error)
    }

    /// Forget the signed-in user (logout).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the session cannot be modified.
    pub async fn forget(&self) -> Result<(), AppError> {
        self.session
            .remove::<AuthUser>(keys::CURRENT_USER)
            .await
            .map_err(session_error)?;
        Ok(())
    }
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, app: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<Self>() {
            return Ok(current.clone());
        }
        let current = Self::load(parts, app).await?;
        parts.extensions.insert(current.clone());
        Ok(current)
    }
}

/// Extractor that requires a signed-in visitor.
///
/// # Example
///
/// ```rust,ignore
/// async fn cart(RequireAuth { user, .. }: RequireAuth) -> impl IntoResponse {
///     format!("Cart for {}", user.email)
/// }
/// ```
pub struct RequireAuth {
    pub current: CurrentSession,
    pub user: AuthUser,
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AccessRejection;

    async fn from_request_parts(parts: &mut Parts, app: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentSession::from_request_parts(parts, app).await?;
        Access::SignedIn.check(&current.state)?;
        let user = current
            .user()
            .cloned()
            .ok_or(AccessRejection::Redirect(Access::SignedIn.denied_redirect()))?;
        Ok(Self { current, user })
    }
}

/// Extractor that requires an admin.
pub struct RequireAdmin {
    pub current: CurrentSession,
    pub user: AuthUser,
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AccessRejection;

    async fn from_request_parts(parts: &mut Parts, app: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentSession::from_request_parts(parts, app).await?;
        Access::Admin.check(&current.state)?;
        let user = current
            .user()
            .cloned()
            .ok_or(AccessRejection::Redirect(Access::Admin.denied_redirect()))?;
        Ok(Self { current, user })
    }
}

/// Apply the route access table before any handler runs.
///
/// Must be installed with `route_layer` so the matched path is known.
pub async fn access_gate(
    State(app): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AccessRejection> {
    let access = request
        .extensions()
        .get::<MatchedPath>()
        .map_or(Access::Public, |matched| access_for(matched.as_str()));
    if access == Access::Public {
        return Ok(next.run(request).await);
    }

    let (mut parts, body) = request.into_parts();
    let current = CurrentSession::from_request_parts(&mut parts, &app).await?;
    if let Err(rejection) = access.check(&current.state) {
        tracing::debug!(path = %parts.uri.path(), ?access, "Access denied");
        return Err(rejection);
    }
    Ok(next.run(Request::from_parts(parts, body)).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use droidshop_core::{Email, UserId};

    use super::*;
    use crate::models::{Profile, User};

    fn signed_in(is_admin: bool) -> SessionState {
        let mut profile = User::new("Droid", Email::parse("d@shop.example").unwrap());
        profile.is_admin = is_admin;
        SessionState::Authenticated {
            user: AuthUser {
                uid: UserId::new("u1"),
                email: profile.email.clone(),
            },
            profile: Profile::Loaded(Some(profile)),
        }
    }

    #[test]
    fn test_access_rules() {
        let anonymous = SessionState::Unauthenticated;
        assert!(Access::Public.allows(&anonymous));
        assert!(!Access::SignedIn.allows(&anonymous));
        assert!(!Access::Admin.allows(&anonymous));

        assert!(Access::SignedIn.allows(&signed_in(false)));
        assert!(!Access::Admin.allows(&signed_in(false)));
        assert!(Access::Admin.allows(&signed_in(true)));
    }

    #[test]
    fn test_denied_redirects() {
        assert!(matches!(
            Access::SignedIn.check(&SessionState::Unauthenticated),
            Err(AccessRejection::Redirect("/login"))
        ));
        assert!(matches!(
            Access::Admin.check(&signed_in(false)),
            Err(AccessRejection::Redirect("/"))
        ));
    }
}
