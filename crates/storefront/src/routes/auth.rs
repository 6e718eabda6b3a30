//! Sign-in, registration and sign-out.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use super::views::Shell;
use super::{NoticeQuery, notice_redirect};
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::CurrentSession;
use crate::models::AuthUser;
use crate::services::auth::AuthError;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login and registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth.html")]
pub struct AuthTemplate {
    pub shell: Shell,
    pub is_register: bool,
}

/// Finish a sign-in attempt: remember the user and go home, or send the
/// visitor back to `form_page` with the reason.
async fn finish_sign_in(
    current: &CurrentSession,
    outcome: Result<AuthUser, AuthError>,
    form_page: &str,
) -> Response {
    let remembered = match outcome {
        Ok(user) => current.remember(&user).await.map(|()| {
            set_sentry_user(&user.uid, Some(user.email.as_str()));
        }),
        Err(e) => Err(AppError::from(e)),
    };

    match remembered {
        Ok(()) => Redirect::to("/").into_response(),
        Err(e) => {
            e.report();
            notice_redirect(form_page, &e.public_message()).into_response()
        }
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    current: CurrentSession,
    Query(query): Query<NoticeQuery>,
) -> impl IntoResponse {
    AuthTemplate {
        shell: Shell::new("Login", &current, query.notice),
        is_register: false,
    }
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    current: CurrentSession,
    Form(form): Form<LoginForm>,
) -> Response {
    let outcome = state
        .auth()
        .login(&current.handle, &form.email, &form.password)
        .await;
    finish_sign_in(&current, outcome, "/login").await
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    current: CurrentSession,
    Query(query): Query<NoticeQuery>,
) -> impl IntoResponse {
    AuthTemplate {
        shell: Shell::new("Register", &current, query.notice),
        is_register: true,
    }
}

/// Handle registration form submission. New accounts are signed in
/// straight away.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    current: CurrentSession,
    Form(form): Form<RegisterForm>,
) -> Response {
    let outcome = state
        .auth()
        .register(&current.handle, &form.email, &form.password, &form.name)
        .await;
    if let Ok(user) = &outcome {
        tracing::info!(user_id = %user.uid, "Account registered");
    }
    finish_sign_in(&current, outcome, "/register").await
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout. Live views owned by this session end with it.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, current: CurrentSession) -> Response {
    state.auth().logout(&current.handle);
    clear_sentry_user();

    if let Err(e) = current.forget().await {
        e.report();
    }
    Redirect::to("/").into_response()
}
