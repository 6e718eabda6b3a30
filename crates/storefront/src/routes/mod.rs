//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                            - Catalog (public)
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Store reachability check
//!
//! # Auth
//! GET  /login, /register            - Forms
//! POST /login, /register            - Sign in, redirect to /
//! POST /logout                      - Sign out, redirect to /
//!
//! # Products
//! GET  /product/{id}                - Product detail (public)
//! POST /product/{id}/cart           - Add to cart (signed in)
//!
//! # Cart and orders (signed in)
//! GET  /cart                        - Cart page
//! POST /cart/{pid}/remove           - Remove an entry
//! POST /cart/checkout               - Place an order from the cart
//! GET  /orders                      - Order history
//!
//! # Admin (isAdmin)
//! GET  /admin?tab=products|orders   - Admin panel
//! POST /admin/products              - Add a product (multipart, with image)
//! POST /admin/products/{id}/delete  - Delete a product
//! POST /admin/orders/{id}/status    - Set an order's status
//!
//! # Live fragments (SSE)
//! GET  /live/products               - Catalog grid
//! GET  /live/cart                   - Cart items and badge (signed in)
//! GET  /live/orders                 - The visitor's orders (signed in)
//! GET  /live/admin/products         - Admin product list (isAdmin)
//! GET  /live/admin/orders           - Admin order list (isAdmin)
//! ```
//!
//! Access is declared once in [`ROUTE_ACCESS`] and enforced by
//! [`access_gate`] before any handler runs.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod home;
pub mod live;
pub mod orders;
pub mod products;
pub mod views;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{Request, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::Redirect,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::middleware::{
    Access, access_gate, create_session_layer, request_id_middleware, security_headers_middleware,
};
use crate::realtime::StorePath;
use crate::state::AppState;

/// Largest accepted admin upload.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Who may reach each route. Routes not listed are public.
pub const ROUTE_ACCESS: &[(&str, Access)] = &[
    ("/cart", Access::SignedIn),
    ("/cart/{pid}/remove", Access::SignedIn),
    ("/cart/checkout", Access::SignedIn),
    ("/orders", Access::SignedIn),
    ("/product/{id}/cart", Access::SignedIn),
    ("/live/cart", Access::SignedIn),
    ("/live/orders", Access::SignedIn),
    ("/admin", Access::Admin),
    ("/admin/products", Access::Admin),
    ("/admin/products/{id}/delete", Access::Admin),
    ("/admin/orders/{id}/status", Access::Admin),
    ("/live/admin/products", Access::Admin),
    ("/live/admin/orders", Access::Admin),
];

/// Look up the access rule for a matched route pattern.
#[must_use]
pub fn access_for(route: &str) -> Access {
    ROUTE_ACCESS
        .iter()
        .find(|(pattern, _)| *pattern == route)
        .map_or(Access::Public, |(_, access)| *access)
}

/// Query carrying a one-off message for the notice dialog.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
}

/// Redirect to `to`, showing `message` in the notice dialog there.
#[must_use]
pub fn notice_redirect(to: &str, message: &str) -> Redirect {
    let encoded: String = url::form_urlencoded::byte_serialize(message.as_bytes()).collect();
    let separator = if to.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{to}{separator}notice={encoded}"))
}

/// Build the storefront router with its middleware stack.
///
/// Sentry layers are added by the binary.
pub fn router(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/", get(home::home))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/product/{id}", get(products::show))
        .route("/product/{id}/cart", post(products::add_to_cart))
        .route("/cart", get(cart::show))
        .route("/cart/{pid}/remove", post(cart::remove))
        .route("/cart/checkout", post(cart::checkout))
        .route("/orders", get(orders::index))
        .route("/admin", get(admin::index))
        .route(
            "/admin/products",
            post(admin::add_product).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/admin/products/{id}/delete", post(admin::delete_product))
        .route("/admin/orders/{id}/status", post(admin::set_order_status))
        .route("/live/products", get(live::products))
        .route("/live/cart", get(live::cart))
        .route("/live/orders", get(live::orders))
        .route("/live/admin/products", get(live::admin_products))
        .route("/live/admin/orders", get(live::admin_orders))
        .route_layer(from_fn_with_state(state.clone(), access_gate))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Reads a small path from the store. Returns 503 Service Unavailable if the
/// store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let result = match StorePath::parse("health") {
        Ok(path) => state.store().get(&path).await.map(|_| ()),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
