//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span)
//! 4. Security headers
//! 5. Session layer (tower-sessions, in-memory store)
//! 6. Access gate (route table, per matched route)

pub mod auth;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{Access, AccessRejection, CurrentSession, RequireAdmin, RequireAuth, access_gate};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, SessionRegistry, create_session_layer};
