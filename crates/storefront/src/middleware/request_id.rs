//! Request ID middleware for request tracing and correlation.
//!
//! Reuses the upstream proxy's `x-request-id` when it looks sane, otherwise
//! generates a UUID v4. The id is recorded on the request span, tagged on
//! the Sentry scope and echoed in the response.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header carrying request IDs.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest upstream id we accept.
const MAX_REQUEST_ID_LENGTH: usize = 128;

fn upstream_id(request: &Request) -> Option<String> {
    let raw = request.headers().get(&REQUEST_ID_HEADER)?.to_str().ok()?;
    let trimmed = raw.trim();
    (!trimmed.is_empty() && trimmed.len() <= MAX_REQUEST_ID_LENGTH).then(|| trimmed.to_owned())
}

/// Middleware that gives every request an id.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = upstream_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), value);
    }
    response
}
