//! Session middleware configuration.
//!
//! Cookie sessions use the in-memory tower-sessions store and carry two
//! values: a per-browser client id and the signed-in [`AuthUser`]. The
//! client id keys the live [`SessionHandle`] kept in [`SessionRegistry`].
//!
//! [`AuthUser`]: crate::models::AuthUser

use std::time::Duration;

use moka::future::Cache;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use uuid::Uuid;

use crate::config::StorefrontConfig;
use crate::services::auth::SessionHandle;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "droidshop_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Upper bound on live session handles kept in memory.
const MAX_LIVE_SESSIONS: u64 = 100_000;

/// Create the session layer with the in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Live session handles, one per browser.
///
/// Handles idle for as long as the cookie lifetime are dropped. A request
/// that finds no handle gets a fresh one, which the auth extractor restores
/// from the cookie.
#[derive(Clone)]
pub struct SessionRegistry {
    handles: Cache<Uuid, SessionHandle>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handles: Cache::builder()
                .max_capacity(MAX_LIVE_SESSIONS)
                .time_to_idle(Duration::from_secs(SESSION_EXPIRY_SECONDS.unsigned_abs()))
                .build(),
        }
    }

    /// The handle for `client_id`, created on first use.
    pub async fn handle(&self, client_id: Uuid) -> SessionHandle {
        self.handles
            .get_with(client_id, async { SessionHandle::new() })
            .await
    }
}
