//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::{BackendKind, StorefrontConfig};
use crate::middleware::SessionRegistry;
use crate::realtime::{FirebaseStore, MemoryStore, RealtimeStore, StoreError};
use crate::services::auth::{
    AuthClient, AuthError, FirebaseIdentityProvider, IdentityProvider, LocalIdentityProvider,
};
use crate::services::{ImageHostClient, UploadError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("firebase backend selected but not configured")]
    MissingFirebaseConfig,
    #[error("failed to load seed file: {0}")]
    Seed(#[from] std::io::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("identity provider error: {0}")]
    Identity(#[from] AuthError),
    #[error("image host error: {0}")]
    Images(#[from] UploadError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the realtime store, the auth client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn RealtimeStore>,
    auth: AuthClient,
    images: ImageHostClient,
    sessions: SessionRegistry,
}

impl AppState {
    /// Create a new application state from explicit backends.
    ///
    /// # Errors
    ///
    /// Returns an error if the image host client cannot be built.
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn RealtimeStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, StateError> {
        let images = ImageHostClient::new(
            config.images.base_url.clone(),
            config.images.api_key.clone(),
        )?;
        let auth = AuthClient::new(identity, Arc::clone(&store));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                auth,
                images,
                sessions: SessionRegistry::new(),
            }),
        })
    }

    /// Create the application state with the backends named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed file cannot be read or a backend client
    /// cannot be built.
    pub async fn from_config(config: StorefrontConfig) -> Result<Self, StateError> {
        let (store, identity): (Arc<dyn RealtimeStore>, Arc<dyn IdentityProvider>) =
            match config.backend {
                BackendKind::Memory => {
                    let store = match &config.seed_file {
                        Some(path) => {
                            let store = MemoryStore::from_seed_file(path).await?;
                            tracing::info!(path = %path.display(), "Memory store seeded");
                            store
                        }
                        None => MemoryStore::new(),
                    };
                    (Arc::new(store), Arc::new(LocalIdentityProvider::new()))
                }
                BackendKind::Firebase => {
                    let firebase = config
                        .firebase
                        .as_ref()
                        .ok_or(StateError::MissingFirebaseConfig)?;
                    let store = FirebaseStore::new(
                        firebase.database_url.clone(),
                        firebase.database_secret.clone(),
                    )?;
                    let identity = FirebaseIdentityProvider::new(
                        firebase.identity_url.clone(),
                        firebase.api_key.clone(),
                    )?;
                    (Arc::new(store), Arc::new(identity))
                }
            };
        tracing::info!(backend = ?config.backend, "Backends initialized");
        Self::new(config, store, identity)
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the realtime store.
    #[must_use]
    pub fn store(&self) -> &dyn RealtimeStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the auth client.
    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.inner.auth
    }

    /// Get a reference to the image host client.
    #[must_use]
    pub fn images(&self) -> &ImageHostClient {
        &self.inner.images
    }

    /// Get a reference to the live session registry.
    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }
}
