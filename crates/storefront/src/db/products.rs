//! Catalog repository.

use serde_json::Value;

use droidshop_core::ProductId;

use super::{Live, RepositoryError, collections, decode, decode_collection, encode, path};
use crate::models::{Catalog, Product, ProductPatch};
use crate::realtime::RealtimeStore;

/// Repository for `products/{id}`.
pub struct ProductRepository<'a> {
    store: &'a dyn RealtimeStore,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(store: &'a dyn RealtimeStore) -> Self {
        Self { store }
    }

    /// Add a product under a fresh push key and return the key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn add(&self, product: &Product) -> Result<ProductId, RepositoryError> {
        let key = self
            .store
            .push(&path(collections::PRODUCTS, &[])?, encode(product)?)
            .await?;
        tracing::info!(product_id = %key, name = %product.name, "Product added");
        Ok(ProductId::new(key))
    }

    /// Merge `patch` into an existing product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn update(&self, id: &ProductId, patch: &ProductPatch) -> Result<(), RepositoryError> {
        let Value::Object(fields) = encode(patch)? else {
            return Err(RepositoryError::DataCorruption(
                "product patch did not encode to an object".to_owned(),
            ));
        };
        if fields.is_empty() {
            return Ok(());
        }
        self.store
            .update(&path(collections::PRODUCTS, &[id.as_str()])?, fields)
            .await?;
        Ok(())
    }

    /// Delete a product. Cart entries and orders that captured it are left as
    /// they are.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn delete(&self, id: &ProductId) -> Result<(), RepositoryError> {
        self.store
            .remove(&path(collections::PRODUCTS, &[id.as_str()])?)
            .await?;
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Read one product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the read fails.
    /// Returns `RepositoryError::DataCorruption` if the record is malformed.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let snapshot = self
            .store
            .get(&path(collections::PRODUCTS, &[id.as_str()])?)
            .await?;
        decode(&snapshot)
    }

    /// Read the whole catalog once.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the read fails.
    pub async fn all(&self) -> Result<Catalog, RepositoryError> {
        let snapshot = self.store.get(&path(collections::PRODUCTS, &[])?).await?;
        Ok(decode_collection(&snapshot))
    }

    /// Watch the whole catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the listener cannot be opened.
    pub async fn watch_all(&self) -> Result<Live<Catalog>, RepositoryError> {
        let stream = self
            .store
            .subscribe(&path(collections::PRODUCTS, &[])?)
            .await?;
        Ok(Live::new(stream, |snapshot| Ok(decode_collection(snapshot))))
    }
}
