//! Cart repository.

use droidshop_core::{ProductId, UserId};

use super::{Live, RepositoryError, collections, decode_collection, encode, path};
use crate::models::{Cart, CartEntry, Product};
use crate::realtime::{RealtimeStore, Snapshot};

/// Repository for `carts/{uid}/{productId}`.
pub struct CartRepository<'a> {
    store: &'a dyn RealtimeStore,
}

fn cart_from(snapshot: &Snapshot) -> Cart {
    decode_collection::<ProductId, CartEntry>(snapshot)
        .into_values()
        .collect()
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(store: &'a dyn RealtimeStore) -> Self {
        Self { store }
    }

    /// Put a snapshot of `product` in the cart. Adding a product that is
    /// already there replaces the earlier snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn add_entry(
        &self,
        uid: &UserId,
        product_id: &ProductId,
        product: &Product,
    ) -> Result<(), RepositoryError> {
        let entry = CartEntry {
            id: product_id.clone(),
            product: product.clone(),
        };
        let path = path(collections::CARTS, &[uid.as_str(), product_id.as_str()])?;
        self.store.set(&path, encode(&entry)?).await?;
        Ok(())
    }

    /// Remove one product from the cart. Removing an absent product is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn remove_entry(
        &self,
        uid: &UserId,
        product_id: &ProductId,
    ) -> Result<(), RepositoryError> {
        let path = path(collections::CARTS, &[uid.as_str(), product_id.as_str()])?;
        self.store.remove(&path).await?;
        Ok(())
    }

    /// Read the cart once.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the read fails.
    pub async fn get(&self, uid: &UserId) -> Result<Cart, RepositoryError> {
        let snapshot = self
            .store
            .get(&path(collections::CARTS, &[uid.as_str()])?)
            .await?;
        Ok(cart_from(&snapshot))
    }

    /// Watch the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the listener cannot be opened.
    pub async fn watch(&self, uid: &UserId) -> Result<Live<Cart>, RepositoryError> {
        let stream = self
            .store
            .subscribe(&path(collections::CARTS, &[uid.as_str()])?)
            .await?;
        Ok(Live::new(stream, |snapshot| Ok(cart_from(snapshot))))
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn clear(&self, uid: &UserId) -> Result<(), RepositoryError> {
        self.store
            .remove(&path(collections::CARTS, &[uid.as_str()])?)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use droidshop_core::Price;

    use super::*;
    use crate::realtime::MemoryStore;

    fn product(cents: i64) -> Product {
        Product {
            name: "Astromech".to_owned(),
            price: Price::from_cents(cents),
            description: String::new(),
            image: String::new(),
        }
    }

    #[tokio::test]
    async fn test_adding_twice_overwrites() {
        let store = MemoryStore::new();
        let carts = CartRepository::new(&store);
        let uid = UserId::new("u1");
        let pid = ProductId::new("p1");

        carts.add_entry(&uid, &pid, &product(1000)).await.unwrap();
        carts.add_entry(&uid, &pid, &product(1200)).await.unwrap();

        let cart = carts.get(&uid).await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total(), Price::from_cents(1200));
        assert_eq!(cart.get(&pid).unwrap().id, pid);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let store = MemoryStore::new();
        let carts = CartRepository::new(&store);
        let uid = UserId::new("u1");

        carts.add_entry(&uid, &ProductId::new("a"), &product(100)).await.unwrap();
        carts.add_entry(&uid, &ProductId::new("b"), &product(200)).await.unwrap();
        carts.remove_entry(&uid, &ProductId::new("a")).await.unwrap();
        carts.remove_entry(&uid, &ProductId::new("missing")).await.unwrap();
        assert_eq!(carts.get(&uid).await.unwrap().len(), 1);

        carts.clear(&uid).await.unwrap();
        assert!(carts.get(&uid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_carts_are_per_user() {
        let store = MemoryStore::new();
        let carts = CartRepository::new(&store);
        carts
            .add_entry(&UserId::new("u1"), &ProductId::new("a"), &product(100))
            .await
            .unwrap();
        assert!(carts.get(&UserId::new("u2")).await.unwrap().is_empty());
    }
}
