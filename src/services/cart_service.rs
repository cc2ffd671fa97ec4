use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    models::cart::{AddItemRequest, Cart, LineItem, LineKey},
    storage::{CartStorage, StorageError},
};

#[derive(Error, Debug)]
pub enum CartServiceError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

/// The shopping cart plus the slot it is persisted to.
///
/// Every mutation writes the new snapshot before returning. A failed write
/// is logged and the in-memory cart stays authoritative.
pub struct CartService {
    cart: Cart,
    storage: Arc<dyn CartStorage>,
}

impl CartService {
    /// Empty cart; nothing is read from storage.
    pub fn new(storage: Arc<dyn CartStorage>) -> Self {
        Self {
            cart: Cart::new(),
            storage,
        }
    }

    /// Rehydrate from storage. Missing or unreadable state gives an empty cart.
    pub async fn load(storage: Arc<dyn CartStorage>) -> Self {
        let cart = match storage.load().await {
            Ok(Some(snapshot)) => {
                let cart = Cart::from_snapshot(snapshot);
                info!(
                    "Restored cart with {} lines, total {}",
                    cart.len(),
                    cart.total()
                );
                cart
            }
            Ok(None) => {
                debug!("No saved cart, starting empty");
                Cart::new()
            }
            Err(e) => {
                warn!("Discarding unreadable saved cart: {}", e);
                if let Err(e) = storage.remove().await {
                    error!("Failed to discard saved cart: {}", e);
                }
                Cart::new()
            }
        };

        Self { cart, storage }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn items(&self) -> &[LineItem] {
        self.cart.items()
    }

    pub fn total(&self) -> u64 {
        self.cart.total()
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    pub async fn add_item(&mut self, request: AddItemRequest) {
        info!(
            "Adding {} x {} ({}) at {}",
            request.quantity, request.product_id, request.selection, request.unit_price
        );
        self.cart.add_item(request);
        self.persist().await;
    }

    /// Returns whether a line was removed.
    pub async fn remove_item(&mut self, key: &LineKey) -> bool {
        let removed = self.cart.remove_item(key);
        if removed {
            info!("Removed {} ({}) from cart", key.product_id, key.selection);
            self.persist().await;
        } else {
            debug!("Remove ignored, no line for {} ({})", key.product_id, key.selection);
        }
        removed
    }

    /// Returns the new count, or `None` when no line matches.
    pub async fn update_quantity(&mut self, key: &LineKey, delta: i64) -> Option<u32> {
        let updated = self.cart.update_quantity(key, delta);
        match updated {
            Some(quantity) => {
                info!(
                    "Quantity of {} ({}) is now {}",
                    key.product_id, key.selection, quantity
                );
                self.persist().await;
            }
            None => debug!("Update ignored, no line for {} ({})", key.product_id, key.selection),
        }
        updated
    }

    pub async fn clear(&mut self) {
        info!("Clearing cart with {} lines", self.cart.len());
        self.cart.clear();
        self.persist().await;
    }

    /// Write the current snapshot, surfacing any storage failure.
    pub async fn flush(&self) -> Result<(), CartServiceError> {
        self.storage.save(&self.cart.snapshot()).await?;
        Ok(())
    }

    async fn persist(&self) {
        if let Err(e) = self.flush().await {
            error!("Failed to persist cart: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cart::{CartSnapshot, Selection};
    use crate::storage::MemoryCartStorage;
    use async_trait::async_trait;

    struct FailingStorage;

    #[async_trait]
    impl CartStorage for FailingStorage {
        async fn load(&self) -> Result<Option<CartSnapshot>, StorageError> {
            Err(StorageError::IoError(std::io::Error::other("disk unavailable")))
        }

        async fn save(&self, _snapshot: &CartSnapshot) -> Result<(), StorageError> {
            Err(StorageError::IoError(std::io::Error::other("disk full")))
        }

        async fn remove(&self) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn grams(value: f64) -> Selection {
        Selection::grams(value).unwrap()
    }

    #[tokio::test]
    async fn test_mutations_are_persisted() {
        let storage = Arc::new(MemoryCartStorage::new());
        let mut service = CartService::new(storage.clone());

        service
            .add_item(AddItemRequest::new("A", "Kush", grams(5.0), 700))
            .await;
        let reloaded = CartService::load(storage.clone()).await;
        assert_eq!(reloaded.cart(), service.cart());

        service.clear().await;
        let reloaded = CartService::load(storage).await;
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn test_noop_mutations_report_misses() {
        let storage = Arc::new(MemoryCartStorage::new());
        let mut service = CartService::new(storage.clone());
        let key = LineKey::new("missing", grams(1.0));

        assert!(!service.remove_item(&key).await);
        assert_eq!(service.update_quantity(&key, 3).await, None);
        assert!(storage.raw().await.is_none());
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_cart_usable() {
        let mut service = CartService::load(Arc::new(FailingStorage)).await;
        assert!(service.is_empty());

        service
            .add_item(AddItemRequest::new("A", "Kush", grams(1.0), 300))
            .await;
        assert_eq!(service.total(), 300);
        assert!(matches!(
            service.flush().await,
            Err(CartServiceError::StorageError(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_loads_empty() {
        let storage = Arc::new(MemoryCartStorage::new());
        storage.put_raw("{ not json").await;

        let service = CartService::load(storage.clone()).await;
        assert!(service.is_empty());
        assert_eq!(service.total(), 0);
        assert!(storage.raw().await.is_none());
    }
}
