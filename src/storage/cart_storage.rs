use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::models::cart::{CartSnapshot, CART_SNAPSHOT_VERSION};

/// Fixed key the cart is stored under.
pub const CART_STORAGE_KEY: &str = "bnd-cart";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported cart snapshot version {found} (expected at most {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Durable key-value slot holding the cart snapshot.
#[async_trait]
pub trait CartStorage: Send + Sync {
    async fn load(&self) -> Result<Option<CartSnapshot>, StorageError>;
    async fn save(&self, snapshot: &CartSnapshot) -> Result<(), StorageError>;
    async fn remove(&self) -> Result<(), StorageError>;
}

fn decode(json_data: &str) -> Result<CartSnapshot, StorageError> {
    let snapshot: CartSnapshot = serde_json::from_str(json_data)?;
    if snapshot.version > CART_SNAPSHOT_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: snapshot.version,
            supported: CART_SNAPSHOT_VERSION,
        });
    }
    Ok(snapshot)
}

/// One JSON file per key inside a directory.
///
/// Writes are serialized and atomic (temp file + rename); the last save wins.
pub struct FileCartStorage {
    path: PathBuf,
    /// Held for the duration of each write; counts completed saves.
    writes: Mutex<u64>,
}

impl FileCartStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }

        let mut path = dir;
        path.push(format!("{}.json", CART_STORAGE_KEY));

        Ok(Self {
            path,
            writes: Mutex::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

#[async_trait]
impl CartStorage for FileCartStorage {
    async fn load(&self) -> Result<Option<CartSnapshot>, StorageError> {
        let json_data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No stored cart at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot = decode(&json_data)?;
        debug!(
            "Cart loaded from {} with {} lines",
            self.path.display(),
            snapshot.items.len()
        );
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &CartSnapshot) -> Result<(), StorageError> {
        let mut writes = self.writes.lock().await;
        let json_data = serde_json::to_string_pretty(snapshot)?;
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, json_data.as_bytes()).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        *writes += 1;
        debug!("Cart saved with {} lines (write {})", snapshot.items.len(), *writes);
        Ok(())
    }

    async fn remove(&self) -> Result<(), StorageError> {
        let _guard = self.writes.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process storage; keeps the serialized text so loads go through the same decoding.
#[derive(Default)]
pub struct MemoryCartStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryCartStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored text, if any.
    pub async fn raw(&self) -> Option<String> {
        self.slot.lock().await.clone()
    }

    pub async fn put_raw(&self, json_data: impl Into<String>) {
        *self.slot.lock().await = Some(json_data.into());
    }
}

#[async_trait]
impl CartStorage for MemoryCartStorage {
    async fn load(&self) -> Result<Option<CartSnapshot>, StorageError> {
        match self.slot.lock().await.as_deref() {
            Some(json_data) => decode(json_data).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, snapshot: &CartSnapshot) -> Result<(), StorageError> {
        let json_data = serde_json::to_string(snapshot)?;
        *self.slot.lock().await = Some(json_data);
        Ok(())
    }

    async fn remove(&self) -> Result<(), StorageError> {
        *self.slot.lock().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cart::{AddItemRequest, Cart, Selection};
    use tempfile::TempDir;

    fn sample_cart() -> Cart {
        let mut cart = Cart::new();
        cart.add_item(AddItemRequest::new("A", "Lemon Haze", Selection::grams(5.0).unwrap(), 1100));
        cart.add_item(AddItemRequest::new("B", "Grinder", Selection::Piece, 450).with_quantity(2));
        cart
    }

    #[tokio::test]
    async fn test_file_storage_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileCartStorage::new(temp_dir.path()).unwrap();
        let cart = sample_cart();

        storage.save(&cart.snapshot()).await.unwrap();
        assert!(storage.path().ends_with("bnd-cart.json"));

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(Cart::from_snapshot(loaded), cart);
    }

    #[tokio::test]
    async fn test_file_storage_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileCartStorage::new(temp_dir.path().join("nested")).unwrap();
        assert!(storage.load().await.unwrap().is_none());
        assert!(storage.remove().await.is_ok());
    }

    #[tokio::test]
    async fn test_last_save_wins_even_if_clock_went_back() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileCartStorage::new(temp_dir.path()).unwrap();

        let mut first = Cart::new();
        first.add_item(AddItemRequest::new("A", "Lemon Haze", Selection::grams(5.0).unwrap(), 1100));
        storage.save(&first.snapshot()).await.unwrap();

        let mut later = sample_cart().snapshot();
        later.saved_at = later.saved_at - chrono::Duration::seconds(30);
        storage.save(&later).await.unwrap();

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded.items.len(), 2);
    }

    #[tokio::test]
    async fn test_newer_version_rejected() {
        let storage = MemoryCartStorage::new();
        storage
            .put_raw(r#"{"version": 99, "saved_at": "2026-01-01T00:00:00Z", "items": []}"#)
            .await;

        let result = storage.load().await;
        assert!(matches!(
            result,
            Err(StorageError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[tokio::test]
    async fn test_memory_storage_remove() {
        let storage = MemoryCartStorage::new();
        storage.save(&sample_cart().snapshot()).await.unwrap();
        assert!(storage.raw().await.is_some());

        storage.remove().await.unwrap();
        assert!(storage.load().await.unwrap().is_none());
    }
}
