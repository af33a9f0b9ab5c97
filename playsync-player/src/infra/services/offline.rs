use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::RwLock;
use playsync_model::ItemId;

/// Lookup for locally downloaded media.
#[async_trait]
pub trait OfflineStore: Send + Sync + Debug {
    /// Local file for the item, if one has been downloaded.
    async fn local_file_path(&self, item_id: &ItemId) -> Option<PathBuf>;
}

/// Downloads stored as `<root>/<item id>.blob`.
#[derive(Debug, Clone)]
pub struct DirectoryOfflineStore {
    root: PathBuf,
}

impl DirectoryOfflineStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn blob_path(&self, item_id: &ItemId) -> PathBuf {
        self.root.join(format!("{}.blob", item_id))
    }
}

#[async_trait]
impl OfflineStore for DirectoryOfflineStore {
    async fn local_file_path(&self, item_id: &ItemId) -> Option<PathBuf> {
        let path = self.blob_path(item_id);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(path),
            Ok(false) => None,
            Err(err) => {
                log::warn!(
                    "[Offline] Could not check {}: {}",
                    path.display(),
                    err
                );
                None
            }
        }
    }
}

/// Fixed item to path table.
#[derive(Debug, Default)]
pub struct StaticOfflineStore {
    files: RwLock<HashMap<ItemId, PathBuf>>,
}

impl StaticOfflineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item_id: ItemId, path: impl Into<PathBuf>) {
        self.files.write().insert(item_id, path.into());
    }
}

#[async_trait]
impl OfflineStore for StaticOfflineStore {
    async fn local_file_path(&self, item_id: &ItemId) -> Option<PathBuf> {
        self.files.read().get(item_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directory_store_finds_blob_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryOfflineStore::new(dir.path());
        let id = ItemId::from("movie-1");

        assert_eq!(store.local_file_path(&id).await, None);

        std::fs::write(dir.path().join("movie-1.blob"), b"data").unwrap();
        assert_eq!(
            store.local_file_path(&id).await,
            Some(dir.path().join("movie-1.blob"))
        );
    }
}
