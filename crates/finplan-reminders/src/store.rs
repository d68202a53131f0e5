//! Item store adapters.
//!
//! The store owns the items; adapters only hand out copies. Fetching is a
//! blocking call and is the only point where a reminder pass may wait.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::{Item, StoreError};

/// Source of every candidate item.
pub trait ItemStore: Send + Sync {
    /// Fetch all items. Blocks the calling thread.
    fn fetch_all(&self) -> Result<Vec<Item>, StoreError>;
}

/// Item store held in memory.
#[derive(Debug, Default)]
pub struct MemoryItemStore {
    items: Mutex<Vec<Item>>,
    outage: Mutex<Option<String>>,
}

impl MemoryItemStore {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: Mutex::new(items),
            outage: Mutex::new(None),
        }
    }

    /// Replace the stored items.
    pub fn replace(&self, items: Vec<Item>) {
        *self.items.lock().unwrap_or_else(PoisonError::into_inner) = items;
    }

    /// Make every fetch fail with [`StoreError::Unavailable`] until cleared
    /// with `None`.
    pub fn set_outage(&self, reason: Option<String>) {
        *self.outage.lock().unwrap_or_else(PoisonError::into_inner) = reason;
    }
}

impl ItemStore for MemoryItemStore {
    fn fetch_all(&self) -> Result<Vec<Item>, StoreError> {
        if let Some(reason) = self
            .outage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(StoreError::Unavailable(reason));
        }
        Ok(self
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Item store backed by a JSON array on disk, re-read on every fetch.
///
/// A missing file is an empty store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ItemStore for JsonFileStore {
    fn fetch_all(&self) -> Result<Vec<Item>, StoreError> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "items file missing, treating as empty");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let items: Vec<Item> = serde_json::from_slice(&data)?;
        debug!(path = %self.path.display(), count = items.len(), "loaded items");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn item(id: &str) -> Item {
        Item::new(
            id,
            id.to_uppercase(),
            DateTime::parse_from_rfc3339("2026-06-10T00:00:00Z").unwrap(),
            1,
            9,
        )
    }

    #[test]
    fn test_memory_store_returns_copies() {
        let store = MemoryItemStore::new(vec![item("a")]);
        let mut fetched = store.fetch_all().unwrap();
        fetched[0].completed = true;

        assert!(!store.fetch_all().unwrap()[0].completed);
    }

    #[test]
    fn test_memory_store_outage() {
        let store = MemoryItemStore::new(vec![item("a")]);
        store.set_outage(Some("offline".to_string()));
        assert!(matches!(
            store.fetch_all(),
            Err(StoreError::Unavailable(reason)) if reason == "offline"
        ));

        store.set_outage(None);
        assert_eq!(store.fetch_all().unwrap().len(), 1);
    }

    #[test]
    fn test_json_store_reads_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(&path, serde_json::to_vec(&vec![item("a"), item("b")]).unwrap()).unwrap();

        let store = JsonFileStore::new(&path);
        let items = store.fetch_all().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].name, "B");
    }

    #[test]
    fn test_json_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.fetch_all().unwrap().is_empty());
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.fetch_all(), Err(StoreError::Parse(_))));
    }
}
