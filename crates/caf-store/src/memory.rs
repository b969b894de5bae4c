use std::collections::HashMap;
use std::io::Cursor;
use std::sync::RwLock;

use caf_crypto::ContentHasher;
use caf_types::ContentId;

use crate::error::{StorageError, StorageResult};
use crate::traits::{ContentStream, Delete, Open, Storage, UrlOptions, UrlProvider};

/// In-memory, HashMap-based storage backend.
///
/// Intended for tests and embedding. Content is held behind a `RwLock` and
/// cloned on open. Supports open, url and delete; it has no native download,
/// so downloads through it take the streaming fallback.
pub struct InMemoryStorage {
    name: String,
    contents: RwLock<HashMap<ContentId, Vec<u8>>>,
}

impl InMemoryStorage {
    /// Create a new empty store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: RwLock::new(HashMap::new()),
        }
    }

    /// Store `data` under `id`, replacing anything already there.
    pub fn write(&self, id: &ContentId, data: Vec<u8>) -> StorageResult<()> {
        let mut map = self
            .contents
            .write()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        map.insert(id.clone(), data);
        Ok(())
    }

    /// Hash `data` with `hasher` and store it under the resulting id.
    pub fn upload(&self, hasher: &ContentHasher, data: &[u8]) -> StorageResult<ContentId> {
        let id = hasher.content_id(data);
        self.write(&id, data.to_vec())?;
        Ok(id)
    }

    /// Stored bytes for `id`, if present.
    pub fn get(&self, id: &ContentId) -> StorageResult<Option<Vec<u8>>> {
        let map = self
            .contents
            .read()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        Ok(map.get(id).cloned())
    }

    /// Number of stored items.
    pub fn len(&self) -> StorageResult<usize> {
        let map = self
            .contents
            .read()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        Ok(map.len())
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove everything.
    pub fn clear(&self) -> StorageResult<()> {
        self.contents
            .write()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?
            .clear();
        Ok(())
    }

    /// Sorted list of stored ids.
    pub fn all_ids(&self) -> StorageResult<Vec<ContentId>> {
        let map = self
            .contents
            .read()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        let mut ids: Vec<ContentId> = map.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

impl Storage for InMemoryStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self, id: &ContentId) -> StorageResult<bool> {
        let map = self
            .contents
            .read()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        Ok(map.contains_key(id))
    }

    fn as_opener(&self) -> Option<&dyn Open> {
        Some(self)
    }

    fn as_url_provider(&self) -> Option<&dyn UrlProvider> {
        Some(self)
    }

    fn as_deleter(&self) -> Option<&dyn Delete> {
        Some(self)
    }
}

impl Open for InMemoryStorage {
    fn open(&self, id: &ContentId) -> StorageResult<Box<dyn ContentStream>> {
        let data = self
            .get(id)?
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;
        Ok(Box::new(Cursor::new(data)))
    }
}

impl UrlProvider for InMemoryStorage {
    /// `memory://<store>/<id>`, with options appended as a query string.
    fn url(&self, id: &ContentId, options: &UrlOptions) -> StorageResult<String> {
        let mut url = format!(
            "memory://{}/{}",
            self.name,
            id.as_str().trim_start_matches('/')
        );
        if !options.is_empty() {
            let query: Vec<String> = options.iter().map(|(k, v)| format!("{k}={v}")).collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        Ok(url)
    }
}

impl Delete for InMemoryStorage {
    /// Idempotent: deleting missing content succeeds.
    fn delete(&self, id: &ContentId) -> StorageResult<()> {
        let mut map = self
            .contents
            .write()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        map.remove(id);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStorage")
            .field("name", &self.name)
            .field("object_count", &self.len().ok())
            .finish()
    }
}
