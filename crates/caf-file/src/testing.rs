//! Test backends with controlled behavior.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use caf_store::{Delete, Download, Storage, StorageError, StorageResult};
use caf_types::ContentId;
use tempfile::NamedTempFile;

/// Answers `exists` with a fixed value and counts how often it was asked.
pub struct CountingStorage {
    name: String,
    holds: bool,
    probes: AtomicUsize,
}

impl CountingStorage {
    pub fn new(name: &str, holds: bool) -> Self {
        Self {
            name: name.into(),
            holds,
            probes: AtomicUsize::new(0),
        }
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl Storage for CountingStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self, _id: &ContentId) -> StorageResult<bool> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.holds)
    }
}

/// Every call fails.
pub struct FaultyStorage {
    name: String,
}

impl FaultyStorage {
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }
}

impl Storage for FaultyStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self, _id: &ContentId) -> StorageResult<bool> {
        Err(StorageError::backend(&self.name, "connection refused"))
    }

    fn as_deleter(&self) -> Option<&dyn Delete> {
        Some(self)
    }
}

impl Delete for FaultyStorage {
    fn delete(&self, _id: &ContentId) -> StorageResult<()> {
        Err(StorageError::backend(&self.name, "connection refused"))
    }
}

/// Holds one piece of content and can only download it natively.
///
/// Downloaded files are handed back positioned at their end.
pub struct DownloadOnlyStorage {
    id: ContentId,
    content: Vec<u8>,
    downloads: AtomicUsize,
}

impl DownloadOnlyStorage {
    pub fn new(id: ContentId, content: &[u8]) -> Self {
        Self {
            id,
            content: content.to_vec(),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

impl Storage for DownloadOnlyStorage {
    fn name(&self) -> &str {
        "download-only"
    }

    fn exists(&self, id: &ContentId) -> StorageResult<bool> {
        Ok(*id == self.id)
    }

    fn as_downloader(&self) -> Option<&dyn Download> {
        Some(self)
    }
}

impl Download for DownloadOnlyStorage {
    fn download(&self, id: &ContentId) -> StorageResult<NamedTempFile> {
        if *id != self.id {
            return Err(StorageError::NotFound(id.clone()));
        }
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let mut file = tempfile::Builder::new().prefix("native").tempfile()?;
        file.write_all(&self.content)?;
        file.flush()?;
        Ok(file)
    }
}

/// Claims to hold everything but offers no optional capability.
pub struct ExistsOnlyStorage {
    _tag: u8,
}

impl ExistsOnlyStorage {
    pub fn new() -> Self {
        Self { _tag: 0 }
    }
}

impl Storage for ExistsOnlyStorage {
    fn name(&self) -> &str {
        "exists-only"
    }

    fn exists(&self, _id: &ContentId) -> StorageResult<bool> {
        Ok(true)
    }
}
