use std::fmt;
use std::sync::Arc;

use caf_types::ContentId;

use crate::error::StorageResult;
use crate::traits::{Delete, Download, Open, Storage, StorageIdentity, UrlProvider};

/// Wraps a backend and exposes only its non-mutating capabilities.
///
/// `as_deleter` always returns `None`, whatever the wrapped backend offers, so
/// a fan-out delete can never reach content through this registration.
#[derive(Clone)]
pub struct ReadOnlyStorage {
    inner: Arc<dyn Storage>,
}

impl ReadOnlyStorage {
    pub fn new(inner: Arc<dyn Storage>) -> Self {
        Self { inner }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &Arc<dyn Storage> {
        &self.inner
    }
}

impl Storage for ReadOnlyStorage {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn exists(&self, id: &ContentId) -> StorageResult<bool> {
        self.inner.exists(id)
    }

    fn as_opener(&self) -> Option<&dyn Open> {
        self.inner.as_opener()
    }

    fn as_downloader(&self) -> Option<&dyn Download> {
        self.inner.as_downloader()
    }

    fn as_url_provider(&self) -> Option<&dyn UrlProvider> {
        self.inner.as_url_provider()
    }

    fn as_deleter(&self) -> Option<&dyn Delete> {
        None
    }

    fn identity(&self) -> StorageIdentity {
        self.inner.identity()
    }
}

impl fmt::Debug for ReadOnlyStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnlyStorage")
            .field("inner", &self.inner.name())
            .finish()
    }
}
