//! The capability contract storage backends implement.
//!
//! Existence checks are mandatory. Every other operation is a separate narrow
//! trait, exposed through an `as_*` accessor on [`Storage`] so callers can
//! tell whether a backend supports it without invoking it.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Seek};

use caf_types::ContentId;
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

/// A rewindable byte stream returned by [`Open::open`].
pub trait ContentStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> ContentStream for T {}

/// A content-addressed storage backend.
///
/// Implementations must be thread-safe (`Send + Sync`); a single backend is
/// shared by every handle that resolves through the registry.
pub trait Storage: Send + Sync {
    /// Human-readable name for logs and diagnostics.
    fn name(&self) -> &str {
        "storage"
    }

    /// Whether this backend holds `id`.
    fn exists(&self, id: &ContentId) -> StorageResult<bool>;

    /// Streaming reads, if supported.
    fn as_opener(&self) -> Option<&dyn Open> {
        None
    }

    /// Native download to a local file, if supported.
    fn as_downloader(&self) -> Option<&dyn Download> {
        None
    }

    /// URL generation, if supported.
    fn as_url_provider(&self) -> Option<&dyn UrlProvider> {
        None
    }

    /// Deletion, if supported.
    fn as_deleter(&self) -> Option<&dyn Delete> {
        None
    }

    /// Identity of the underlying backend.
    ///
    /// Two registrations are duplicates when their identities are equal.
    /// Wrappers forward the identity of what they wrap. Zero-sized backends
    /// should override this, since they may share an address.
    fn identity(&self) -> StorageIdentity {
        StorageIdentity::of(self)
    }

    /// Snapshot of which optional capabilities this backend offers.
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            open: self.as_opener().is_some(),
            download: self.as_downloader().is_some(),
            url: self.as_url_provider().is_some(),
            delete: self.as_deleter().is_some(),
        }
    }
}

/// Open content for streaming reads.
pub trait Open: Send + Sync {
    fn open(&self, id: &ContentId) -> StorageResult<Box<dyn ContentStream>>;
}

/// Copy content into a local temporary file.
///
/// The returned file is removed from disk when it is dropped or closed.
pub trait Download: Send + Sync {
    fn download(&self, id: &ContentId) -> StorageResult<tempfile::NamedTempFile>;
}

/// Produce a URL for content.
pub trait UrlProvider: Send + Sync {
    fn url(&self, id: &ContentId, options: &UrlOptions) -> StorageResult<String>;
}

/// Remove content.
pub trait Delete: Send + Sync {
    fn delete(&self, id: &ContentId) -> StorageResult<()>;
}

/// Address of a backend object, used for registration dedup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StorageIdentity(usize);

impl StorageIdentity {
    /// Identity of `value` by address.
    pub fn of<T: ?Sized>(value: &T) -> Self {
        Self(value as *const T as *const () as usize)
    }
}

/// Optional capabilities a backend offers (existence is always present).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub open: bool,
    pub download: bool,
    pub url: bool,
    pub delete: bool,
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            ("exists", true),
            ("open", self.open),
            ("download", self.download),
            ("url", self.url),
            ("delete", self.delete),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect();
        write!(f, "{}", names.join(","))
    }
}

/// Backend-specific options forwarded to [`UrlProvider::url`]
/// (expiry, content disposition, host overrides...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlOptions(BTreeMap<String, String>);

impl UrlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an option.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
