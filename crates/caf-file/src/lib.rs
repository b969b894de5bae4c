//! Content-addressable file handles.
//!
//! A [`ContentAddressableFile`] is built from a content address alone. Which
//! storage actually holds the bytes is decided when an operation runs, by
//! scanning a [`StorageRegistry`] in registration order.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use caf_file::{ContentAddressableFile, ContentHasher, InMemoryStorage, StorageRegistry};
//!
//! let registry = StorageRegistry::new();
//! let cache = Arc::new(InMemoryStorage::new("cache"));
//! let store = Arc::new(InMemoryStorage::new("store"));
//! registry.add(cache).add(store.clone());
//!
//! let id = store.upload(&ContentHasher::default(), b"test content")?;
//! let mut file = ContentAddressableFile::with_registry(id, &registry);
//! assert!(file.exists());
//! let bytes = file.open_with(|f| f.read_to_vec())?;
//! assert_eq!(bytes, b"test content");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod download;
pub mod error;
pub mod file;
pub mod resolve;

#[cfg(test)]
mod testing;

pub use config::FileConfig;
pub use download::{CopySource, LocalCopy};
pub use error::{FileError, FileResult, Operation};
pub use file::ContentAddressableFile;
pub use resolve::{DeleteOutcome, DeleteReport, Probe, ProbeReport};

// Re-export key types
pub use caf_crypto::{AddressConfig, ContentHasher};
pub use caf_store::{
    InMemoryStorage, ReadOnlyStorage, Storage, StorageError, StorageRegistry, UrlOptions,
};
pub use caf_types::{ContentId, HashFunction, Multihash};
