//! Ordered, deduplicated collection of registered storages.

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::read_only::ReadOnlyStorage;
use crate::traits::{Storage, StorageIdentity};

/// Registered storages, in first-registration order.
///
/// Cloning a registry yields another handle to the same set. Registration,
/// reset and iteration are serialized by a reader/writer lock; scans work on
/// a [`snapshot`](Self::snapshot) so backend calls never run under the lock.
///
/// Production code registers once at startup, usually on the
/// [`global`](Self::global) registry; tests create their own or call
/// [`reset`](Self::reset).
#[derive(Clone, Default)]
pub struct StorageRegistry {
    storages: Arc<RwLock<Vec<Registered>>>,
}

/// A registered backend with its identity, captured before registration.
#[derive(Clone)]
struct Registered {
    identity: StorageIdentity,
    storage: Arc<dyn Storage>,
}

impl StorageRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static StorageRegistry {
        static GLOBAL: OnceLock<StorageRegistry> = OnceLock::new();
        GLOBAL.get_or_init(StorageRegistry::new)
    }

    /// Append each storage unless the same backend is already registered.
    ///
    /// Order of first registration is kept; re-registering never moves a
    /// backend.
    pub fn register<I>(&self, storages: I) -> &Self
    where
        I: IntoIterator<Item = Arc<dyn Storage>>,
    {
        // Backend calls happen here, before the lock is taken.
        let candidates: Vec<_> = storages
            .into_iter()
            .map(|storage| {
                let name = storage.name().to_string();
                let capabilities = storage.capabilities();
                let entry = Registered {
                    identity: storage.identity(),
                    storage,
                };
                (entry, name, capabilities)
            })
            .collect();

        let mut registered = self.storages.write();
        for (entry, name, capabilities) in candidates {
            if registered.iter().any(|r| r.identity == entry.identity) {
                debug!(storage = %name, "storage already registered");
                continue;
            }
            info!(
                storage = %name,
                %capabilities,
                position = registered.len(),
                "storage registered"
            );
            registered.push(entry);
        }
        self
    }

    /// Wrap each storage in a [`ReadOnlyStorage`], then register it.
    ///
    /// A backend that is already registered (read-only or not) is left as it
    /// is.
    pub fn register_read_only<I>(&self, storages: I) -> &Self
    where
        I: IntoIterator<Item = Arc<dyn Storage>>,
    {
        self.register(
            storages
                .into_iter()
                .map(|s| Arc::new(ReadOnlyStorage::new(s)) as Arc<dyn Storage>),
        )
    }

    /// Register a single typed storage.
    pub fn add<S: Storage + 'static>(&self, storage: Arc<S>) -> &Self {
        self.register([storage as Arc<dyn Storage>])
    }

    /// Register a single typed storage as read-only.
    pub fn add_read_only<S: Storage + 'static>(&self, storage: Arc<S>) -> &Self {
        self.register_read_only([storage as Arc<dyn Storage>])
    }

    /// Remove every registered storage.
    pub fn reset(&self) -> &Self {
        let mut registered = self.storages.write();
        info!(removed = registered.len(), "storage registry reset");
        registered.clear();
        self
    }

    /// Ordered copy of the registered storages.
    pub fn snapshot(&self) -> Vec<Arc<dyn Storage>> {
        self.storages
            .read()
            .iter()
            .map(|r| Arc::clone(&r.storage))
            .collect()
    }

    /// Whether the backend behind `storage` is registered.
    pub fn contains(&self, storage: &dyn Storage) -> bool {
        let identity = storage.identity();
        self.storages.read().iter().any(|r| r.identity == identity)
    }

    pub fn len(&self) -> usize {
        self.storages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.storages.read().is_empty()
    }
}

impl fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .snapshot()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        f.debug_struct("StorageRegistry")
            .field("storages", &names)
            .finish()
    }
}
