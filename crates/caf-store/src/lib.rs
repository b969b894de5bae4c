//! Storage contract and registry for content-addressable files.
//!
//! Backends hold content keyed by [`caf_types::ContentId`]. They differ in
//! what they can do, so the contract is split into one mandatory check and a
//! set of optional capabilities the resolver can query without invoking.
//!
//! # Capabilities
//!
//! - [`Storage::exists`] -- mandatory; drives pinning
//! - [`Open`] -- streaming reads
//! - [`Download`] -- native copy to a local temp file
//! - [`UrlProvider`] -- URL generation
//! - [`Delete`] -- removal
//!
//! # Registration
//!
//! - [`StorageRegistry`] -- ordered, deduplicated set of backends
//! - [`ReadOnlyStorage`] -- strips [`Delete`] from a backend before registration
//! - [`InMemoryStorage`] -- `HashMap`-based backend for tests and embedding
//!
//! # Design Rules
//!
//! 1. Registration order is resolution order and never changes.
//! 2. A backend is registered at most once, wrapped or not.
//! 3. Capability checks never invoke the capability.
//! 4. Backend calls never run while the registry lock is held.

pub mod error;
pub mod memory;
pub mod read_only;
pub mod registry;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStorage;
pub use read_only::ReadOnlyStorage;
pub use registry::StorageRegistry;
pub use traits::{
    Capabilities, ContentStream, Delete, Download, Open, Storage, StorageIdentity, UrlOptions,
    UrlProvider,
};
