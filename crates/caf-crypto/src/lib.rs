//! Content hashing for content-addressable files.
//!
//! Turns bytes into [`caf_types::ContentId`]s: the content is hashed with a
//! configurable function, wrapped as a multihash, and optionally placed under
//! a path prefix. All crypto operations wrap established libraries.

pub mod hasher;

pub use hasher::{AddressConfig, ContentHasher, HasherError};
