//! Foundation types for content-addressable files.
//!
//! Content is named by a multihash of its bytes rather than by location. This
//! crate provides the identifier type and the codec every other crate in the
//! workspace depends on.
//!
//! # Key Types
//!
//! - [`ContentId`] -- `[prefix "/"]* hex(multihash)` identifier string
//! - [`Multihash`] -- self-describing digest (hash function, length, bytes)
//! - [`HashFunction`] -- the multihash function table
//!
//! # Wire Format
//!
//! ```text
//! multihash = varint(code) ++ varint(digest length) ++ digest
//! id        = [prefix "/"] hex(multihash)
//! ```

pub mod content_id;
pub mod error;
pub mod multihash;
pub mod varint;

pub use content_id::ContentId;
pub use error::MultihashError;
pub use multihash::{content_address, HashFunction, Multihash};
