use std::fmt;
use std::io;

use caf_store::StorageError;
use caf_types::{ContentId, HashFunction, MultihashError};
use thiserror::Error;

/// Operations a handle delegates and that may be unavailable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Streaming reads from the pinned storage.
    Open,
    /// URL generation by the pinned storage.
    Url,
    /// Re-hashing fetched content with the address's own function.
    Verify(HashFunction),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Url => write!(f, "url"),
            Self::Verify(function) => write!(f, "verify with {function}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FileError {
    /// The content address is not a decodable multihash.
    #[error("invalid multihash in {id}: {source}")]
    InvalidMultihash {
        id: ContentId,
        #[source]
        source: MultihashError,
    },

    /// No registered storage reports holding the content.
    #[error("content not found in any registered storage: {0}")]
    NotFound(ContentId),

    /// The pinned storage, or the local hasher, cannot perform the call.
    #[error("{provider} does not support {operation}")]
    UnsupportedOperation { provider: String, operation: Operation },

    /// A stream method was called with no open session.
    #[error("no open stream")]
    NoOpenStream,

    /// `open` was called while a session was already open.
    #[error("a stream is already open for {0}")]
    SessionAlreadyOpen(ContentId),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type FileResult<T> = Result<T, FileError>;

impl From<FileError> for io::Error {
    fn from(err: FileError) -> Self {
        match err {
            FileError::Io(e) => e,
            FileError::Storage(StorageError::Io(e)) => e,
            FileError::NoOpenStream => io::Error::new(io::ErrorKind::NotConnected, err),
            FileError::NotFound(_) => io::Error::new(io::ErrorKind::NotFound, err),
            FileError::UnsupportedOperation { .. } => io::Error::new(io::ErrorKind::Unsupported, err),
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
