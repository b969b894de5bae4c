use caf_types::ContentId;

/// Errors raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend does not hold the requested content.
    #[error("content not found: {0}")]
    NotFound(ContentId),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure (network, permissions, quota...).
    #[error("backend error in {backend}: {reason}")]
    Backend { backend: String, reason: String },

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// The backend was asked to mutate but only allows reads.
    #[error("storage is read-only")]
    ReadOnly,
}

impl StorageError {
    /// Shorthand for [`StorageError::Backend`].
    pub fn backend(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
