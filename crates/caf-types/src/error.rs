use thiserror::Error;

/// Errors produced while decoding a multihash.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MultihashError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("empty multihash")]
    Empty,

    #[error("truncated varint")]
    TruncatedVarint,

    #[error("varint overflows 64 bits")]
    VarintOverflow,

    #[error("unknown hash function code: 0x{0:x}")]
    UnknownHashFunction(u64),

    #[error("unknown hash function name: {0}")]
    UnknownHashFunctionName(String),

    #[error("digest length mismatch: declared {declared}, got {actual}")]
    LengthMismatch { declared: u64, actual: usize },
}
