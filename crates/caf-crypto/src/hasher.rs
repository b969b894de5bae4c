use std::io::Read;

use caf_types::{ContentId, HashFunction, Multihash, MultihashError};
use serde::{Deserialize, Serialize};
use sha2::Digest;

/// How content addresses are generated: the hash function and an optional
/// path prefix placed in front of the hex multihash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressConfig {
    /// Hash function applied to the content.
    pub hash: HashFunction,
    /// Prefix joined to the multihash with `/` (e.g. `"/ipfs"`).
    pub prefix: Option<String>,
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            hash: HashFunction::Sha2_256,
            prefix: None,
        }
    }
}

impl AddressConfig {
    /// Parse a JSON config document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, HasherError> {
        serde_json::from_str(json).map_err(|e| HasherError::Config(e.to_string()))
    }
}

/// Hashes content and wraps the digest as a [`ContentId`].
///
/// Only functions with a hashing implementation in this workspace can be
/// used to *generate* addresses; any function in the multihash table can
/// still be decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    function: HashFunction,
    prefix: Option<String>,
}

impl ContentHasher {
    /// Default hasher: sha2-256, no prefix.
    pub const SHA2_256: Self = Self {
        function: HashFunction::Sha2_256,
        prefix: None,
    };
    /// blake3, no prefix.
    pub const BLAKE3: Self = Self {
        function: HashFunction::Blake3,
        prefix: None,
    };

    /// Create a hasher for `function`.
    pub fn new(function: HashFunction) -> Result<Self, HasherError> {
        if !Self::supports(function) {
            return Err(HasherError::Unsupported(function));
        }
        Ok(Self {
            function,
            prefix: None,
        })
    }

    /// Build a hasher from an [`AddressConfig`].
    pub fn from_config(config: &AddressConfig) -> Result<Self, HasherError> {
        let hasher = Self::new(config.hash)?;
        Ok(match &config.prefix {
            Some(prefix) => hasher.with_prefix(prefix.clone()),
            None => hasher,
        })
    }

    /// Place generated ids under `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Whether addresses can be generated with `function`.
    pub fn supports(function: HashFunction) -> bool {
        matches!(
            function,
            HashFunction::Identity
                | HashFunction::Md5
                | HashFunction::Sha1
                | HashFunction::Sha2_256
                | HashFunction::Sha2_512
                | HashFunction::Blake3
        )
    }

    pub fn function(&self) -> HashFunction {
        self.function
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Raw digest of `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut state = DigestState::start(self.function);
        state.update(data);
        state.finish()
    }

    /// Raw digest of everything `reader` yields.
    pub fn digest_reader<R: Read>(&self, mut reader: R) -> Result<Vec<u8>, HasherError> {
        let mut state = DigestState::start(self.function);
        let mut buf = [0u8; 8192];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            state.update(&buf[..n]);
        }
        Ok(state.finish())
    }

    /// Digest of `data` wrapped as a multihash.
    pub fn multihash(&self, data: &[u8]) -> Multihash {
        Multihash::new(self.function, self.digest(data))
    }

    /// Content id for `data`, under this hasher's prefix.
    pub fn content_id(&self, data: &[u8]) -> ContentId {
        ContentId::from_multihash(self.prefix(), &self.multihash(data))
    }

    /// Content id for everything `reader` yields.
    pub fn content_id_from_reader<R: Read>(&self, reader: R) -> Result<ContentId, HasherError> {
        let digest = self.digest_reader(reader)?;
        let mh = Multihash::new(self.function, digest);
        Ok(ContentId::from_multihash(self.prefix(), &mh))
    }

    /// Verify that `data` hashes to the address in `id`.
    ///
    /// Uses the hash function recorded in the id, not this hasher's own, so
    /// addresses generated before a hash function change still verify.
    /// Fails when the id does not decode or names a function with no local
    /// implementation; `Ok(false)` always means the content does not match.
    pub fn verify(data: &[u8], id: &ContentId) -> Result<bool, HasherError> {
        let mh = id.decode()?;
        let hasher = Self::new(mh.function())?;
        Ok(hasher.digest(data) == mh.digest())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::SHA2_256
    }
}

/// Incremental digest state for the functions [`ContentHasher`] supports.
enum DigestState {
    Identity(Vec<u8>),
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn start(function: HashFunction) -> Self {
        match function {
            HashFunction::Md5 => Self::Md5(md5::Md5::new()),
            HashFunction::Sha1 => Self::Sha1(sha1::Sha1::new()),
            HashFunction::Sha2_256 => Self::Sha256(sha2::Sha256::new()),
            HashFunction::Sha2_512 => Self::Sha512(sha2::Sha512::new()),
            HashFunction::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            // `new` rejects everything else; identity is the inert fallback.
            _ => Self::Identity(Vec::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Identity(buf) => buf.extend_from_slice(data),
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finish(self) -> Vec<u8> {
        match self {
            Self::Identity(buf) => buf,
            Self::Md5(h) => h.finalize().to_vec(),
            Self::Sha1(h) => h.finalize().to_vec(),
            Self::Sha256(h) => h.finalize().to_vec(),
            Self::Sha512(h) => h.finalize().to_vec(),
            Self::Blake3(h) => h.finalize().as_bytes().to_vec(),
        }
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error)]
pub enum HasherError {
    #[error("no hashing implementation for {0}")]
    Unsupported(HashFunction),

    #[error("invalid content address: {0}")]
    InvalidAddress(#[from] MultihashError),

    #[error("invalid address config: {0}")]
    Config(String),

    #[error("I/O error while hashing: {0}")]
    Io(#[from] std::io::Error),
}
