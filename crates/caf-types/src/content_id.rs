use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MultihashError;
use crate::multihash::{content_address, Multihash};

/// Identifier of a piece of content: optional `/`-separated path segments
/// followed by a hex-encoded multihash.
///
/// Construction never validates the multihash; decoding happens only when a
/// caller asks for it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wrap an id string as-is.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build an id from a multihash, optionally under `prefix`.
    ///
    /// The prefix and the hex are joined with a single `/`; a prefix keeps its
    /// own leading slash (`"/ipfs"` yields `"/ipfs/1220…"`).
    pub fn from_multihash(prefix: Option<&str>, multihash: &Multihash) -> Self {
        let hex = multihash.to_hex();
        match prefix {
            Some(prefix) => Self(format!("{}/{}", prefix.trim_end_matches('/'), hex)),
            None => Self(hex),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The content-address component: the segment after the last `/`.
    pub fn content_address(&self) -> &str {
        content_address(&self.0)
    }

    /// Everything before the content address, without the separating `/`.
    pub fn prefix(&self) -> Option<&str> {
        self.0.rfind('/').map(|pos| &self.0[..pos])
    }

    /// Decode the content address as a multihash.
    pub fn decode(&self) -> Result<Multihash, MultihashError> {
        Multihash::from_hex(self.content_address())
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ContentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
