use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MultihashError;
use crate::varint::{decode_varint, encode_varint};

/// Hash functions from the multihash table.
///
/// The numeric code is written in front of every digest so that the hashing
/// method can change without losing access to addresses computed earlier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HashFunction {
    #[serde(rename = "identity")]
    Identity,
    #[serde(rename = "sha1")]
    Sha1,
    #[serde(rename = "sha2-256", alias = "sha256")]
    Sha2_256,
    #[serde(rename = "sha2-512", alias = "sha512")]
    Sha2_512,
    #[serde(rename = "sha3-512")]
    Sha3_512,
    #[serde(rename = "sha3-384")]
    Sha3_384,
    #[serde(rename = "sha3-256")]
    Sha3_256,
    #[serde(rename = "sha3-224")]
    Sha3_224,
    #[serde(rename = "shake-128")]
    Shake128,
    #[serde(rename = "shake-256")]
    Shake256,
    #[serde(rename = "keccak-224")]
    Keccak224,
    #[serde(rename = "keccak-256")]
    Keccak256,
    #[serde(rename = "keccak-384")]
    Keccak384,
    #[serde(rename = "keccak-512")]
    Keccak512,
    #[serde(rename = "blake3")]
    Blake3,
    #[serde(rename = "md5")]
    Md5,
    #[serde(rename = "blake2b-256")]
    Blake2b256,
    #[serde(rename = "blake2b-512")]
    Blake2b512,
    #[serde(rename = "blake2s-256")]
    Blake2s256,
}

impl HashFunction {
    /// Every function in the table.
    pub const ALL: [Self; 19] = [
        Self::Identity,
        Self::Sha1,
        Self::Sha2_256,
        Self::Sha2_512,
        Self::Sha3_512,
        Self::Sha3_384,
        Self::Sha3_256,
        Self::Sha3_224,
        Self::Shake128,
        Self::Shake256,
        Self::Keccak224,
        Self::Keccak256,
        Self::Keccak384,
        Self::Keccak512,
        Self::Blake3,
        Self::Md5,
        Self::Blake2b256,
        Self::Blake2b512,
        Self::Blake2s256,
    ];

    /// The multihash code.
    pub const fn code(&self) -> u64 {
        match self {
            Self::Identity => 0x00,
            Self::Sha1 => 0x11,
            Self::Sha2_256 => 0x12,
            Self::Sha2_512 => 0x13,
            Self::Sha3_512 => 0x14,
            Self::Sha3_384 => 0x15,
            Self::Sha3_256 => 0x16,
            Self::Sha3_224 => 0x17,
            Self::Shake128 => 0x18,
            Self::Shake256 => 0x19,
            Self::Keccak224 => 0x1a,
            Self::Keccak256 => 0x1b,
            Self::Keccak384 => 0x1c,
            Self::Keccak512 => 0x1d,
            Self::Blake3 => 0x1e,
            Self::Md5 => 0xd5,
            Self::Blake2b256 => 0xb220,
            Self::Blake2b512 => 0xb240,
            Self::Blake2s256 => 0xb260,
        }
    }

    /// Look up a function by its multihash code.
    pub fn from_code(code: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.code() == code)
    }

    /// Canonical multihash name (e.g. `"sha2-256"`).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Sha1 => "sha1",
            Self::Sha2_256 => "sha2-256",
            Self::Sha2_512 => "sha2-512",
            Self::Sha3_512 => "sha3-512",
            Self::Sha3_384 => "sha3-384",
            Self::Sha3_256 => "sha3-256",
            Self::Sha3_224 => "sha3-224",
            Self::Shake128 => "shake-128",
            Self::Shake256 => "shake-256",
            Self::Keccak224 => "keccak-224",
            Self::Keccak256 => "keccak-256",
            Self::Keccak384 => "keccak-384",
            Self::Keccak512 => "keccak-512",
            Self::Blake3 => "blake3",
            Self::Md5 => "md5",
            Self::Blake2b256 => "blake2b-256",
            Self::Blake2b512 => "blake2b-512",
            Self::Blake2s256 => "blake2s-256",
        }
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashFunction {
    type Err = MultihashError;

    /// Accepts canonical names plus the short `sha256`/`sha512` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let name = match name.as_str() {
            "sha256" => "sha2-256",
            "sha512" => "sha2-512",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| MultihashError::UnknownHashFunctionName(s.to_string()))
    }
}

/// A self-describing digest: hash function, digest length and digest bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Multihash {
    function: HashFunction,
    digest: Vec<u8>,
}

impl Multihash {
    /// Wrap a raw digest produced by `function`.
    pub fn new(function: HashFunction, digest: impl Into<Vec<u8>>) -> Self {
        Self {
            function,
            digest: digest.into(),
        }
    }

    pub fn function(&self) -> HashFunction {
        self.function
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Digest length in bytes, as written in the header.
    pub fn length(&self) -> usize {
        self.digest.len()
    }

    /// Binary form: `varint(code) ++ varint(length) ++ digest`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.digest.len() + 4);
        encode_varint(&mut buf, self.function.code());
        encode_varint(&mut buf, self.digest.len() as u64);
        buf.extend_from_slice(&self.digest);
        buf
    }

    /// Lower-case hex of [`to_bytes`](Self::to_bytes).
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Encode `digest` under `function` straight to hex.
    pub fn encode(digest: &[u8], function: HashFunction) -> String {
        Self::new(function, digest).to_hex()
    }

    /// Parse the binary form.
    ///
    /// Headers are read as varints. Addresses written with the older
    /// single-byte header (one byte of code, one byte of length) are accepted
    /// when the varint reading does not yield a valid multihash but the
    /// single-byte reading does.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MultihashError> {
        if bytes.is_empty() {
            return Err(MultihashError::Empty);
        }
        match Self::parse_varint_header(bytes) {
            Ok(mh) => Ok(mh),
            Err(err) => Self::parse_single_byte_header(bytes).ok_or(err),
        }
    }

    /// Parse the hex form.
    pub fn from_hex(s: &str) -> Result<Self, MultihashError> {
        let bytes = hex::decode(s).map_err(|e| MultihashError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Decode the content-address component of an id: the segment after the
    /// last `/`.
    pub fn decode(id: &str) -> Result<Self, MultihashError> {
        Self::from_hex(content_address(id))
    }

    fn parse_varint_header(bytes: &[u8]) -> Result<Self, MultihashError> {
        let (code, used) = decode_varint(bytes)?;
        let function =
            HashFunction::from_code(code).ok_or(MultihashError::UnknownHashFunction(code))?;
        let rest = &bytes[used..];
        let (declared, used) = decode_varint(rest)?;
        let digest = &rest[used..];
        if declared != digest.len() as u64 {
            return Err(MultihashError::LengthMismatch {
                declared,
                actual: digest.len(),
            });
        }
        Ok(Self::new(function, digest))
    }

    fn parse_single_byte_header(bytes: &[u8]) -> Option<Self> {
        let (&code, rest) = bytes.split_first()?;
        let (&declared, digest) = rest.split_first()?;
        let function = HashFunction::from_code(code as u64)?;
        (declared as usize == digest.len()).then(|| Self::new(function, digest))
    }
}

impl fmt::Display for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// The substring after the last `/` (the whole string if there is none).
pub fn content_address(id: &str) -> &str {
    match id.rfind('/') {
        Some(pos) => &id[pos + 1..],
        None => id,
    }
}
