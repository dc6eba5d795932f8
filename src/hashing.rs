//! Content hashing over a chunk's files.
//!
//! The hash function, digest encoding and digest length come from the host
//! build configuration and mirror its output option names, so manifest hashes
//! look like the bundler's own content hashes.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;
use xxhash_rust::xxh64::Xxh64;

use crate::assets::AssetSource;
use crate::errors::{ManifestError, Result};

/// Supported hash functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashFunction {
    /// XXHash64 (fast, non-cryptographic)
    #[default]
    Xxhash64,
    Sha256,
    Sha512,
    Blake3,
}

impl HashFunction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Xxhash64 => "xxhash64",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }
}

impl FromStr for HashFunction {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "xxhash64" | "xxh64" => Ok(Self::Xxhash64),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            other => Err(ManifestError::config(format!(
                "Unsupported hash function '{}'. Use xxhash64, sha256, sha512 or blake3",
                other
            ))),
        }
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Text encoding applied to the raw digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestEncoding {
    #[default]
    Hex,
    Base64,
    Base64url,
}

impl DigestEncoding {
    pub fn encode(&self, digest: &[u8]) -> String {
        match self {
            Self::Hex => hex::encode(digest),
            Self::Base64 => STANDARD.encode(digest),
            Self::Base64url => URL_SAFE_NO_PAD.encode(digest),
        }
    }
}

impl FromStr for DigestEncoding {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "hex" => Ok(Self::Hex),
            "base64" => Ok(Self::Base64),
            "base64url" => Ok(Self::Base64url),
            other => Err(ManifestError::config(format!(
                "Unsupported hash digest '{}'. Use hex, base64 or base64url",
                other
            ))),
        }
    }
}

/// Hash settings of the host build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct HashConfig {
    pub hash_function: HashFunction,
    pub hash_digest: DigestEncoding,
    /// Number of characters kept from the encoded digest
    pub hash_digest_length: usize,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            hash_function: HashFunction::default(),
            hash_digest: DigestEncoding::default(),
            hash_digest_length: 20,
        }
    }
}

impl HashConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hash_digest_length == 0 {
            return Err(ManifestError::config("hashDigestLength must be at least 1"));
        }
        Ok(())
    }

    /// Encode and truncate a finished digest
    pub fn render(&self, digest: &[u8]) -> String {
        self.hash_digest
            .encode(digest)
            .chars()
            .take(self.hash_digest_length)
            .collect()
    }
}

/// Incremental hash accumulator
pub enum ContentHasher {
    Xxhash64(Xxh64),
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl ContentHasher {
    pub fn new(function: HashFunction) -> Self {
        match function {
            HashFunction::Xxhash64 => Self::Xxhash64(Xxh64::new(0)),
            HashFunction::Sha256 => Self::Sha256(Sha256::new()),
            HashFunction::Sha512 => Self::Sha512(Sha512::new()),
            HashFunction::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        match self {
            Self::Xxhash64(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
        self
    }

    /// Raw digest bytes
    pub fn finalize(self) -> Vec<u8> {
        match self {
            Self::Xxhash64(h) => h.digest().to_be_bytes().to_vec(),
            Self::Sha256(h) => h.finalize().to_vec(),
            Self::Sha512(h) => h.finalize().to_vec(),
            Self::Blake3(h) => h.finalize().as_bytes().to_vec(),
        }
    }
}

/// Hash the content of a chunk's files.
///
/// Filenames are sorted first so the digest does not depend on the order the
/// host enumerated them in. Every file must be available from `assets`;
/// `chunk` only labels the error otherwise.
pub fn compute_hash<S, A>(files: &[S], assets: &A, config: &HashConfig, chunk: &str) -> Result<String>
where
    S: AsRef<str>,
    A: AssetSource + ?Sized,
{
    let mut sorted: Vec<&str> = files.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let mut hasher = ContentHasher::new(config.hash_function);
    for name in sorted {
        let bytes = assets.source(name).ok_or_else(|| ManifestError::MissingAsset {
            chunk: chunk.to_string(),
            file: name.to_string(),
        })?;
        hasher.update(&bytes);
    }

    Ok(config.render(&hasher.finalize()))
}
