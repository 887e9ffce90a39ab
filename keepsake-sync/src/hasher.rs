//! Content hashing for change detection.
//!
//! Digests are SHA-256 over the exact bytes that would be written: the
//! pretty-printed JSON in structured mode, the raw payload in blob mode.
//! They are compared for equality only.

use std::fmt;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::SyncError;

/// Digest of a namespace's persisted representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentDigest {
    /// No content at all. Never equal to the digest of real bytes.
    Empty,
    /// Hex-encoded SHA-256.
    Sha256(String),
}

impl ContentDigest {
    /// Digest raw bytes; `None` is [`ContentDigest::Empty`].
    pub fn of_bytes(bytes: Option<&[u8]>) -> Self {
        match bytes {
            None => ContentDigest::Empty,
            Some(bytes) => {
                let mut h = Sha256::new();
                h.update(bytes);
                ContentDigest::Sha256(hex::encode(h.finalize()))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ContentDigest::Empty)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentDigest::Empty => f.write_str("<empty>"),
            ContentDigest::Sha256(hex) => f.write_str(hex),
        }
    }
}

/// Serialize a structured value the way it is written to disk: pretty JSON,
/// two-space indent.
pub fn encode_object(object: &Map<String, Value>) -> Result<String, SyncError> {
    Ok(serde_json::to_string_pretty(object)?)
}

/// Digest of a structured value's on-disk encoding.
pub fn digest_object(object: &Map<String, Value>) -> Result<ContentDigest, SyncError> {
    let encoded = encode_object(object)?;
    Ok(ContentDigest::of_bytes(Some(encoded.as_bytes())))
}
