//! Digest cache — last persisted digest per namespace.
//!
//! Used solely to skip redundant writes. An entry is recorded as soon as a
//! local write is attempted; a failed upload never rolls it back.

use std::collections::HashMap;

use keepsake_core::Namespace;

use crate::hasher::ContentDigest;

#[derive(Debug, Default, Clone)]
pub struct DigestCache {
    entries: HashMap<Namespace, ContentDigest>,
}

impl DigestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when `digest` equals the last one recorded for `namespace`.
    ///
    /// A namespace with no entry is never current, so the first persist
    /// always writes.
    pub fn is_current(&self, namespace: &Namespace, digest: &ContentDigest) -> bool {
        self.entries.get(namespace) == Some(digest)
    }

    /// Record `digest` and report whether it differed from the previous entry.
    pub fn record(&mut self, namespace: &Namespace, digest: ContentDigest) -> bool {
        if self.is_current(namespace, &digest) {
            return false;
        }
        self.entries.insert(namespace.clone(), digest);
        true
    }

    pub fn get(&self, namespace: &Namespace) -> Option<&ContentDigest> {
        self.entries.get(namespace)
    }
}
