//! Namespace registry — live values and digests, owned by the caller.
//!
//! A [`Store`] is cheap to clone; clones share state. Independent stores
//! never see each other's namespaces, and a store refuses a second live
//! registration of a namespace it already syncs.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};

use keepsake_core::Namespace;

use crate::digest_cache::DigestCache;
use crate::error::SyncError;
use crate::hasher::ContentDigest;

// ---------------------------------------------------------------------------
// SharedObject
// ---------------------------------------------------------------------------

/// The live structured value of a namespace.
///
/// Always a JSON object. Locks are held only for the duration of a read or a
/// mutation; the sync engine takes a snapshot before any I/O.
#[derive(Debug, Clone, Default)]
pub struct SharedObject(Arc<RwLock<Map<String, Value>>>);

impl SharedObject {
    pub fn new(object: Map<String, Value>) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Map<String, Value>> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Map<String, Value>> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access and return its result.
    pub fn update<R>(&self, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        f(&mut self.write())
    }

    /// Replace the whole value.
    pub fn replace(&self, object: Map<String, Value>) {
        *self.write() = object;
    }

    pub fn snapshot(&self) -> Map<String, Value> {
        self.read().clone()
    }

    /// Shallow merge: keys from `loaded` override keys already present.
    pub fn merge_from(&self, loaded: Map<String, Value>) {
        let mut guard = self.write();
        for (key, value) in loaded {
            guard.insert(key, value);
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StoreInner {
    objects: Mutex<HashMap<Namespace, SharedObject>>,
    digests: Mutex<DigestCache>,
    active: Mutex<HashSet<Namespace>>,
}

/// Explicit home for namespace values and the digest cache.
#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live object for `namespace`, created empty on first use.
    ///
    /// Callers may seed defaults here before registering; bootstrap merges
    /// the local file over them.
    pub fn object(&self, namespace: &Namespace) -> SharedObject {
        lock(&self.inner.objects)
            .entry(namespace.clone())
            .or_default()
            .clone()
    }

    /// Last digest persisted for `namespace`.
    pub fn last_digest(&self, namespace: &Namespace) -> Option<ContentDigest> {
        lock(&self.inner.digests).get(namespace).cloned()
    }

    /// Record `digest` unless it is already current. Returns `true` when the
    /// caller should go on to write.
    pub(crate) fn record_if_changed(&self, namespace: &Namespace, digest: ContentDigest) -> bool {
        lock(&self.inner.digests).record(namespace, digest)
    }

    /// `true` while a registration for `namespace` is running.
    pub fn is_active(&self, namespace: &Namespace) -> bool {
        lock(&self.inner.active).contains(namespace)
    }

    /// Reserve `namespace` for one registration until the guard drops.
    pub(crate) fn claim(&self, namespace: &Namespace) -> Result<Claim, SyncError> {
        if !lock(&self.inner.active).insert(namespace.clone()) {
            return Err(SyncError::NamespaceBusy(namespace.clone()));
        }
        Ok(Claim {
            store: self.clone(),
            namespace: namespace.clone(),
        })
    }
}

/// Exclusive hold on a namespace; released on drop.
#[derive(Debug)]
pub(crate) struct Claim {
    store: Store,
    namespace: Namespace,
}

impl Drop for Claim {
    fn drop(&mut self) {
        lock(&self.store.inner.active).remove(&self.namespace);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
