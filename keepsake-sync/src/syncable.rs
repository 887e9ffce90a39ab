//! Mode-specific storage behind one capability set.
//!
//! Scheduling, change detection and the remote leg are shared; only how a
//! value is snapshotted, saved and loaded differs between modes.

use std::path::{Path, PathBuf};

use keepsake_core::{Mode, Namespace};

use crate::error::SyncError;
use crate::hasher;
use crate::local_store;
use crate::registry::{SharedObject, Store};
use crate::remote::RemoteMirror;

/// What the engine needs to know about a namespace's value.
pub trait Syncable: Send + Sync + 'static {
    fn mode(&self) -> Mode;

    /// Bytes representing the current value; `None` when there is nothing.
    fn snapshot(&self, local_file: &Path) -> Result<Option<Vec<u8>>, SyncError>;

    /// Persist `bytes` locally. Returns `false` when the mode keeps no local
    /// copy of its own.
    fn save_local(&self, local_file: &Path, bytes: &[u8]) -> Result<bool, SyncError>;

    /// Fold the local file into the in-memory value. Returns `false` when
    /// the mode never loads locally.
    fn load_local(&self, local_file: &Path) -> bool;
}

/// A JSON object owned by the engine.
#[derive(Debug, Clone)]
pub struct StructuredState {
    object: SharedObject,
}

impl StructuredState {
    pub fn new(object: SharedObject) -> Self {
        Self { object }
    }
}

impl Syncable for StructuredState {
    fn mode(&self) -> Mode {
        Mode::Structured
    }

    fn snapshot(&self, _local_file: &Path) -> Result<Option<Vec<u8>>, SyncError> {
        let encoded = hasher::encode_object(&self.object.snapshot())?;
        Ok(Some(encoded.into_bytes()))
    }

    fn save_local(&self, local_file: &Path, bytes: &[u8]) -> Result<bool, SyncError> {
        local_store::write_atomic(local_file, bytes)?;
        Ok(true)
    }

    fn load_local(&self, local_file: &Path) -> bool {
        self.object.merge_from(local_store::load_object(local_file));
        true
    }
}

/// An opaque payload the caller keeps at the local path.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobState;

impl Syncable for BlobState {
    fn mode(&self) -> Mode {
        Mode::Blob
    }

    fn snapshot(&self, local_file: &Path) -> Result<Option<Vec<u8>>, SyncError> {
        local_store::read_bytes(local_file)
    }

    fn save_local(&self, _local_file: &Path, _bytes: &[u8]) -> Result<bool, SyncError> {
        Ok(false)
    }

    fn load_local(&self, _local_file: &Path) -> bool {
        false
    }
}

/// Everything one registration's tasks share.
pub(crate) struct SyncContext {
    pub namespace: Namespace,
    pub store: Store,
    pub state: Box<dyn Syncable>,
    pub local_file: PathBuf,
    pub remote_file: String,
    pub mirror: Option<RemoteMirror>,
    pub debug: bool,
}
