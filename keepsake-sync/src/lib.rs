//! # keepsake-sync
//!
//! Ambient persistence for small in-process values: a namespace is kept in
//! step between memory, a local file and an optional remote mirror.
//!
//! Call [`sync`] inside a tokio runtime to register a namespace on a
//! [`Store`]. Bootstrap pulls the remote copy, merges the local file over the
//! in-memory defaults and fires the ready callbacks; the scheduler then
//! persists on an interval, skipping cycles whose content digest did not
//! change.

/// Log at `$level` when the registration is in debug mode, `debug` otherwise.
macro_rules! verbose {
    ($debug:expr, $level:ident, $($arg:tt)+) => {
        if $debug {
            tracing::$level!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

pub mod bootstrap;
pub mod controller;
pub mod digest_cache;
pub mod error;
#[cfg(feature = "ftp")]
pub mod ftp;
pub mod hasher;
pub mod local_store;
pub mod registry;
pub mod remote;
pub mod scheduler;
pub mod syncable;

pub use bootstrap::{BootstrapReport, FetchOutcome};
pub use controller::{sync, BlobControl, Namespaced, SyncHandle, SyncOptions, Synced};
pub use error::SyncError;
#[cfg(feature = "ftp")]
pub use ftp::FtpTransport;
pub use hasher::ContentDigest;
pub use registry::{SharedObject, Store};
pub use remote::{Connection, DirectoryTransport, RemoteMirror, Transport};
pub use scheduler::{PersistOutcome, PersistReport, Schedule, UploadStatus};
pub use syncable::{BlobState, StructuredState, Syncable};
