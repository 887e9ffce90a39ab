//! Error types for keepsake-sync.

use std::path::PathBuf;

use thiserror::Error;

use keepsake_core::{CoreError, Namespace};

/// All errors that can arise from sync operations.
///
/// The background sync loop never returns these to the application; they are
/// logged and the in-memory value stays authoritative. They surface only from
/// registration and from direct library calls.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Namespace or configuration problem.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote endpoint rejected or failed an operation.
    #[error("remote {op} failed for '{path}': {message}")]
    Remote {
        op: &'static str,
        path: String,
        message: String,
    },

    /// The remote file does not exist.
    #[error("remote file not found: {path}")]
    RemoteNotFound { path: String },

    /// An operation needs the remote mirror but no credentials are set.
    #[error("remote mirror disabled: FTP_HOST, FTP_USER and FTP_PASS must all be set")]
    RemoteDisabled,

    /// The connection was torn down by `destroy`.
    #[error("remote {op} was aborted")]
    Aborted { op: &'static str },

    /// Another live registration already owns this namespace on the store.
    #[error("namespace '{0}' is already registered on this store")]
    NamespaceBusy(Namespace),

    /// `sync` was called outside a tokio runtime.
    #[error("no tokio runtime available to drive the sync task")]
    NoRuntime,

    /// A background task panicked or was cancelled unexpectedly.
    #[error("{task} task join failure: {message}")]
    Join { task: &'static str, message: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::Remote`].
pub(crate) fn remote_err(
    op: &'static str,
    path: impl Into<String>,
    message: impl ToString,
) -> SyncError {
    SyncError::Remote {
        op,
        path: path.into(),
        message: message.to_string(),
    }
}
