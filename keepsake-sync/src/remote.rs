//! Remote mirror — whole-file fetch and upload over a file-transfer
//! connection.
//!
//! Every operation opens its own connection, performs one transfer and
//! closes it; nothing is pooled. Transports are synchronous, so each
//! operation runs on the blocking pool inside an abortable task. The abort
//! handle of the most recent operation is kept per mirror so
//! [`RemoteMirror::destroy`] can tear it down.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::AbortHandle;

use keepsake_core::Credentials;

use crate::error::{io_err, remote_err, SyncError};
use crate::local_store;

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// Opens connections to a remote endpoint.
pub trait Transport: Send + Sync + 'static {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Connection>, SyncError>;
}

/// One open connection. Dropped after a single operation.
pub trait Connection: Send {
    /// Download the whole file at `remote_path`.
    fn retrieve(&mut self, remote_path: &str) -> Result<Vec<u8>, SyncError>;

    /// Replace the whole file at `remote_path` with `bytes`.
    fn store(&mut self, remote_path: &str, bytes: &[u8]) -> Result<(), SyncError>;

    fn close(self: Box<Self>) -> Result<(), SyncError>;
}

// ---------------------------------------------------------------------------
// RemoteMirror
// ---------------------------------------------------------------------------

/// Remote leg of one registration.
#[derive(Clone)]
pub struct RemoteMirror {
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    latest: Arc<Mutex<Option<AbortHandle>>>,
}

impl std::fmt::Debug for RemoteMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteMirror")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl RemoteMirror {
    pub fn new(credentials: Credentials, transport: Arc<dyn Transport>) -> Self {
        Self {
            credentials,
            transport,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    /// Build a mirror only when credentials are present.
    pub fn configured(
        credentials: Option<Credentials>,
        transport: Option<Arc<dyn Transport>>,
    ) -> Option<Self> {
        Some(Self::new(credentials?, transport?))
    }

    pub fn host(&self) -> &str {
        &self.credentials.host
    }

    /// Download `remote_path`.
    pub async fn fetch(&self, remote_path: &str) -> Result<Vec<u8>, SyncError> {
        let path = remote_path.to_string();
        self.run("fetch", move |conn| conn.retrieve(&path)).await
    }

    /// Push the current contents of `local_file` to `remote_path`.
    pub async fn upload(&self, local_file: &Path, remote_path: &str) -> Result<(), SyncError> {
        let bytes = local_store::read_bytes(local_file)?
            .ok_or_else(|| io_err(local_file, std::io::Error::from(ErrorKind::NotFound)))?;
        let path = remote_path.to_string();
        self.run("upload", move |conn| conn.store(&path, &bytes)).await
    }

    /// Abort the most recently started operation, if any.
    ///
    /// Only the latest operation is tracked; earlier ones still in flight are
    /// left alone. The blocking transfer itself cannot be interrupted, so its
    /// result is discarded rather than cancelled. Returns `true` when an
    /// operation was tracked.
    pub fn destroy(&self) -> bool {
        let handle = self
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    async fn run<T, F>(&self, op: &'static str, work: F) -> Result<T, SyncError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn Connection) -> Result<T, SyncError> + Send + 'static,
    {
        let transport = Arc::clone(&self.transport);
        let credentials = self.credentials.clone();
        let task = tokio::spawn(async move {
            tokio::task::spawn_blocking(move || {
                let mut conn = transport.connect(&credentials)?;
                let result = work(conn.as_mut());
                if let Err(err) = conn.close() {
                    tracing::debug!(op, error = %err, "closing remote connection failed");
                }
                result
            })
            .await
        });
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(task.abort_handle());

        match task.await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(SyncError::Join {
                task: op,
                message: join.to_string(),
            }),
            Err(join) if join.is_cancelled() => Err(SyncError::Aborted { op }),
            Err(join) => Err(SyncError::Join {
                task: op,
                message: join.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// DirectoryTransport
// ---------------------------------------------------------------------------

/// Mirrors into a directory on the local machine (a mounted share, a synced
/// folder). Credentials still gate whether the mirror is enabled but are not
/// otherwise used.
#[derive(Debug, Clone)]
pub struct DirectoryTransport {
    root: PathBuf,
}

impl DirectoryTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Transport for DirectoryTransport {
    fn connect(&self, _credentials: &Credentials) -> Result<Box<dyn Connection>, SyncError> {
        if !self.root.is_dir() {
            return Err(remote_err(
                "connect",
                self.root.display().to_string(),
                "mirror directory does not exist",
            ));
        }
        Ok(Box::new(DirectoryConnection {
            root: self.root.clone(),
        }))
    }
}

struct DirectoryConnection {
    root: PathBuf,
}

impl Connection for DirectoryConnection {
    fn retrieve(&mut self, remote_path: &str) -> Result<Vec<u8>, SyncError> {
        match local_store::read_bytes(&self.root.join(remote_path))? {
            Some(bytes) => Ok(bytes),
            None => Err(SyncError::RemoteNotFound {
                path: remote_path.to_string(),
            }),
        }
    }

    fn store(&mut self, remote_path: &str, bytes: &[u8]) -> Result<(), SyncError> {
        local_store::write_atomic(&self.root.join(remote_path), bytes)
    }

    fn close(self: Box<Self>) -> Result<(), SyncError> {
        Ok(())
    }
}
