//! Registration entrypoint and the per-mode handles.
//!
//! [`sync`] claims a namespace on a [`Store`], spawns one task that runs
//! bootstrap then the persistence loop, and hands back either the live
//! object ([`Namespaced`]) or a manual control ([`BlobControl`]).

use std::fmt;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use keepsake_core::{Credentials, Mode, Namespace, SyncConfig};

use crate::bootstrap::{self, BootstrapReport};
use crate::error::SyncError;
use crate::registry::{SharedObject, Store};
use crate::remote::{RemoteMirror, Transport};
use crate::scheduler::{self, PersistReport, Schedule, UploadMode};
use crate::syncable::{BlobState, StructuredState, SyncContext, Syncable};

/// Hook fired once bootstrap completes.
pub type ReadyHook = Box<dyn FnOnce() + Send + 'static>;

// ---------------------------------------------------------------------------
// SyncOptions
// ---------------------------------------------------------------------------

/// Everything a registration needs besides the store and namespace.
pub struct SyncOptions {
    pub config: SyncConfig,
    credentials: Option<Credentials>,
    transport: Option<Arc<dyn Transport>>,
    on_ready: Option<ReadyHook>,
    schedule: Option<Schedule>,
}

impl SyncOptions {
    /// Options with credentials read from the environment and the default
    /// transport (FTP when the `ftp` feature is enabled).
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            credentials: Credentials::from_env(),
            transport: default_transport(),
            on_ready: None,
            schedule: None,
        }
    }

    /// Override the credentials; `None` disables the remote mirror.
    pub fn credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn on_ready(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_ready = Some(Box::new(hook));
        self
    }

    /// Replace the schedule derived from `config`.
    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn remote_enabled(&self) -> bool {
        self.credentials.is_some() && self.transport.is_some()
    }
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .field("remote_enabled", &self.remote_enabled())
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "ftp")]
fn default_transport() -> Option<Arc<dyn Transport>> {
    Some(Arc::new(crate::ftp::FtpTransport))
}

#[cfg(not(feature = "ftp"))]
fn default_transport() -> Option<Arc<dyn Transport>> {
    None
}

// ---------------------------------------------------------------------------
// sync
// ---------------------------------------------------------------------------

/// Register `namespace` on `store` and start syncing it.
///
/// Must be called from within a tokio runtime. `ready` receives the
/// namespace once bootstrap completes; the `on_ready` hook from `options`
/// fires right after it.
pub fn sync(
    store: &Store,
    namespace: impl Into<Namespace>,
    options: SyncOptions,
    ready: impl FnOnce(&Namespace) + Send + 'static,
) -> Result<Synced, SyncError> {
    let namespace = namespace.into();
    namespace.validate()?;
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| SyncError::NoRuntime)?;
    let claim = store.claim(&namespace)?;

    let SyncOptions {
        config,
        credentials,
        transport,
        on_ready,
        schedule,
    } = options;

    let (state, object): (Box<dyn Syncable>, Option<SharedObject>) = match config.mode {
        Mode::Structured => {
            let object = store.object(&namespace);
            (Box::new(StructuredState::new(object.clone())), Some(object))
        }
        Mode::Blob => (Box::new(BlobState), None),
    };

    let ctx = Arc::new(SyncContext {
        local_file: config.local_file(&namespace),
        remote_file: config.remote_file(&namespace),
        namespace: namespace.clone(),
        store: store.clone(),
        state,
        mirror: RemoteMirror::configured(credentials, transport),
        debug: config.debug,
    });
    let schedule = schedule.unwrap_or_else(|| Schedule::from_config(&config));

    verbose!(
        config.debug,
        info,
        namespace = %namespace,
        mode = %config.mode,
        local = %ctx.local_file.display(),
        remote_enabled = ctx.mirror.is_some(),
        "registering namespace",
    );

    let (ready_tx, ready_rx) = watch::channel::<Option<BootstrapReport>>(None);
    let (shutdown_tx, _) = broadcast::channel::<()>(4);
    let registered_at = Instant::now();

    let task = {
        let ctx = Arc::clone(&ctx);
        let shutdown_tx = shutdown_tx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        runtime.spawn(async move {
            let _claim = claim;
            // Keeps the channel open so dropping the handle does not stop syncing.
            let _shutdown_tx = shutdown_tx;

            let report = tokio::select! {
                _ = shutdown_rx.recv() => return,
                report = bootstrap::run(&ctx) => report,
            };

            ready(&ctx.namespace);
            if let Some(hook) = on_ready {
                hook();
            }
            let _ = ready_tx.send(Some(report));

            scheduler::run(ctx, schedule, registered_at, shutdown_rx).await;
        })
    };

    let handle = SyncHandle {
        namespace,
        ready_rx,
        shutdown_tx,
        task,
    };

    Ok(match object {
        Some(object) => Synced::Structured(Namespaced { object, handle }),
        None => Synced::Blob(BlobControl { ctx, handle }),
    })
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Lifecycle handle shared by both modes.
#[derive(Debug)]
pub struct SyncHandle {
    namespace: Namespace,
    ready_rx: watch::Receiver<Option<BootstrapReport>>,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Wait for bootstrap to complete.
    ///
    /// Returns `None` if the registration was shut down before bootstrap
    /// finished.
    pub async fn ready(&self) -> Option<BootstrapReport> {
        let mut rx = self.ready_rx.clone();
        let report = *rx.wait_for(Option::is_some).await.ok()?;
        report
    }

    pub fn is_ready(&self) -> bool {
        self.ready_rx.borrow().is_some()
    }

    /// Stop the background task. Pending detached uploads still finish.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Resolves once the background task has exited, for whatever reason.
    ///
    /// The task owns the sending half of the ready channel, so the channel
    /// closes exactly when the task ends. Unlike [`join`](Self::join) this
    /// borrows the handle and can sit in a `select!` next to `shutdown`.
    pub async fn stopped(&self) {
        let mut rx = self.ready_rx.clone();
        while rx.changed().await.is_ok() {}
    }

    /// `true` once the background task has exited (after shutdown, or after
    /// the single persist of the one-shot regime).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the background task to exit.
    pub async fn join(self) -> Result<(), SyncError> {
        self.task.await.map_err(|err| SyncError::Join {
            task: "sync",
            message: err.to_string(),
        })
    }
}

/// Result of a registration.
#[derive(Debug)]
pub enum Synced {
    Structured(Namespaced),
    Blob(BlobControl),
}

impl Synced {
    pub fn handle(&self) -> &SyncHandle {
        match self {
            Synced::Structured(namespaced) => &namespaced.handle,
            Synced::Blob(control) => &control.handle,
        }
    }

    /// Keep only the lifecycle handle; the registration keeps running.
    pub fn into_handle(self) -> SyncHandle {
        match self {
            Synced::Structured(namespaced) => namespaced.handle,
            Synced::Blob(control) => control.handle,
        }
    }

    pub fn into_structured(self) -> Option<Namespaced> {
        match self {
            Synced::Structured(namespaced) => Some(namespaced),
            Synced::Blob(_) => None,
        }
    }

    pub fn into_blob(self) -> Option<BlobControl> {
        match self {
            Synced::Blob(control) => Some(control),
            Synced::Structured(_) => None,
        }
    }
}

/// Structured mode: the live object plus its lifecycle handle.
///
/// Derefs to [`SharedObject`], so `cfg.write().insert(..)` mutates the value
/// the engine persists.
#[derive(Debug)]
pub struct Namespaced {
    object: SharedObject,
    handle: SyncHandle,
}

impl Namespaced {
    pub fn object(&self) -> &SharedObject {
        &self.object
    }

    pub fn handle(&self) -> &SyncHandle {
        &self.handle
    }

    pub fn into_parts(self) -> (SharedObject, SyncHandle) {
        (self.object, self.handle)
    }
}

impl Deref for Namespaced {
    type Target = SharedObject;

    fn deref(&self) -> &SharedObject {
        &self.object
    }
}

/// Blob mode: manual persist and connection teardown.
pub struct BlobControl {
    ctx: Arc<SyncContext>,
    handle: SyncHandle,
}

impl fmt::Debug for BlobControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobControl")
            .field("namespace", &self.ctx.namespace)
            .field("local_file", &self.ctx.local_file)
            .field("remote_file", &self.ctx.remote_file)
            .finish_non_exhaustive()
    }
}

impl BlobControl {
    /// Where the caller keeps the payload.
    pub fn local_file(&self) -> &Path {
        &self.ctx.local_file
    }

    pub fn handle(&self) -> &SyncHandle {
        &self.handle
    }

    /// Run the persist procedure now and wait for the upload to finish.
    pub async fn persist(&self) -> PersistReport {
        scheduler::persist(&self.ctx, UploadMode::Await).await
    }

    /// Run the persist procedure in the background; `callback` fires exactly
    /// once with the report, including when nothing changed.
    pub fn persist_with(
        &self,
        callback: impl FnOnce(PersistReport) + Send + 'static,
    ) -> JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            callback(scheduler::persist(&ctx, UploadMode::Await).await);
        })
    }

    /// Abort this registration's most recently opened remote connection.
    /// Returns `false` when there is no mirror or nothing was tracked.
    pub fn destroy(&self) -> bool {
        self.ctx.mirror.as_ref().is_some_and(RemoteMirror::destroy)
    }
}
