//! Persistence scheduler and the persist procedure.
//!
//! Persist:
//!
//! 1. Snapshot the value and digest it.
//! 2. Digest equals the cached one → done, nothing is written.
//! 3. Record the digest (before any I/O; failures never roll it back).
//! 4. Write the local file (structured mode only).
//! 5. Upload the local file when a mirror is configured.
//!
//! The loop starts only after bootstrap has finished *and* the grace period
//! has elapsed. Scheduled cycles detach their upload so a hung connection
//! does not hold back later cycles.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use keepsake_core::config::{DEFAULT_GRACE_PERIOD_MS, DEFAULT_INTERVAL_SECS, MAX_INTERVAL_SECS};
use keepsake_core::{Namespace, SyncConfig};

use crate::error::SyncError;
use crate::hasher::ContentDigest;
use crate::syncable::SyncContext;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to the remote leg of a persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadStatus {
    /// No mirror configured.
    Disabled,
    /// Nothing to upload: no content, or the local write failed.
    Skipped,
    /// Upload started in the background.
    Detached,
    Uploaded,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PersistOutcome {
    /// Digest matched the last persisted one.
    Unchanged,
    /// Digest changed and was recorded.
    Persisted {
        wrote_local: bool,
        upload: UploadStatus,
    },
    /// The value could not be snapshotted; nothing was recorded.
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PersistReport {
    pub namespace: Namespace,
    pub outcome: PersistOutcome,
    pub at: DateTime<Utc>,
}

impl PersistReport {
    /// `true` when this cycle changed anything.
    pub fn persisted(&self) -> bool {
        matches!(self.outcome, PersistOutcome::Persisted { .. })
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// When persistence runs.
///
/// The grace period runs from registration, concurrently with bootstrap; the
/// first persist waits for both. With a recurring period the first tick lands
/// one full period after that point, so `interval: 1` with the default grace
/// first persists about two seconds after registration.
///
/// Zero periods, periods above [`MAX_INTERVAL_SECS`] and grace periods that
/// cannot be represented as a deadline fall back to the config defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Minimum delay from registration to the first persist.
    pub grace: Duration,
    /// Recurring period; `None` persists exactly once.
    pub every: Option<Duration>,
}

impl Schedule {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            grace: config.grace_period(),
            every: config.period(),
        }
    }
}

// ---------------------------------------------------------------------------
// Persist
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UploadMode {
    /// Spawn the upload and return immediately.
    Detached,
    /// Wait for the upload to finish.
    Await,
}

pub(crate) async fn persist(ctx: &Arc<SyncContext>, upload_mode: UploadMode) -> PersistReport {
    let outcome = persist_outcome(ctx, upload_mode).await;
    PersistReport {
        namespace: ctx.namespace.clone(),
        outcome,
        at: Utc::now(),
    }
}

async fn persist_outcome(ctx: &Arc<SyncContext>, upload_mode: UploadMode) -> PersistOutcome {
    let snapshot = match ctx.state.snapshot(&ctx.local_file) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            tracing::warn!(namespace = %ctx.namespace, error = %err, "cannot snapshot value");
            return PersistOutcome::Failed {
                error: err.to_string(),
            };
        }
    };

    let digest = ContentDigest::of_bytes(snapshot.as_deref());
    if !ctx.store.record_if_changed(&ctx.namespace, digest.clone()) {
        tracing::debug!(namespace = %ctx.namespace, "unchanged: skipping persist");
        return PersistOutcome::Unchanged;
    }

    let (wrote_local, local_ok) = match snapshot.as_deref() {
        Some(bytes) => match ctx.state.save_local(&ctx.local_file, bytes) {
            Ok(wrote) => (wrote, true),
            Err(err) => {
                tracing::warn!(namespace = %ctx.namespace, error = %err, "local write failed");
                (false, false)
            }
        },
        None => (false, true),
    };
    if wrote_local {
        verbose!(
            ctx.debug,
            info,
            namespace = %ctx.namespace,
            digest = %digest,
            "wrote: {}",
            ctx.local_file.display(),
        );
    }

    let upload = match &ctx.mirror {
        None => UploadStatus::Disabled,
        Some(_) if snapshot.is_none() || !local_ok => UploadStatus::Skipped,
        Some(_) => match upload_mode {
            UploadMode::Detached => {
                let ctx = Arc::clone(ctx);
                tokio::spawn(async move {
                    let _ = upload(&ctx).await;
                });
                UploadStatus::Detached
            }
            UploadMode::Await => match upload(ctx).await {
                Ok(()) => UploadStatus::Uploaded,
                Err(err) => UploadStatus::Failed {
                    error: err.to_string(),
                },
            },
        },
    };

    PersistOutcome::Persisted {
        wrote_local,
        upload,
    }
}

async fn upload(ctx: &SyncContext) -> Result<(), SyncError> {
    let Some(mirror) = &ctx.mirror else {
        return Err(SyncError::RemoteDisabled);
    };
    verbose!(
        ctx.debug,
        info,
        namespace = %ctx.namespace,
        remote = %ctx.remote_file,
        "uploading",
    );
    let result = mirror.upload(&ctx.local_file, &ctx.remote_file).await;
    if let Err(err) = &result {
        verbose!(
            ctx.debug,
            warn,
            namespace = %ctx.namespace,
            error = %err,
            "upload failed",
        );
    }
    result
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Drive persistence for one registration until shutdown (interval regime)
/// or after the single persist (one-shot regime).
///
/// Must be called only after bootstrap has completed.
pub(crate) async fn run(
    ctx: Arc<SyncContext>,
    schedule: Schedule,
    registered_at: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let grace_ends = registered_at.checked_add(schedule.grace).unwrap_or_else(|| {
        tracing::warn!(
            namespace = %ctx.namespace,
            grace = ?schedule.grace,
            "grace period out of range; using default"
        );
        registered_at + Duration::from_millis(DEFAULT_GRACE_PERIOD_MS)
    });
    tokio::select! {
        _ = shutdown_rx.recv() => return,
        _ = tokio::time::sleep_until(grace_ends) => {}
    }

    let Some(every) = schedule.every else {
        let report = persist(&ctx, UploadMode::Detached).await;
        log_cycle(&ctx, &report);
        return;
    };
    let every = if !every.is_zero() && every <= Duration::from_secs(MAX_INTERVAL_SECS) {
        every
    } else {
        tracing::warn!(
            namespace = %ctx.namespace,
            interval = ?every,
            "interval out of range; using default"
        );
        Duration::from_secs(DEFAULT_INTERVAL_SECS)
    };

    let mut interval = tokio::time::interval_at(Instant::now() + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let report = persist(&ctx, UploadMode::Detached).await;
                log_cycle(&ctx, &report);
            }
        }
    }
    tracing::debug!(namespace = %ctx.namespace, "persistence loop stopped");
}

fn log_cycle(ctx: &SyncContext, report: &PersistReport) {
    if report.persisted() {
        verbose!(
            ctx.debug,
            info,
            namespace = %ctx.namespace,
            outcome = ?report.outcome,
            "persist cycle completed",
        );
    }
}
