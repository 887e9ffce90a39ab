//! Bootstrap sequencer — reconcile remote, local and in-memory copies once
//! per registration.
//!
//! Stages run strictly in order:
//!
//! 1. **FetchingRemote** (only with a mirror): download the remote file and
//!    overwrite the local one, then wait [`SETTLE_DELAY`]. A failed fetch
//!    leaves the local file untouched.
//! 2. **LoadingLocal** (structured only): merge the local file over the
//!    in-memory object; file keys win.
//! 3. **Ready**: handled by the controller once this returns.

use std::time::Duration;

use serde::Serialize;

use crate::local_store;
use crate::syncable::SyncContext;

/// Pause between landing fetched bytes and reading them back.
pub const SETTLE_DELAY: Duration = Duration::from_millis(400);

/// Result of the remote leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    /// No mirror configured.
    Skipped,
    /// The remote copy replaced the local file.
    Fetched,
    /// Fetch or local write failed; the local file was left alone.
    Failed,
}

/// What bootstrap did, published to `ready()` waiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub fetch: FetchOutcome,
    pub loaded_local: bool,
}

pub(crate) async fn run(ctx: &SyncContext) -> BootstrapReport {
    let fetch = fetch_remote(ctx).await;
    let loaded_local = ctx.state.load_local(&ctx.local_file);
    verbose!(
        ctx.debug,
        info,
        namespace = %ctx.namespace,
        mode = %ctx.state.mode(),
        fetch = ?fetch,
        loaded_local,
        "bootstrap complete",
    );
    BootstrapReport {
        fetch,
        loaded_local,
    }
}

async fn fetch_remote(ctx: &SyncContext) -> FetchOutcome {
    let Some(mirror) = &ctx.mirror else {
        return FetchOutcome::Skipped;
    };

    verbose!(
        ctx.debug,
        info,
        namespace = %ctx.namespace,
        remote = %ctx.remote_file,
        host = %mirror.host(),
        "fetching remote copy",
    );
    let bytes = match mirror.fetch(&ctx.remote_file).await {
        Ok(bytes) => bytes,
        Err(err) => {
            verbose!(
                ctx.debug,
                warn,
                namespace = %ctx.namespace,
                error = %err,
                "remote fetch failed; continuing with local copy",
            );
            return FetchOutcome::Failed;
        }
    };

    if let Err(err) = local_store::write_atomic(&ctx.local_file, &bytes) {
        verbose!(
            ctx.debug,
            warn,
            namespace = %ctx.namespace,
            error = %err,
            "could not write fetched copy locally",
        );
        return FetchOutcome::Failed;
    }

    verbose!(
        ctx.debug,
        info,
        namespace = %ctx.namespace,
        path = %ctx.local_file.display(),
        bytes = bytes.len(),
        "wrote remote copy",
    );
    tokio::time::sleep(SETTLE_DELAY).await;
    FetchOutcome::Fetched
}
