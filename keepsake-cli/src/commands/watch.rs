//! `keepsake watch` — register a namespace and persist it until ctrl-c.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use keepsake_sync::{sync, Store, SyncOptions};

use super::{runtime, TargetArgs};

/// Arguments for `keepsake watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

impl WatchArgs {
    pub fn run(self, verbose: bool) -> Result<()> {
        let (namespace, config) = self.target.resolve(verbose)?;
        let options = SyncOptions::new(config).transport(self.target.transport());
        if !options.remote_enabled() {
            tracing::info!(%namespace, "no remote credentials; syncing locally only");
        }

        runtime()?.block_on(async move {
            let store = Store::new();
            let handle = sync(&store, namespace, options, |namespace| {
                println!("{} {namespace}", "ready".green());
            })?
            .into_handle();

            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal.context("failed to listen for ctrl-c")?;
                    tracing::info!("received ctrl-c, stopping");
                    handle.shutdown();
                }
                _ = handle.stopped() => {}
            }
            handle.join().await?;
            anyhow::Ok(())
        })
    }
}
