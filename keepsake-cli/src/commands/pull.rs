//! `keepsake pull` — run the fetch leg of bootstrap once.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use keepsake_sync::local_store;

use super::{runtime, TargetArgs};

/// Arguments for `keepsake pull`.
#[derive(Args, Debug)]
pub struct PullArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

impl PullArgs {
    pub fn run(self, verbose: bool) -> Result<()> {
        let (namespace, config) = self.target.resolve(verbose)?;
        let mirror = self.target.mirror()?;
        let local = config.local_file(&namespace);
        let remote = config.remote_file(&namespace);

        let bytes = runtime()?
            .block_on(mirror.fetch(&remote))
            .with_context(|| format!("failed to fetch {remote} from {}", mirror.host()))?;
        local_store::write_atomic(&local, &bytes)
            .with_context(|| format!("failed to write {}", local.display()))?;

        tracing::debug!(%namespace, bytes = bytes.len(), "pulled remote copy");
        println!(
            "{} {remote} -> {} ({} bytes)",
            "pulled".green(),
            local.display(),
            bytes.len()
        );
        Ok(())
    }
}
