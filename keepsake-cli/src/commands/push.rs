//! `keepsake push` — upload the local file once, regardless of the digest
//! cache.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use keepsake_sync::{local_store, ContentDigest};

use super::{runtime, TargetArgs};

/// Arguments for `keepsake push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

impl PushArgs {
    pub fn run(self, verbose: bool) -> Result<()> {
        let (namespace, config) = self.target.resolve(verbose)?;
        let mirror = self.target.mirror()?;
        let local = config.local_file(&namespace);
        let remote = config.remote_file(&namespace);

        let bytes = local_store::read_bytes(&local)?
            .with_context(|| format!("nothing to push: {} does not exist", local.display()))?;
        runtime()?
            .block_on(mirror.upload(&local, &remote))
            .with_context(|| format!("failed to upload {remote} to {}", mirror.host()))?;

        let digest = ContentDigest::of_bytes(Some(&bytes));
        tracing::debug!(%namespace, %digest, "pushed local copy");
        println!(
            "{} {} -> {remote} ({})",
            "pushed".green(),
            local.display(),
            short(&digest)
        );
        Ok(())
    }
}

fn short(digest: &ContentDigest) -> String {
    digest.to_string().chars().take(12).collect()
}
