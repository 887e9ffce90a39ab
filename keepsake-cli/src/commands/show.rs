//! `keepsake show` — print what is on disk for a namespace.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use keepsake_core::Mode;
use keepsake_sync::{hasher, local_store, ContentDigest};

use super::TargetArgs;

/// Arguments for `keepsake show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ShowArgs {
    pub fn run(self) -> Result<()> {
        let (namespace, config) = self.target.resolve(false)?;
        let local = config.local_file(&namespace);

        match config.mode {
            Mode::Structured => {
                // Missing or corrupt files read as an empty object, as during bootstrap.
                let object = local_store::load_object(&local);
                if self.json {
                    println!("{}", hasher::encode_object(&object)?);
                    return Ok(());
                }
                println!("{} {}", namespace.to_string().bold(), local.display());
                if object.is_empty() {
                    println!("  {}", "(empty)".dimmed());
                }
                for (key, value) in &object {
                    println!("  {} = {value}", key.cyan());
                }
            }
            Mode::Blob => {
                let bytes = local_store::read_bytes(&local)?;
                let size = bytes.as_ref().map_or(0, Vec::len);
                let digest = ContentDigest::of_bytes(bytes.as_deref());
                if self.json {
                    let payload = serde_json::json!({
                        "namespace": namespace,
                        "path": local.display().to_string(),
                        "exists": bytes.is_some(),
                        "bytes": size,
                        "digest": digest.to_string(),
                    });
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&payload)
                            .context("failed to render blob summary JSON")?
                    );
                    return Ok(());
                }
                println!("{} {}", namespace.to_string().bold(), local.display());
                match bytes {
                    Some(_) => println!("  {size} bytes, sha256 {digest}"),
                    None => println!("  {}", "(no local file)".dimmed()),
                }
            }
        }
        Ok(())
    }
}
