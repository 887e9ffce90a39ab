pub mod pull;
pub mod push;
pub mod show;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use keepsake_core::types::{HOST_VAR, PASS_VAR, USER_VAR};
use keepsake_core::{Credentials, Mode, Namespace, SyncConfig};
use keepsake_sync::{DirectoryTransport, FtpTransport, RemoteMirror, Transport};

/// Namespace plus the settings that locate its files.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Namespace to operate on.
    pub namespace: String,

    /// YAML file with sync settings; flags below override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the local files.
    #[arg(long)]
    pub local_path: Option<PathBuf>,

    /// Prefix of the remote files.
    #[arg(long)]
    pub remote_path: Option<String>,

    /// Treat the namespace as an opaque blob instead of a JSON object.
    #[arg(long)]
    pub blob: bool,

    /// Mirror into this directory instead of the FTP server.
    #[arg(long)]
    pub mirror_dir: Option<PathBuf>,
}

impl TargetArgs {
    pub fn resolve(&self, verbose: bool) -> Result<(Namespace, SyncConfig)> {
        let namespace = Namespace::from(self.namespace.as_str());
        namespace.validate()?;

        let mut config = match &self.config {
            Some(path) => SyncConfig::load_at(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => SyncConfig::default(),
        };
        if let Some(local_path) = &self.local_path {
            config.local_path = local_path.clone();
        }
        if let Some(remote_path) = &self.remote_path {
            config.remote_path = remote_path.clone();
        }
        if self.blob {
            config.mode = Mode::Blob;
        }
        config.debug |= verbose;
        Ok((namespace, config))
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        match &self.mirror_dir {
            Some(dir) => Arc::new(DirectoryTransport::new(dir.clone())),
            None => Arc::new(FtpTransport),
        }
    }

    /// Mirror for one-off transfers; credentials come from the environment.
    pub fn mirror(&self) -> Result<RemoteMirror> {
        let credentials = Credentials::from_env().with_context(|| {
            format!("remote credentials missing: set {HOST_VAR}, {USER_VAR} and {PASS_VAR}")
        })?;
        Ok(RemoteMirror::new(credentials, self.transport()))
    }
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")
}
