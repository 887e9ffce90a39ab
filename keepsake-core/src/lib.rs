//! keepsake core library — namespace types, sync configuration, path rules.
//!
//! - [`types`] — [`Namespace`], [`Mode`], [`Credentials`]
//! - [`config`] — [`SyncConfig`] and YAML loading
//! - [`paths`] — local and remote file naming
//! - [`error`] — [`CoreError`]

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::SyncConfig;
pub use error::CoreError;
pub use types::{Credentials, Mode, Namespace};
