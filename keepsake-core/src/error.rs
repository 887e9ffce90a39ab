//! Error types for keepsake-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while validating namespaces or loading configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error while loading a config file.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The namespace cannot be used as a file name.
    #[error("invalid namespace '{name}': {reason}")]
    InvalidNamespace { name: String, reason: &'static str },

    /// A mode string that is neither `structured` nor `blob`.
    #[error("unknown mode '{0}'; expected: structured, blob")]
    UnknownMode(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
