//! Per-registration sync configuration.
//!
//! A [`SyncConfig`] can be built in code (all fields are public and
//! [`Default`] is meaningful) or loaded from a YAML file:
//!
//! ```text
//! interval: 20          # seconds; 0 = persist once after bootstrap
//! local_path: ./data    # directory holding <namespace>.json
//! remote_path: backups  # remote directory prefix
//! mode: structured      # or `blob`
//! debug: false
//! ```
//!
//! Malformed `interval` values never fail the load; they fall back to
//! [`DEFAULT_INTERVAL_SECS`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{io_err, CoreError};
use crate::paths;
use crate::types::{Mode, Namespace};

pub const DEFAULT_INTERVAL_SECS: u64 = 20;
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 1_000;
/// Longest accepted interval (one year); anything above falls back to the default.
pub const MAX_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

/// Configuration for one namespace registration. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Persistence period in seconds. `0` selects the one-shot regime.
    #[serde(deserialize_with = "lenient_interval")]
    pub interval: u64,
    /// Directory holding the local file.
    pub local_path: PathBuf,
    /// Remote directory prefix.
    pub remote_path: String,
    pub mode: Mode,
    /// Raise step logging from `debug` to `info`.
    pub debug: bool,
    /// Minimum delay between registration and the first persist.
    pub grace_period_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL_SECS,
            local_path: PathBuf::from("."),
            remote_path: String::new(),
            mode: Mode::Structured,
            debug: false,
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
        }
    }
}

impl SyncConfig {
    /// Load a config from a YAML file. An empty file yields the defaults.
    pub fn load_at(path: &Path) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| CoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The recurring period, or `None` for the one-shot regime.
    pub fn period(&self) -> Option<Duration> {
        (self.interval > 0).then(|| Duration::from_secs(self.interval))
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// `<local_path>/<namespace><ext>`
    pub fn local_file(&self, namespace: &Namespace) -> PathBuf {
        paths::local_file_path(&self.local_path, namespace, self.mode)
    }

    /// `<remote_path>/<namespace><ext>`
    pub fn remote_file(&self, namespace: &Namespace) -> String {
        paths::remote_file_path(&self.remote_path, namespace, self.mode)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInterval {
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

fn lenient_interval<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawInterval>::deserialize(deserializer)?;
    Ok(coerce_interval(raw))
}

fn coerce_interval(raw: Option<RawInterval>) -> u64 {
    let secs = match raw {
        Some(RawInterval::Int(n)) => u64::try_from(n).ok(),
        Some(RawInterval::Float(f)) if (0.0..=MAX_INTERVAL_SECS as f64).contains(&f) => {
            Some(f as u64)
        }
        Some(RawInterval::Text(s)) => s.trim().parse().ok(),
        _ => None,
    };
    secs.filter(|secs| *secs <= MAX_INTERVAL_SECS).unwrap_or(DEFAULT_INTERVAL_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_one_shot() {
        let config = SyncConfig {
            interval: 0,
            ..SyncConfig::default()
        };
        assert_eq!(config.period(), None);
    }

    #[test]
    fn default_period_is_twenty_seconds() {
        assert_eq!(
            SyncConfig::default().period(),
            Some(Duration::from_secs(20))
        );
    }

    #[test]
    fn coerce_handles_missing_value() {
        assert_eq!(coerce_interval(None), DEFAULT_INTERVAL_SECS);
    }
}
