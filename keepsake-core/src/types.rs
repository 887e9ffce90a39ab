//! Domain types shared by the sync engine and the CLI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Namespace
// ---------------------------------------------------------------------------

/// The name of an independently synced unit of state.
///
/// A namespace doubles as the stem of its local and remote file names, so
/// [`Namespace::validate`] rejects anything that would escape the configured
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace(pub String);

impl Namespace {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the name is usable as a single path component.
    pub fn validate(&self) -> Result<(), CoreError> {
        let reason = if self.0.is_empty() {
            Some("must not be empty")
        } else if self.0 == "." || self.0 == ".." {
            Some("must not be a relative directory marker")
        } else if self.0.contains(['/', '\\']) {
            Some("must not contain path separators")
        } else if self.0.contains('\0') {
            Some("must not contain NUL bytes")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(CoreError::InvalidNamespace {
                name: self.0.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Namespace {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Namespace {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// How a namespace's value is represented and stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// A JSON object, merged on bootstrap and written as pretty JSON.
    #[default]
    Structured,
    /// Opaque bytes the caller manages; the engine only mirrors them.
    Blob,
}

impl Mode {
    /// File extension appended to the namespace for this mode.
    pub fn extension(self) -> &'static str {
        match self {
            Mode::Structured => ".json",
            Mode::Blob => "",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Structured => "structured",
            Mode::Blob => "blob",
        };
        f.write_str(s)
    }
}

impl FromStr for Mode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "structured" | "json" => Ok(Mode::Structured),
            "blob" | "raw" => Ok(Mode::Blob),
            other => Err(CoreError::UnknownMode(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

pub const HOST_VAR: &str = "FTP_HOST";
pub const USER_VAR: &str = "FTP_USER";
pub const PASS_VAR: &str = "FTP_PASS";

/// Login details for the remote mirror.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub user: String,
    pub password: String,
}

impl Credentials {
    /// Read `FTP_HOST`, `FTP_USER` and `FTP_PASS` from the process
    /// environment.
    ///
    /// Returns `None` when any of them is missing or empty; remote mirroring
    /// is then disabled.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Credentials::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let read = |key: &str| lookup(key).filter(|value| !value.is_empty());
        Some(Self {
            host: read(HOST_VAR)?,
            user: read(USER_VAR)?,
            password: read(PASS_VAR)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn credentials_require_all_three_variables() {
        let full = lookup(&[(HOST_VAR, "ftp.example.com"), (USER_VAR, "u"), (PASS_VAR, "p")]);
        let creds = Credentials::from_lookup(full).expect("credentials");
        assert_eq!(creds.host, "ftp.example.com");

        let missing_pass = lookup(&[(HOST_VAR, "ftp.example.com"), (USER_VAR, "u")]);
        assert!(Credentials::from_lookup(missing_pass).is_none());
    }

    #[test]
    fn empty_credential_value_counts_as_missing() {
        let blank_user = lookup(&[(HOST_VAR, "h"), (USER_VAR, ""), (PASS_VAR, "p")]);
        assert!(Credentials::from_lookup(blank_user).is_none());
    }

    #[test]
    fn debug_output_redacts_password() {
        let creds = Credentials {
            host: "h".into(),
            user: "u".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn namespace_validation_rejects_path_escapes() {
        assert!(Namespace::from("cfg").validate().is_ok());
        assert!(Namespace::from("").validate().is_err());
        assert!(Namespace::from("..").validate().is_err());
        assert!(Namespace::from("a/b").validate().is_err());
        assert!(Namespace::from("a\\b").validate().is_err());
    }

    #[test]
    fn mode_parses_aliases() {
        assert_eq!("json".parse::<Mode>().unwrap(), Mode::Structured);
        assert_eq!("BLOB".parse::<Mode>().unwrap(), Mode::Blob);
        assert!("yaml".parse::<Mode>().is_err());
    }
}
