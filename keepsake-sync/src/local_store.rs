//! Local file store.
//!
//! ## `write_atomic` — 3-step protocol
//!
//! 1. Ensure the parent directory exists.
//! 2. Write to `<path>.keepsake.tmp`.
//! 3. Rename to the final path (atomic on POSIX); on failure the tmp file is
//!    removed and the original is left intact.
//!
//! Loading never fails: a missing, unreadable or non-object file is an empty
//! object.

use std::io::ErrorKind;
use std::path::Path;

use serde_json::{Map, Value};

use keepsake_core::paths;

use crate::error::{io_err, SyncError};
use crate::hasher;

/// Load the structured value stored at `path`.
pub fn load_object(path: &Path) -> Map<String, Value> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            if err.kind() != ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %err, "local file unreadable");
            }
            return Map::new();
        }
    };
    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(object)) => object,
        Ok(_) => {
            tracing::debug!(path = %path.display(), "local file is not a JSON object");
            Map::new()
        }
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "local file is not valid JSON");
            Map::new()
        }
    }
}

/// Serialize `object` as pretty JSON and overwrite `path`.
pub fn save_object(path: &Path, object: &Map<String, Value>) -> Result<(), SyncError> {
    let encoded = hasher::encode_object(object)?;
    write_atomic(path, encoded.as_bytes())
}

/// Read the raw bytes at `path`; `None` when the file does not exist.
pub fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>, SyncError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Replace the contents of `path` with `bytes` via tmp file + rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    write_atomic_with_tmp(path, bytes, &paths::tmp_path(path))
}

fn write_atomic_with_tmp(path: &Path, bytes: &[u8], tmp: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    std::fs::write(tmp, bytes).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}
