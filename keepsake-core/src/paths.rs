//! File naming rules shared by the local store and the remote mirror.
//!
//! ```text
//! <local_path>/<namespace>.json     structured mode
//! <local_path>/<namespace>          blob mode
//! <remote_path>/<namespace>[.json]  remote copy, same extension rule
//! ```

use std::path::{Path, PathBuf};

use crate::types::{Mode, Namespace};

/// Suffix for the sibling file written before the atomic rename.
pub const TMP_SUFFIX: &str = ".keepsake.tmp";

/// `<namespace><ext>` — pure, no I/O.
pub fn file_name(namespace: &Namespace, mode: Mode) -> String {
    format!("{}{}", namespace, mode.extension())
}

/// Local file for `namespace` under `local_root`.
pub fn local_file_path(local_root: &Path, namespace: &Namespace, mode: Mode) -> PathBuf {
    local_root.join(file_name(namespace, mode))
}

/// Remote file for `namespace` under `remote_prefix`.
///
/// Remote paths are always `/`-separated regardless of the host platform.
pub fn remote_file_path(remote_prefix: &str, namespace: &Namespace, mode: Mode) -> String {
    let name = file_name(namespace, mode);
    if remote_prefix.is_empty() || remote_prefix.ends_with('/') {
        format!("{remote_prefix}{name}")
    } else {
        format!("{remote_prefix}/{name}")
    }
}

/// `<path>.keepsake.tmp`
pub fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}{TMP_SUFFIX}", path.display()))
}
