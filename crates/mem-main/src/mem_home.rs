//! Central store location.

use std::path::{Path, PathBuf};

const CENTRAL_DIR_NAME: &str = ".mem";

/// The central store directory: the `--central-dir` override when given
/// (`~` expanded, relative paths anchored at the working directory),
/// otherwise `~/.mem`.
pub fn resolve_central_dir(cwd: &Path, override_dir: Option<&Path>) -> PathBuf {
    let Some(dir) = override_dir else {
        return home_dir().join(CENTRAL_DIR_NAME);
    };

    let expanded = match dir.to_str() {
        Some("~") => home_dir(),
        Some(raw) => match raw.strip_prefix("~/") {
            Some(rest) => home_dir().join(rest),
            None => dir.to_path_buf(),
        },
        None => dir.to_path_buf(),
    };
    if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    }
}

pub fn home_dir() -> PathBuf {
    ["HOME", "USERPROFILE"]
        .iter()
        .find_map(std::env::var_os)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}
