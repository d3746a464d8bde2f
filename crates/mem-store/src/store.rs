//! Memory store resolution and the branch guard.
//!
//! A project is governed by the nearest local `.mem` repository found by
//! walking upward from the working directory, or failing that by the
//! central store, with the path index supplying the task branch.

use std::path::{Path, PathBuf};

use crate::git::{GitError, GitRepo};
use crate::index::IndexStore;

pub const STORE_DIR_NAME: &str = ".mem";

/// The store governing a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHandle {
    pub store_dir: PathBuf,
    pub is_local: bool,
    /// Branch the store must be checked out to before any read or write.
    /// `None` for local stores (whatever is checked out governs) and for
    /// central-store directories with no index mapping.
    pub task_branch: Option<String>,
}

/// Locate the store for `start_dir`.
///
/// Local stores win: the first ancestor carrying `.mem/.git` short-circuits
/// the central lookup even when an index mapping also exists. Returns
/// `None` when neither a local store nor an initialized central store
/// exists.
pub fn resolve(
    start_dir: &Path,
    central_dir: &Path,
    index: &dyn IndexStore,
) -> Option<StoreHandle> {
    for dir in start_dir.ancestors() {
        let candidate = dir.join(STORE_DIR_NAME);
        if candidate.join(".git").is_dir() {
            tracing::debug!(store = %candidate.display(), "resolved local store");
            return Some(StoreHandle {
                store_dir: candidate,
                is_local: true,
                task_branch: None,
            });
        }
    }

    if !central_dir.join(".git").is_dir() {
        return None;
    }

    let task_branch = index.lookup(start_dir);
    tracing::debug!(
        store = %central_dir.display(),
        branch = task_branch.as_deref().unwrap_or("(unmapped)"),
        "resolved central store"
    );
    Some(StoreHandle {
        store_dir: central_dir.to_path_buf(),
        is_local: false,
        task_branch,
    })
}

/// Check the store out to the expected task branch.
///
/// No-op when no branch is expected or when it is already checked out;
/// the checkout is skipped in that case so a dirty tree cannot produce a
/// spurious git error.
pub fn ensure_branch(repo: &GitRepo, task_branch: Option<&str>) -> Result<(), GitError> {
    let Some(target) = task_branch else {
        return Ok(());
    };
    if repo.current_branch()? == target {
        return Ok(());
    }
    repo.checkout(target)
}
