//! Git subprocess runner.
//!
//! Every state-mutating operation shells out to `git` with an explicit
//! argument vector and waits for it synchronously. Exit code 0 returns
//! trimmed stdout; anything else surfaces git's stderr as the error.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use thiserror::Error;

pub const DEFAULT_BRANCH: &str = "main";
pub const TASK_BRANCH_PREFIX: &str = "task/";

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] io::Error),

    #[error("{0}")]
    Command(String),
}

/// Executes git argument vectors. The production implementation spawns
/// the real binary; tests substitute a recording fake.
pub trait GitRunner: Send + Sync {
    fn run(&self, dir: &Path, args: &[&str]) -> Result<String, GitError>;
}

/// Spawns the system `git` executable.
pub struct SystemGitRunner;

impl GitRunner for SystemGitRunner {
    fn run(&self, dir: &Path, args: &[&str]) -> Result<String, GitError> {
        tracing::debug!(dir = %dir.display(), ?args, "running git");
        let output = Command::new("git").args(args).current_dir(dir).output()?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            "git command failed".to_string()
        } else {
            stderr
        };
        Err(GitError::Command(message))
    }
}

/// A git working tree rooted at a store directory.
#[derive(Clone)]
pub struct GitRepo {
    dir: PathBuf,
    runner: Arc<dyn GitRunner>,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo").field("dir", &self.dir).finish()
    }
}

impl GitRepo {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_runner(dir, Arc::new(SystemGitRunner))
    }

    pub fn with_runner(dir: impl Into<PathBuf>, runner: Arc<dyn GitRunner>) -> Self {
        Self {
            dir: dir.into(),
            runner,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        self.runner.run(&self.dir, args)
    }

    pub fn init(&self) -> Result<(), GitError> {
        self.run(&["init", "-b", DEFAULT_BRANCH]).map(|_| ())
    }

    pub fn current_branch(&self) -> Result<String, GitError> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn checkout(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["checkout", branch]).map(|_| ())
    }

    pub fn checkout_new(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["checkout", "-b", branch]).map(|_| ())
    }

    /// All local branch names, current-branch marker stripped.
    pub fn branches(&self) -> Result<Vec<String>, GitError> {
        let listing = self.run(&["branch", "--list"])?;
        Ok(listing
            .lines()
            .map(|line| line.trim_start_matches('*').trim().to_string())
            .filter(|name| !name.is_empty())
            .collect())
    }

    pub fn add_all(&self) -> Result<(), GitError> {
        self.run(&["add", "-A"]).map(|_| ())
    }

    pub fn add(&self, paths: &[&str]) -> Result<(), GitError> {
        let mut args = vec!["add"];
        args.extend_from_slice(paths);
        self.run(&args).map(|_| ())
    }

    pub fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "-m", message]).map(|_| ())
    }

    pub fn merge(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["merge", "--no-edit", branch]).map(|_| ())
    }

    pub fn delete_branch(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["branch", "-d", branch]).map(|_| ())
    }

    pub fn log_oneline(&self, limit: usize) -> Result<String, GitError> {
        let count = format!("-{limit}");
        self.run(&["log", "--oneline", count.as_str()])
    }

    pub fn has_remote(&self) -> Result<bool, GitError> {
        Ok(!self.run(&["remote"])?.is_empty())
    }

    pub fn push(&self) -> Result<(), GitError> {
        self.run(&["push"]).map(|_| ())
    }

    pub fn pull_rebase(&self) -> Result<(), GitError> {
        self.run(&["pull", "--rebase"]).map(|_| ())
    }

    pub fn is_dirty(&self) -> Result<bool, GitError> {
        Ok(!self.run(&["status", "--porcelain"])?.is_empty())
    }

    /// Read a file from another ref without switching branches,
    /// e.g. `show("main:playbook.md")`.
    pub fn show(&self, refspec: &str) -> Result<String, GitError> {
        self.run(&["show", refspec])
    }

    pub fn config(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.run(&["config", key, value]).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn configure_identity(repo: &GitRepo) {
        repo.config("user.name", "mem test").expect("config name");
        repo.config("user.email", "mem@test.invalid")
            .expect("config email");
    }

    #[test]
    fn init_creates_repo_on_default_branch() {
        let dir = tempdir().expect("temp dir");
        let repo = GitRepo::new(dir.path());
        repo.init().expect("git init");
        assert!(dir.path().join(".git").is_dir());

        configure_identity(&repo);
        std::fs::write(dir.path().join("seed.md"), "seed").expect("write");
        repo.add_all().expect("add");
        repo.commit("seed").expect("commit");
        assert_eq!(repo.current_branch().expect("branch"), DEFAULT_BRANCH);
    }

    #[test]
    fn failed_command_carries_stderr() {
        let dir = tempdir().expect("temp dir");
        let repo = GitRepo::new(dir.path());
        let error = repo.current_branch().expect_err("not a repo");
        match error {
            GitError::Command(message) => {
                assert!(!message.is_empty(), "stderr text should be surfaced")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn is_dirty_reflects_untracked_files() {
        let dir = tempdir().expect("temp dir");
        let repo = GitRepo::new(dir.path());
        repo.init().expect("git init");
        assert!(!repo.is_dirty().expect("clean tree"));
        std::fs::write(dir.path().join("note.md"), "hello").expect("write");
        assert!(repo.is_dirty().expect("dirty tree"));
    }
}
