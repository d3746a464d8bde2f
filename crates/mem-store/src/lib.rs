//! Git-backed persistence for agent memory documents.
//!
//! A store is a git repository holding four markdown documents per task
//! branch; this crate owns the frontmatter codec, store resolution, the
//! branch guard, and the typed operations over those documents.

pub mod docs;
pub mod frontmatter;
pub mod git;
pub mod goal;
pub mod index;
pub mod log;
pub mod state;
pub mod store;

pub use docs::{
    DocError, GOAL_FILE, MEMORY_FILE, PLAYBOOK_FILE, STATE_FILE, read_doc, write_doc,
};
pub use frontmatter::Frontmatter;
pub use git::{DEFAULT_BRANCH, GitError, GitRepo, GitRunner, TASK_BRANCH_PREFIX};
pub use index::{IndexStore, JsonIndexStore, MemoryIndexStore};
pub use state::Status;
pub use store::{StoreHandle, ensure_branch, resolve};
