//! Path index for the central store.
//!
//! Maps absolute project directories to task branch names. Lookup walks
//! from the queried path upward through its ancestors and returns the
//! first exact match, so the nearest mapped ancestor wins.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to write index: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize index: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Capability over the project-path-to-branch mapping. Injected into the
/// resolver so tests can substitute an in-memory fake.
pub trait IndexStore {
    /// Nearest-ancestor lookup: the path itself first, then each parent.
    fn lookup(&self, path: &Path) -> Option<String>;

    fn set(&mut self, path: &Path, branch: &str) -> Result<(), IndexError>;

    fn remove(&mut self, path: &Path) -> Result<(), IndexError>;

    fn entries(&self) -> Vec<(PathBuf, String)>;
}

fn lookup_in(entries: &BTreeMap<String, String>, path: &Path) -> Option<String> {
    path.ancestors()
        .find_map(|dir| entries.get(&dir.to_string_lossy().to_string()).cloned())
}

/// Index persisted as a flat JSON object in the central store.
///
/// A missing or unparsable file loads as an empty index; the mapping is
/// advisory state and availability wins over corruption detection.
#[derive(Debug)]
pub struct JsonIndexStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonIndexStore {
    pub fn open(central_dir: &Path) -> Self {
        let path = central_dir.join(INDEX_FILE);
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        Self { path, entries }
    }

    fn save(&self) -> Result<(), IndexError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

impl IndexStore for JsonIndexStore {
    fn lookup(&self, path: &Path) -> Option<String> {
        lookup_in(&self.entries, path)
    }

    fn set(&mut self, path: &Path, branch: &str) -> Result<(), IndexError> {
        self.entries
            .insert(path.to_string_lossy().to_string(), branch.to_string());
        self.save()
    }

    fn remove(&mut self, path: &Path) -> Result<(), IndexError> {
        self.entries.remove(&path.to_string_lossy().to_string());
        self.save()
    }

    fn entries(&self) -> Vec<(PathBuf, String)> {
        self.entries
            .iter()
            .map(|(path, branch)| (PathBuf::from(path), branch.clone()))
            .collect()
    }
}

/// In-memory index used by unit tests.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    entries: BTreeMap<String, String>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexStore for MemoryIndexStore {
    fn lookup(&self, path: &Path) -> Option<String> {
        lookup_in(&self.entries, path)
    }

    fn set(&mut self, path: &Path, branch: &str) -> Result<(), IndexError> {
        self.entries
            .insert(path.to_string_lossy().to_string(), branch.to_string());
        Ok(())
    }

    fn remove(&mut self, path: &Path) -> Result<(), IndexError> {
        self.entries.remove(&path.to_string_lossy().to_string());
        Ok(())
    }

    fn entries(&self) -> Vec<(PathBuf, String)> {
        self.entries
            .iter()
            .map(|(path, branch)| (PathBuf::from(path), branch.clone()))
            .collect()
    }
}
