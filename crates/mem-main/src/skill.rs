//! Installs the agent skill file describing how to use `mem`.

use std::fs;
use std::path::{Path, PathBuf};

const SKILL_NAME: &str = "mem";

/// Write the skill under `<home>/.agents/skills/mem/SKILL.md` and return
/// the installed path.
pub fn install(home: &Path) -> Result<PathBuf, String> {
    let dir = home.join(".agents").join("skills").join(SKILL_NAME);
    fs::create_dir_all(&dir)
        .map_err(|error| format!("failed to create {}: {error}", dir.display()))?;
    let path = dir.join("SKILL.md");
    fs::write(&path, skill_markdown())
        .map_err(|error| format!("failed to write {}: {error}", path.display()))?;
    Ok(path)
}

fn skill_markdown() -> String {
    r#"---
name: mem
description: Persist goals, checkpoints, and learnings across sessions with the mem CLI. Use when starting, resuming, or finishing a unit of work.
---

# mem

Task memory stored as markdown in a git branch per task.

When picking up work, run `mem context` to load the goal, current state,
task memory, and the shared playbook. Then keep memory current:

- `mem checkpoint "<what you just finished>"` after each meaningful step
- `mem next "<the single next action>"` whenever the plan changes
- `mem learn "<insight>"` when you discover something worth keeping
- `mem criteria add "<criterion>"` / `mem criteria check <n>` to track the
  Definition of Done; `mem progress` reports completion
- `mem stuck "<reason>"` when blocked, `mem clear` once unblocked
- `mem done` when every criterion is checked; this merges the task branch
  and promotes learnings to the playbook
"#
    .to_string()
}
