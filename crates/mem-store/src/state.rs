//! State document: task status machine, next step, checkpoints.

use std::fmt;
use std::str::FromStr;

use crate::docs::{append_to_section, replace_section, section_content};
use crate::frontmatter::{self, Frontmatter};

pub const NEXT_STEP: &str = "Next Step";
pub const CHECKPOINTS: &str = "Checkpoints";

pub const STATUS_KEY: &str = "status";
pub const BLOCKER_KEY: &str = "blocker";
pub const WAKE_KEY: &str = "wake";
pub const WAKE_COMMAND_KEY: &str = "wake_command";

/// Task lifecycle state. `active ⇄ blocked`, `active → done`; nothing
/// leaves `done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    Blocked,
    Done,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Blocked => "blocked",
            Status::Done => "done",
        }
    }

    pub fn can_become(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Active, Status::Blocked)
                | (Status::Blocked, Status::Active)
                | (Status::Active, Status::Done)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "active" => Ok(Status::Active),
            "blocked" => Ok(Status::Blocked),
            "done" => Ok(Status::Done),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Initial state.md content for a new task.
pub fn render_state() -> String {
    let mut fm = Frontmatter::new();
    fm.set(STATUS_KEY, Status::Active.as_str());
    let body = format!("## {NEXT_STEP}\n\n## {CHECKPOINTS}\n");
    frontmatter::encode(&fm, &body)
}

/// Status recorded in a state document's frontmatter; a missing or
/// unknown value reads as active.
pub fn status_of(fm: &Frontmatter) -> Status {
    fm.get(STATUS_KEY)
        .and_then(|value| value.parse().ok())
        .unwrap_or(Status::Active)
}

pub fn set_next_step(body: &str, text: &str) -> String {
    replace_section(body, NEXT_STEP, text.trim())
}

pub fn next_step(body: &str) -> Option<String> {
    section_content(body, NEXT_STEP).filter(|content| !content.is_empty())
}

pub fn append_checkpoint(body: &str, date: &str, message: &str) -> String {
    append_to_section(body, CHECKPOINTS, &format!("- [x] {date}: {message}"))
}

/// Checkpoint bullet lines, oldest first.
pub fn checkpoints(body: &str) -> Vec<String> {
    section_content(body, CHECKPOINTS)
        .map(|content| {
            content
                .lines()
                .filter(|line| line.trim_start().starts_with("- "))
                .map(|line| line.trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}
