//! State file operations shared by every memory document.
//!
//! Documents are read and written whole; callers decode, mutate, and
//! re-encode. One mutating command produces one commit whose message
//! carries a truncated summary of the change.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::git::{GitError, GitRepo};

pub const GOAL_FILE: &str = "goal.md";
pub const STATE_FILE: &str = "state.md";
pub const MEMORY_FILE: &str = "memory.md";
pub const PLAYBOOK_FILE: &str = "playbook.md";

pub const SUMMARY_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum DocError {
    #[error("failed to access {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Git(#[from] GitError),
}

/// Read a document, or `None` when it does not exist.
pub fn read_doc(store_dir: &Path, name: &str) -> Result<Option<String>, DocError> {
    match fs::read_to_string(store_dir.join(name)) {
        Ok(text) => Ok(Some(text)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(DocError::Io {
            name: name.to_string(),
            source: error,
        }),
    }
}

pub fn write_doc(store_dir: &Path, name: &str, content: &str) -> Result<(), DocError> {
    fs::write(store_dir.join(name), content).map_err(|error| DocError::Io {
        name: name.to_string(),
        source: error,
    })
}

/// Stage the given paths and commit.
pub fn commit_paths(repo: &GitRepo, paths: &[&str], message: &str) -> Result<(), DocError> {
    repo.add(paths)?;
    repo.commit(message)?;
    Ok(())
}

/// First line of a change, truncated for use in a commit message.
pub fn summarize(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    if first_line.chars().count() <= SUMMARY_LIMIT {
        return first_line.to_string();
    }
    let truncated: String = first_line.chars().take(SUMMARY_LIMIT).collect();
    format!("{}...", truncated.trim_end())
}

fn heading_index(lines: &[&str], title: &str) -> Option<usize> {
    let heading = format!("## {title}");
    lines.iter().position(|line| line.trim() == heading)
}

fn next_heading(lines: &[&str], from: usize) -> usize {
    lines[from..]
        .iter()
        .position(|line| line.trim_start().starts_with("## "))
        .map(|offset| from + offset)
        .unwrap_or(lines.len())
}

/// Line-index range of a section's content, heading excluded, ending at
/// the next `## ` heading or end of document.
pub fn section_bounds(body: &str, title: &str) -> Option<(usize, usize)> {
    let lines: Vec<&str> = body.lines().collect();
    let heading = heading_index(&lines, title)?;
    Some((heading + 1, next_heading(&lines, heading + 1)))
}

/// Lines strictly inside a `## <title>` section.
pub fn section_lines<'a>(body: &'a str, title: &str) -> Option<Vec<&'a str>> {
    let (start, end) = section_bounds(body, title)?;
    Some(body.lines().skip(start).take(end - start).collect())
}

/// Append a line at the end of a section, creating the section at the end
/// of the document when it is missing.
pub fn append_to_section(body: &str, title: &str, entry: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let Some(heading) = heading_index(&lines, title) else {
        let mut out = body.trim_end().to_string();
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&format!("## {title}\n{entry}\n"));
        return out;
    };

    let end = next_heading(&lines, heading + 1);
    let mut insert_at = end;
    while insert_at > heading + 1 && lines[insert_at - 1].trim().is_empty() {
        insert_at -= 1;
    }

    let mut out: Vec<String> = lines.iter().map(|line| line.to_string()).collect();
    out.insert(insert_at, entry.to_string());
    out.join("\n")
}

/// Replace a section's content, creating the section at the end of the
/// document when it is missing.
pub fn replace_section(body: &str, title: &str, content: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let Some(heading) = heading_index(&lines, title) else {
        let mut out = body.trim_end().to_string();
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&format!("## {title}\n\n{content}\n"));
        return out;
    };

    let end = next_heading(&lines, heading + 1);
    let mut out: Vec<String> = lines[..=heading].iter().map(|line| line.to_string()).collect();
    out.push(String::new());
    out.extend(content.lines().map(|line| line.to_string()));
    if end < lines.len() {
        out.push(String::new());
        out.extend(lines[end..].iter().map(|line| line.to_string()));
    }
    out.join("\n")
}

/// A section's content with surrounding blank lines stripped.
pub fn section_content(body: &str, title: &str) -> Option<String> {
    section_lines(body, title).map(|lines| lines.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_doc_missing_file_is_none() {
        let dir = tempdir().expect("temp dir");
        let read = read_doc(dir.path(), GOAL_FILE).expect("read");
        assert_eq!(read, None);
    }

    #[test]
    fn write_then_read_doc() {
        let dir = tempdir().expect("temp dir");
        write_doc(dir.path(), STATE_FILE, "content").expect("write");
        assert_eq!(
            read_doc(dir.path(), STATE_FILE).expect("read").as_deref(),
            Some("content")
        );
    }

    #[test]
    fn summarize_truncates_long_first_line() {
        let long = "a change description that runs on well past the fifty character budget";
        let summary = summarize(long);
        assert!(summary.len() <= SUMMARY_LIMIT + 3);
        assert!(summary.ends_with("..."));

        assert_eq!(summarize("short message"), "short message");
        assert_eq!(summarize("first line\nsecond line"), "first line");
    }

    #[test]
    fn append_to_existing_section_keeps_following_heading() {
        let body = "Goal\n\n## Checkpoints\n- [x] 2026-01-01: one\n\n## Other\ntext";
        let updated = append_to_section(body, "Checkpoints", "- [x] 2026-01-02: two");
        let lines: Vec<&str> = updated.lines().collect();
        let two = lines
            .iter()
            .position(|line| line.contains("two"))
            .expect("entry present");
        assert!(lines[two - 1].contains("one"));
        assert!(updated.contains("## Other"));
    }

    #[test]
    fn append_creates_missing_section() {
        let updated = append_to_section("Goal text", "Checkpoints", "- [x] 2026-01-01: start");
        assert!(updated.contains("## Checkpoints\n- [x] 2026-01-01: start"));
    }

    #[test]
    fn replace_section_swaps_content_only() {
        let body = "## Next Step\n\nold step\n\n## Checkpoints\n- [x] entry";
        let updated = replace_section(body, "Next Step", "new step");
        assert!(updated.contains("new step"));
        assert!(!updated.contains("old step"));
        assert!(updated.contains("- [x] entry"));
    }

    #[test]
    fn section_lines_stop_at_next_heading() {
        let body = "## Definition of Done\n- [ ] a\n- [x] b\n\n## Progress: 50%";
        let lines = section_lines(body, "Definition of Done").expect("section");
        assert_eq!(lines.len(), 3);
        assert!(!lines.iter().any(|line| line.contains("Progress")));
    }

    #[test]
    fn section_content_missing_section_is_none() {
        assert_eq!(section_content("no sections here", "Checkpoints"), None);
    }
}
