//! Goal document: goal statement, Definition of Done checklist,
//! constraints, and the progress marker.

use crate::docs::{append_to_section, section_bounds, section_lines};
use crate::frontmatter::{self, Frontmatter};

pub const DEFINITION_OF_DONE: &str = "Definition of Done";
pub const CONSTRAINTS: &str = "Constraints";

const UNCHECKED: &str = "- [ ]";
const CHECKED: &str = "- [x]";
const PROGRESS_PREFIX: &str = "## Progress:";

/// One Definition of Done entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub checked: bool,
    pub text: String,
}

/// Initial goal.md content for a new task.
pub fn render_goal(task: &str, text: &str, date: &str) -> String {
    let mut fm = Frontmatter::new();
    fm.set("task", task);
    fm.set("created", date);
    let body = format!("{text}\n\n## {DEFINITION_OF_DONE}\n\n## Progress: 0%\n");
    frontmatter::encode(&fm, &body)
}

/// Replace the goal statement (everything before the first `## ` heading).
pub fn replace_statement(body: &str, text: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let first_heading = lines
        .iter()
        .position(|line| line.trim_start().starts_with("## "))
        .unwrap_or(lines.len());

    let mut out = text.trim_end().to_string();
    if first_heading < lines.len() {
        out.push_str("\n\n");
        out.push_str(&lines[first_heading..].join("\n"));
    }
    out
}

/// The goal statement before the first heading.
pub fn statement(body: &str) -> String {
    body.lines()
        .take_while(|line| !line.trim_start().starts_with("## "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Criteria inside the Definition of Done section, in document order.
pub fn list_criteria(body: &str) -> Vec<Criterion> {
    let Some(lines) = section_lines(body, DEFINITION_OF_DONE) else {
        return vec![];
    };
    lines
        .iter()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            if let Some(text) = trimmed.strip_prefix(CHECKED) {
                Some(Criterion {
                    checked: true,
                    text: text.trim().to_string(),
                })
            } else {
                trimmed.strip_prefix(UNCHECKED).map(|text| Criterion {
                    checked: false,
                    text: text.trim().to_string(),
                })
            }
        })
        .collect()
}

pub fn add_criterion(body: &str, text: &str) -> String {
    append_to_section(body, DEFINITION_OF_DONE, &format!("{UNCHECKED} {text}"))
}

/// Check the `number`-th criterion, counted 1-based among Definition of
/// Done lines that currently read `- [ ]` only. Completed items do not
/// occupy a number, so numbering shifts after every check. Checkbox lines
/// outside the section never count and are never touched.
pub fn check_criterion(body: &str, number: usize) -> Option<String> {
    if number == 0 {
        return None;
    }
    let (start, end) = section_bounds(body, DEFINITION_OF_DONE)?;
    let mut seen = 0usize;
    let mut found = false;
    let lines: Vec<String> = body
        .lines()
        .enumerate()
        .map(|(at, line)| {
            let in_section = at >= start && at < end;
            if !found && in_section && line.trim_start().starts_with(UNCHECKED) {
                seen += 1;
                if seen == number {
                    found = true;
                    return line.replacen(UNCHECKED, CHECKED, 1);
                }
            }
            line.to_string()
        })
        .collect();

    found.then(|| lines.join("\n"))
}

/// Constraint bullets, 1-based over every `- ` line in the section
/// regardless of any other state.
pub fn list_constraints(body: &str) -> Vec<String> {
    let Some(lines) = section_lines(body, CONSTRAINTS) else {
        return vec![];
    };
    lines
        .iter()
        .filter_map(|line| line.trim_start().strip_prefix("- "))
        .map(|text| text.trim().to_string())
        .collect()
}

/// Add a constraint bullet, creating the section just before the progress
/// marker when it does not exist yet.
pub fn add_constraint(body: &str, text: &str) -> String {
    let entry = format!("- {text}");
    if section_lines(body, CONSTRAINTS).is_some() {
        return append_to_section(body, CONSTRAINTS, &entry);
    }

    let lines: Vec<&str> = body.lines().collect();
    let Some(marker) = lines
        .iter()
        .position(|line| line.trim_start().starts_with(PROGRESS_PREFIX))
    else {
        return append_to_section(body, CONSTRAINTS, &entry);
    };

    let mut out: Vec<String> = lines[..marker].iter().map(|line| line.to_string()).collect();
    while out.last().is_some_and(|line| line.trim().is_empty()) {
        out.pop();
    }
    out.push(String::new());
    out.push(format!("## {CONSTRAINTS}"));
    out.push(entry);
    out.push(String::new());
    out.extend(lines[marker..].iter().map(|line| line.to_string()));
    out.join("\n")
}

/// Percentage of checked criteria, round-half-up. `None` when the
/// Definition of Done holds no criteria at all.
pub fn compute_progress(body: &str) -> Option<u8> {
    let criteria = list_criteria(body);
    let total = criteria.len();
    if total == 0 {
        return None;
    }
    let checked = criteria.iter().filter(|criterion| criterion.checked).count();
    Some((100.0 * checked as f64 / total as f64).round() as u8)
}

/// Rewrite the `## Progress: N%` marker when present; otherwise a no-op.
pub fn apply_progress(body: &str, percent: u8) -> String {
    body.lines()
        .map(|line| {
            if line.trim_start().starts_with(PROGRESS_PREFIX) {
                format!("{PROGRESS_PREFIX} {percent}%")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The percentage currently stored in the progress marker.
pub fn stored_progress(body: &str) -> Option<u8> {
    body.lines().find_map(|line| {
        line.trim_start()
            .strip_prefix(PROGRESS_PREFIX)
            .and_then(|rest| rest.trim().strip_suffix('%'))
            .and_then(|digits| digits.trim().parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal_body(criteria: &[&str]) -> String {
        let mut body = String::from("Build X\n\n## Definition of Done\n");
        for line in criteria {
            body.push_str(line);
            body.push('\n');
        }
        body.push_str("\n## Progress: 0%\n");
        body
    }

    #[test]
    fn render_goal_has_empty_definition_of_done() {
        let content = render_goal("demo", "Build X", "2026-08-30");
        let (fm, body) = crate::frontmatter::decode(&content);
        assert_eq!(fm.get("task"), Some("demo"));
        assert!(body.starts_with("Build X"));
        assert!(list_criteria(&body).is_empty());
        assert_eq!(stored_progress(&body), Some(0));
    }

    #[test]
    fn progress_rounds_half_up() {
        let body = goal_body(&["- [x] a", "- [x] b", "- [ ] c"]);
        assert_eq!(compute_progress(&body), Some(67));
    }

    #[test]
    fn progress_without_criteria_is_none() {
        let body = goal_body(&[]);
        assert_eq!(compute_progress(&body), None);
    }

    #[test]
    fn progress_counts_only_definition_of_done_lines() {
        let body = "Intro\n- [ ] stray\n\n## Definition of Done\n- [x] real\n\n## Notes\n- [ ] other";
        assert_eq!(compute_progress(body), Some(100));
    }

    #[test]
    fn check_numbers_unchecked_lines_only() {
        let body = goal_body(&["- [x] done already", "- [ ] first open", "- [ ] second open"]);
        let updated = check_criterion(&body, 2).expect("checked");
        assert!(updated.contains("- [x] second open"));
        assert!(updated.contains("- [ ] first open"));
    }

    #[test]
    fn check_ignores_checkboxes_outside_definition_of_done() {
        let body = "Steps:\n- [ ] stray in goal text\n\n\
                    ## Definition of Done\n- [ ] real criterion\n\n## Progress: 0%";
        let updated = check_criterion(body, 1).expect("checked");
        assert!(updated.contains("- [ ] stray in goal text"));
        assert!(updated.contains("- [x] real criterion"));
    }

    #[test]
    fn check_without_definition_of_done_is_none() {
        assert_eq!(check_criterion("Intro\n- [ ] stray", 1), None);
    }

    #[test]
    fn check_out_of_range_is_none() {
        let body = goal_body(&["- [ ] only"]);
        assert_eq!(check_criterion(&body, 2), None);
        assert_eq!(check_criterion(&body, 0), None);
    }

    #[test]
    fn add_then_check_single_criterion_reaches_full_progress() {
        let body = goal_body(&[]);
        let body = add_criterion(&body, "Ship it");
        let body = check_criterion(&body, 1).expect("checked");
        assert_eq!(
            body.matches("- [x] Ship it").count(),
            1,
            "exactly one checked line"
        );
        assert_eq!(compute_progress(&body), Some(100));
    }

    #[test]
    fn apply_progress_rewrites_marker() {
        let body = goal_body(&["- [x] a"]);
        let updated = apply_progress(&body, 100);
        assert!(updated.contains("## Progress: 100%"));
        assert_eq!(stored_progress(&updated), Some(100));
    }

    #[test]
    fn apply_progress_without_marker_is_noop() {
        let body = "Goal only, no marker";
        assert_eq!(apply_progress(body, 50), body);
    }

    #[test]
    fn constraints_number_all_bullets() {
        let body = goal_body(&["- [ ] a"]);
        let body = add_constraint(&body, "no new dependencies");
        let body = add_constraint(&body, "keep it synchronous");
        let constraints = list_constraints(&body);
        assert_eq!(constraints.len(), 2);
        assert_eq!(constraints[0], "no new dependencies");
        // the section lands before the progress marker
        let constraints_at = body.find("## Constraints").expect("section");
        let progress_at = body.find("## Progress").expect("marker");
        assert!(constraints_at < progress_at);
    }

    #[test]
    fn replace_statement_keeps_sections() {
        let body = goal_body(&["- [ ] a"]);
        let updated = replace_statement(&body, "Build Y instead");
        assert!(updated.starts_with("Build Y instead"));
        assert!(updated.contains("## Definition of Done"));
        assert!(updated.contains("- [ ] a"));
        assert_eq!(statement(&updated), "Build Y instead");
    }
}
