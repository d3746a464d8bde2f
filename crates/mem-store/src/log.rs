//! Append-only logs: per-task memory.md and the shared playbook.md.

/// Initial content for a log document.
pub fn render_log(title: &str) -> String {
    format!("# {title}\n")
}

/// Append a dated bullet entry at the end of the log.
pub fn append_entry(content: &str, date: &str, text: &str) -> String {
    let mut out = content.trim_end().to_string();
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&format!("- {date}: {text}\n"));
    out
}

/// All bullet entries, oldest first.
pub fn entries(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|line| line.trim_start().starts_with("- "))
        .map(|line| line.trim().to_string())
        .collect()
}
