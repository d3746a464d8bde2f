//! Line-oriented frontmatter codec for memory documents.
//!
//! This is deliberately not a YAML parser: keys and values are plain
//! single-line strings, a value keeps everything after the first colon
//! verbatim, and lines without a colon are dropped.

/// An insertion-ordered string-to-string metadata block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    entries: Vec<(String, String)>,
}

impl Frontmatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Set a key, replacing an existing value in place so insertion order
    /// is stable across rewrites.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let position = self.entries.iter().position(|(existing, _)| existing == key)?;
        Some(self.entries.remove(position).1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Split a document into its frontmatter block and body.
///
/// Input that does not open with a `---` fence and close it with another
/// is returned whole as the body. The body is trimmed of surrounding
/// whitespace.
pub fn decode(text: &str) -> (Frontmatter, String) {
    let normalized = text.replace("\r\n", "\n");
    let Some(rest) = normalized.strip_prefix("---\n") else {
        return (Frontmatter::new(), text.to_string());
    };
    let Some(end) = rest.find("\n---\n") else {
        return (Frontmatter::new(), text.to_string());
    };

    let mut frontmatter = Frontmatter::new();
    for line in rest[..end].lines() {
        if let Some((key, value)) = line.split_once(':') {
            frontmatter.set(key.trim(), value.trim());
        }
    }
    let body = rest[end + "\n---\n".len()..].trim().to_string();
    (frontmatter, body)
}

/// Render a frontmatter block followed by the body, verbatim. An empty
/// map still produces both fences, with a blank line between them so the
/// result stays decodable.
pub fn encode(frontmatter: &Frontmatter, body: &str) -> String {
    let mut out = String::from("---\n");
    for (key, value) in frontmatter.iter() {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
    if frontmatter.is_empty() {
        out.push('\n');
    }
    out.push_str("---\n\n");
    out.push_str(body);
    out
}
