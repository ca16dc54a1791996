//! `key=value` configuration file parsing.

use tracing::warn;

/// One setting read from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
}

/// Classification of a single configuration file line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Blank,
    Comment,
    Entry(ConfigEntry),
    /// No `=`, or nothing before it.
    Malformed,
}

/// Parse one line. Surrounding whitespace is ignored on the line and on
/// both halves of the pair; the split happens on the first `=`.
pub fn parse_line(raw: &str) -> Line {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    if line.starts_with('#') {
        return Line::Comment;
    }

    match line.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Line::Entry(ConfigEntry {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
        }),
        _ => Line::Malformed,
    }
}

/// Parse the whole file, skipping blank and comment lines.
///
/// Malformed lines are logged and skipped. Duplicates are kept in file
/// order; later entries overwrite earlier ones when registered.
pub fn parse_entries(content: &str) -> Vec<ConfigEntry> {
    content
        .lines()
        .enumerate()
        .filter_map(|(index, raw)| match parse_line(raw) {
            Line::Entry(entry) => Some(entry),
            Line::Malformed => {
                warn!(
                    "Ignoring configuration line {}: expected key=value, got '{}'",
                    index + 1,
                    raw.trim()
                );
                None
            }
            Line::Blank | Line::Comment => None,
        })
        .collect()
}
