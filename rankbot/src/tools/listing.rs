//! Output shaping shared by every tool: noise filtering, entry caps and
//! text truncation.

use std::io::{self, Read};

/// Path fragments that never help a judge.
pub const IGNORE_PATTERNS: [&str; 5] = ["__pycache__", ".pyc", "node_modules", ".git", ".DS_Store"];

pub fn is_noise(path: &str) -> bool {
    IGNORE_PATTERNS.iter().any(|pattern| path.contains(pattern))
}

/// Join at most `max_entries` lines; a marker line follows when more existed.
pub fn cap_entries(entries: Vec<String>, max_entries: usize) -> String {
    let total = entries.len();
    let mut lines: Vec<String> = entries.into_iter().take(max_entries).collect();
    if total > max_entries {
        lines.push(format!("... (truncated at {max_entries} files)"));
    }
    lines.join("\n")
}

/// Keep the first `max_lines` lines of `content`, then at most `max_bytes`
/// bytes of those. A marker names whichever bound cut the text.
pub fn truncate_text(content: &str, max_lines: usize, max_bytes: usize) -> String {
    let mut lines = content.lines();
    let head = lines.by_ref().take(max_lines).collect::<Vec<&str>>().join("\n");
    if head.len() > max_bytes {
        let mut end = max_bytes;
        while !head.is_char_boundary(end) {
            end -= 1;
        }
        return format!("{}\n\n... (truncated at {max_bytes} bytes)", &head[..end]);
    }
    if lines.next().is_none() {
        return head;
    }
    format!("{head}\n\n... (truncated at {max_lines} lines)")
}

/// Read at most `max_bytes + 1` bytes, so callers can tell a cut happened
/// without holding the rest in memory.
pub fn read_capped(reader: impl Read, max_bytes: usize) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    reader.take(limit).read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// `path  (N bytes)` listing line.
pub fn sized_entry(path: &str, size: u64) -> String {
    format!("{path}  ({size} bytes)")
}
