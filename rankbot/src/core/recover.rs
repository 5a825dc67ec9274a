//! JSON recovery from free-form model text.
//!
//! Models often wrap the structured answer in commentary or markdown fences.
//! [`extract_json`] makes a single pass to cut the JSON candidate out; it does
//! not balance braces, so a bracketed aside after the real payload is sliced
//! into the candidate and fails validation downstream.

use std::sync::LazyLock;

use regex::Regex;

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:[A-Za-z0-9_+-]+)?\s*\n?(.*?)\n?\s*```").expect("fence regex is valid")
});

/// Which rule produced the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// The trimmed text already starts with `{` or `[`.
    Direct,
    /// Inner content of the first fenced code block.
    Fenced,
    /// First opening bracket through the last closing bracket.
    Bracketed,
    /// No JSON boundary found; the trimmed text is passed through.
    Unchanged,
}

/// A JSON candidate cut from model text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extracted<'a> {
    pub json: &'a str,
    pub method: Extraction,
}

/// Cut the most likely JSON value out of `text`.
pub fn extract_json(text: &str) -> Extracted<'_> {
    let stripped = text.trim();

    if stripped.starts_with(['{', '[']) {
        return Extracted {
            json: stripped,
            method: Extraction::Direct,
        };
    }

    if let Some(inner) = FENCE_RE.captures(stripped).and_then(|caps| caps.get(1)) {
        return Extracted {
            json: inner.as_str().trim(),
            method: Extraction::Fenced,
        };
    }

    if let Some(start) = stripped.find(['{', '[']) {
        let candidate = &stripped[start..];
        if let Some(end) = candidate.rfind(['}', ']']) {
            return Extracted {
                json: &candidate[..=end],
                method: Extraction::Bracketed,
            };
        }
    }

    Extracted {
        json: stripped,
        method: Extraction::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_object_is_returned_trimmed() {
        let raw = "  {\"score\": 7}\n";
        let got = extract_json(raw);
        assert_eq!(got.json, "{\"score\": 7}");
        assert_eq!(got.method, Extraction::Direct);
    }

    #[test]
    fn clean_array_takes_fast_path() {
        let got = extract_json("[1, 2, 3]");
        assert_eq!(got.json, "[1, 2, 3]");
        assert_eq!(got.method, Extraction::Direct);
    }

    #[test]
    fn fenced_block_content_is_used() {
        let raw = "Here is my verdict:\n```json\n{\"score\": 9, \"note\": \"x\"}\n```\nThanks!";
        let got = extract_json(raw);
        assert_eq!(got.json, "{\"score\": 9, \"note\": \"x\"}");
        assert_eq!(got.method, Extraction::Fenced);
    }

    #[test]
    fn fence_without_language_tag_is_used() {
        let got = extract_json("Result:\n```\n{\"a\": 1}\n```");
        assert_eq!(got.json, "{\"a\": 1}");
        assert_eq!(got.method, Extraction::Fenced);
    }

    #[test]
    fn chatter_around_object_is_sliced_away() {
        let payload = "{\"score\": 4, \"justification\": \"ok\"}";
        for (before, after) in [
            ("Sure. ", " Let me know."),
            ("After reviewing the repo:\n\n", "\n"),
            ("x", ""),
        ] {
            let raw = format!("{before}{payload}{after}");
            let got = extract_json(&raw);
            assert_eq!(got.json, payload);
            assert_eq!(got.method, Extraction::Bracketed);
        }
    }

    #[test]
    fn text_without_brackets_passes_through() {
        let got = extract_json("  I could not decide.  ");
        assert_eq!(got.json, "I could not decide.");
        assert_eq!(got.method, Extraction::Unchanged);
    }

    #[test]
    fn opening_without_closing_passes_through() {
        let got = extract_json("partial { \"score\": 3");
        assert_eq!(got.json, "partial { \"score\": 3");
        assert_eq!(got.method, Extraction::Unchanged);
    }

    /// Known limitation: a trailing bracketed aside widens the slice past the
    /// real payload, so the candidate no longer parses.
    #[test]
    fn trailing_bracketed_aside_is_sliced_in() {
        let raw = "Verdict: {\"score\": 5} (see [notes])";
        let got = extract_json(raw);
        assert_eq!(got.json, "{\"score\": 5} (see [notes]");
        assert!(serde_json::from_str::<serde_json::Value>(got.json).is_err());
    }
}
