//! Structured payloads come back wrapped in a language-tagged code fence.
//! Extraction tolerates the fence's absence by returning the empty string;
//! callers must treat an empty payload as an explicit failure, not as an
//! empty value.

use regex::Regex;
use std::sync::OnceLock;

fn json_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap())
}

/// Content of the first ```json fence, or the empty string when no fence
/// is present.
pub fn extract_json_block(input: &str) -> String {
    json_fence()
        .captures(input)
        .and_then(|captures| captures.get(1))
        .map(|content| content.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Lenient variant: remove surrounding fence markers if present, otherwise
/// return the trimmed input unchanged. Used where the gateway sometimes
/// answers bare JSON without a fence.
pub fn strip_fence_markers(input: &str) -> String {
    let trimmed = input.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the language tag line, then the closing fence.
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    let rest = rest.trim_end().strip_suffix("```").unwrap_or(rest);
    rest.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_json() {
        let input = "Here is the schema:\n```json\n{\"type\": \"object\"}\n```\nDone.";
        assert_eq!(extract_json_block(input), "{\"type\": \"object\"}");
    }

    #[test]
    fn extracts_first_fence_when_several_present() {
        let input = "```json\n{\"a\": 1}\n```\ntext\n```json\n{\"b\": 2}\n```";
        assert_eq!(extract_json_block(input), "{\"a\": 1}");
    }

    #[test]
    fn missing_fence_degrades_to_empty_string() {
        assert_eq!(extract_json_block("{\"type\": \"object\"}"), "");
        assert_eq!(extract_json_block("no payload here"), "");
    }

    #[test]
    fn multiline_content_is_preserved() {
        let input = "```json\n{\n  \"a\": 1,\n  \"b\": 2\n}\n```";
        assert_eq!(extract_json_block(input), "{\n  \"a\": 1,\n  \"b\": 2\n}");
    }

    #[test]
    fn strip_removes_tagged_fences() {
        assert_eq!(strip_fence_markers("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_fence_markers("```\n[1, 2]\n```"), "[1, 2]");
    }

    #[test]
    fn strip_leaves_bare_payloads_untouched() {
        assert_eq!(strip_fence_markers("  [1, 2] \n"), "[1, 2]");
    }
}
