//! Regular expressions shared by the formatter and the command extractor.
//!
//! Everything here compiles on first use and is immutable afterwards. The
//! `regex` crate runs in linear time, so inputs such as thousands of bare `*`
//! or `[` cannot trigger catastrophic backtracking.

use regex::Regex;
use std::sync::LazyLock;

/// A `<structured_commands>…</structured_commands>` payload, body in group 1.
pub static STRUCTURED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<structured_commands>(.*?)</structured_commands>").unwrap()
});

/// Opening or closing tag left over after paired regions are removed.
pub static STRAY_STRUCTURED_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?structured_commands>").unwrap());

/// Fenced code block: language in group 1, body in group 2.
pub static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)^```([A-Za-z0-9+\-]*)[ \t]*\n(.*?)^```[ \t]*$").unwrap()
});

pub static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

pub static TABLE_ROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\|.+\|$").unwrap());

pub static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,3})\s+(.+)$").unwrap());

pub static BLOCK_QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^> (.+)$").unwrap());

pub static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)([-*+]|\d+\.)\s+(.+)$").unwrap());

pub static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]\n]+)\]\(([^)\n]+)\)").unwrap());

pub static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*([^*\n]+)\*\*").unwrap());

pub static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*").unwrap());

pub static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`\n]+)`").unwrap());

/// SGR escape sequences, used to measure visible width.
pub static ANSI_SGR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block_captures_language_and_body() {
        let caps = FENCED_BLOCK.captures("```go\nfunc main() {}\n```").unwrap();
        assert_eq!(&caps[1], "go");
        assert_eq!(&caps[2], "func main() {}\n");
    }

    #[test]
    fn test_fenced_block_is_non_greedy() {
        let text = "```sh\nls\n```\nmiddle\n```sh\npwd\n```";
        let bodies: Vec<String> = FENCED_BLOCK
            .captures_iter(text)
            .map(|c| c[2].to_string())
            .collect();
        assert_eq!(bodies, vec!["ls\n", "pwd\n"]);
    }

    #[test]
    fn test_unterminated_fence_does_not_match() {
        assert!(FENCED_BLOCK.captures("```bash\nls -la\n").is_none());
    }

    #[test]
    fn test_heading_stops_at_level_three() {
        assert!(HEADING.is_match("### Third"));
        assert!(!HEADING.is_match("#### Fourth"));
        assert!(!HEADING.is_match("#hashtag"));
    }

    #[test]
    fn test_bait_input_completes() {
        let bait = "*".repeat(10_000) + &"[".repeat(10_000);
        assert!(!BOLD.is_match(&bait));
        assert!(!LINK.is_match(&bait));
    }
}
