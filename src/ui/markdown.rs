//! Markdown to ANSI terminal text
//!
//! A single pass over the reply, one line at a time. The only state is
//! whether the scanner sits inside a fenced code block; it is created fresh
//! for every [`render`] call and threaded through [`render_line`], so
//! separate renders never see each other.
//!
//! Rules are tried in order and the first match wins:
//!
//! 1. fence line: toggles the block, emits a rule (with the language tag
//!    on opening)
//! 2. inside a block: gutter plus code-styled text, nothing else interpreted
//! 3. `#`..`###` header: blank line, bold title, underline
//! 4. bullet starting with `**`: labelled section with an arrow glyph
//! 5. indented bullet: hollow bullet
//! 6. top-level bullet: filled bullet
//! 7. ordered item: numeral kept
//! 8. anything else: inline styling only
//!
//! Unmatched markers fall through to rule 8, so every input renders.

use super::theme::{rule, Theme};
use crossterm::style::Stylize;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use unicode_width::UnicodeWidthStr;

const FENCE: &str = "```";
const FENCE_OPEN_WIDTH: usize = 44;
const FENCE_CLOSE_WIDTH: usize = 48;

static HEADER: LazyLock<Regex> = LazyLock::new(|| compile(r"^#{1,3}\s"));
static HEADER_MARKER: LazyLock<Regex> = LazyLock::new(|| compile(r"^#+\s*"));
static LABELLED_BULLET: LazyLock<Regex> = LazyLock::new(|| compile(r"^(\s*)[-*]\s+(\*\*.*)$"));
static NESTED_BULLET: LazyLock<Regex> = LazyLock::new(|| compile(r"^(\s{2,})[-*]\s(.*)$"));
static BULLET: LazyLock<Regex> = LazyLock::new(|| compile(r"^[-*]\s(.*)$"));
static ORDERED: LazyLock<Regex> = LazyLock::new(|| compile(r"^(\d+)\.\s(.*)$"));
static BOLD: LazyLock<Regex> = LazyLock::new(|| compile(r"\*\*([^*]+)\*\*"));
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| compile(r"`([^`]+)`"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern {pattern:?}: {e}"))
}

/// Where the scanner is relative to fenced code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockState {
    #[default]
    Prose,
    Code,
}

/// Render a whole markdown reply.
pub fn render(text: &str) -> String {
    let mut state = BlockState::default();
    let mut out: Vec<String> = Vec::new();

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let (next, emitted) = render_line(state, line);
        state = next;
        out.extend(emitted);
    }

    out.join("\n")
}

/// Render one line given the current block state. Returns the state for the
/// next line and the terminal lines to emit (a header emits three).
pub fn render_line(state: BlockState, line: &str) -> (BlockState, Vec<String>) {
    if line.trim_start().starts_with(FENCE) {
        return match state {
            BlockState::Prose => {
                let lang = line.trim()[FENCE.len()..].trim();
                let opener = format!("{} {}", rule(Theme::RULE_LIGHT, FENCE_OPEN_WIDTH), lang);
                (BlockState::Code, vec![format!("  {}", opener.with(Theme::MUTED))])
            }
            BlockState::Code => {
                let closer = rule(Theme::RULE_LIGHT, FENCE_CLOSE_WIDTH);
                (BlockState::Prose, vec![format!("  {}", closer.with(Theme::MUTED))])
            }
        };
    }

    if state == BlockState::Code {
        return (
            state,
            vec![format!(
                "  {} {}",
                Theme::GUTTER.with(Theme::MUTED),
                line.with(Theme::CODE)
            )],
        );
    }

    (state, render_prose(line))
}

fn render_prose(line: &str) -> Vec<String> {
    if HEADER.is_match(line) {
        let stripped = HEADER_MARKER.replace(line, "");
        let content: &str = &stripped;
        let underline = rule(Theme::RULE_LIGHT, content.width() + 2);
        return vec![
            String::new(),
            format!("  {}", content.with(Theme::ACCENT).bold()),
            format!("  {}", underline.with(Theme::ACCENT)),
        ];
    }

    if let Some(caps) = LABELLED_BULLET.captures(line) {
        let body = BOLD.replace_all(&caps[2], |c: &Captures| {
            c[1].with(Theme::LABEL).bold().to_string()
        });
        return vec![format!(
            "{}  {} {}",
            &caps[1],
            Theme::LABEL_GLYPH.with(Theme::LABEL),
            body
        )];
    }

    if let Some(caps) = NESTED_BULLET.captures(line) {
        return vec![format!(
            "{}    {} {}",
            &caps[1],
            Theme::NESTED_BULLET_GLYPH.with(Theme::MUTED),
            inline(&caps[2])
        )];
    }

    if let Some(caps) = BULLET.captures(line) {
        return vec![format!(
            "  {} {}",
            Theme::BULLET_GLYPH.with(Theme::BULLET),
            inline(&caps[1])
        )];
    }

    if let Some(caps) = ORDERED.captures(line) {
        return vec![format!(
            "  {} {}",
            format!("{}.", &caps[1]).with(Theme::BULLET),
            inline(&caps[2])
        )];
    }

    vec![inline(line)]
}

/// Bold and inline-code spans within one line.
pub fn inline(text: &str) -> String {
    let bolded = BOLD.replace_all(text, |c: &Captures| c[1].bold().to_string());
    INLINE_CODE
        .replace_all(&bolded, |c: &Captures| {
            c[1].with(Theme::INLINE_CODE).to_string()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::tests::strip_ansi;

    fn visible(text: &str) -> Vec<String> {
        strip_ansi(&render(text))
            .split('\n')
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_code_block_is_not_reinterpreted() {
        let lines = visible("```rust\n- item\n# title\n**bold**\n```\nafter");
        assert_eq!(lines.len(), 6);
        assert!(lines[0].ends_with(" rust"));
        assert!(lines[0].starts_with("  ────"));
        assert_eq!(lines[1], "  │ - item");
        assert_eq!(lines[2], "  │ # title");
        assert_eq!(lines[3], "  │ **bold**");
        assert_eq!(lines[4], format!("  {}", "─".repeat(48)));
        assert_eq!(lines[5], "after");
    }

    #[test]
    fn test_indented_fence_toggles() {
        let lines = visible("  ```\ncode\n  ```");
        assert_eq!(lines[1], "  │ code");
        assert!(!lines[2].contains('│'));
    }

    #[test]
    fn test_header_underline_width() {
        let lines = visible("## Summary");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "  Summary");
        assert_eq!(lines[2], format!("  {}", "─".repeat(9)));

        let lines = visible("# 日本");
        assert_eq!(lines[2], format!("  {}", "─".repeat(6)));
    }

    #[test]
    fn test_four_hashes_is_plain_text() {
        assert_eq!(visible("#### deep"), vec!["#### deep"]);
    }

    #[test]
    fn test_labelled_bullet() {
        assert_eq!(visible("- **Purpose**: parses input"), vec!["  ▸ Purpose: parses input"]);
        assert_eq!(visible("  * **Nested**: x"), vec!["    ▸ Nested: x"]);
    }

    #[test]
    fn test_bullets_and_ordered_items() {
        assert_eq!(
            visible("- top `code`\n  - nested **b**\n3. third"),
            vec!["  ● top code", "      ◦ nested b", "  3. third"]
        );
    }

    #[test]
    fn test_unmatched_markers_fall_through() {
        assert_eq!(visible("a **b and `c"), vec!["a **b and `c"]);
        assert_eq!(visible("-no space"), vec!["-no space"]);
        assert_eq!(visible(""), vec![""]);
    }

    #[test]
    fn test_inline_styling_is_line_local() {
        assert_eq!(visible("**a\nb**"), vec!["**a", "b**"]);
    }

    #[test]
    fn test_render_is_idempotent_and_stateless() {
        let unterminated = "```\n- inside";
        let first = render(unterminated);
        assert_eq!(first, render(unterminated));

        // An unterminated fence in one render does not leak into the next.
        assert_eq!(visible("- outside"), vec!["  ● outside"]);
    }

    #[test]
    fn test_crlf_input() {
        assert_eq!(visible("- a\r\n- b\r\n"), vec!["  ● a", "  ● b", ""]);
    }

    #[test]
    fn test_render_line_transitions() {
        let (state, _) = render_line(BlockState::Prose, "```python");
        assert_eq!(state, BlockState::Code);
        let (state, out) = render_line(state, "x = 1");
        assert_eq!(state, BlockState::Code);
        assert_eq!(strip_ansi(&out[0]), "  │ x = 1");
        let (state, _) = render_line(state, "```");
        assert_eq!(state, BlockState::Prose);
    }
}
