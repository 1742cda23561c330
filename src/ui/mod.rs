//! Terminal presentation: theme constants, the markdown renderer and the
//! small building blocks every command's output is made of.

pub mod markdown;
pub mod theme;

use crossterm::style::Stylize;
use theme::{rule, Theme};

/// Bold accent title, indented like rendered headers.
pub fn title(text: &str) -> String {
    format!("  {}", text.with(Theme::ACCENT).bold())
}

/// Muted secondary line under a title.
pub fn subtitle(text: &str) -> String {
    format!("  {}", text.with(Theme::MUTED))
}

/// Full-width heavy rule framing a rendered reply.
pub fn heavy_rule() -> String {
    rule(Theme::RULE_HEAVY, Theme::FRAME_WIDTH)
        .with(Theme::ACCENT)
        .to_string()
}

/// Full-width light rule.
pub fn light_rule() -> String {
    rule(Theme::RULE_LIGHT, Theme::FRAME_WIDTH)
        .with(Theme::MUTED)
        .to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use regex::Regex;
    use std::sync::LazyLock;

    static ANSI: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("valid regex"));

    /// Drop ANSI escape sequences so assertions see only the visible text.
    pub(crate) fn strip_ansi(s: &str) -> String {
        ANSI.replace_all(s, "").into_owned()
    }

    #[test]
    fn test_rules_are_frame_width() {
        assert_eq!(strip_ansi(&super::heavy_rule()).chars().count(), 52);
        assert_eq!(strip_ansi(&super::light_rule()).chars().count(), 52);
    }

    #[test]
    fn test_title_keeps_text() {
        assert_eq!(strip_ansi(&super::title("📖 Explanation")), "  📖 Explanation");
    }
}
