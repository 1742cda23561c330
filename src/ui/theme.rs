//! Colors and glyphs for terminal output
//!
//! Read-only constants; nothing here is mutated at runtime.

use crossterm::style::Color;

pub struct Theme;

impl Theme {
    // ─────────────────────────────────────────────────────────────────────
    // Colors
    // ─────────────────────────────────────────────────────────────────────

    /// Headers, titles, heavy rules
    pub const ACCENT: Color = Color::Cyan;

    /// Labelled list items ("- **Purpose**: ...")
    pub const LABEL: Color = Color::Yellow;

    /// Fenced code block content
    pub const CODE: Color = Color::Green;

    /// Inline `code` spans
    pub const INLINE_CODE: Color = Color::Magenta;

    /// List markers and ordinals
    pub const BULLET: Color = Color::Blue;

    /// Rules, gutters, hints, spinner frames
    pub const MUTED: Color = Color::DarkGrey;

    pub const SUCCESS: Color = Color::Green;

    // ─────────────────────────────────────────────────────────────────────
    // Glyphs
    // ─────────────────────────────────────────────────────────────────────

    pub const RULE_LIGHT: char = '─';
    pub const RULE_HEAVY: char = '━';
    pub const GUTTER: &'static str = "│";
    pub const BULLET_GLYPH: &'static str = "●";
    pub const NESTED_BULLET_GLYPH: &'static str = "◦";
    pub const LABEL_GLYPH: &'static str = "▸";
    pub const SUCCESS_GLYPH: &'static str = "✅";

    /// Width of the rules that frame a whole reply
    pub const FRAME_WIDTH: usize = 52;
}

/// A horizontal rule of `width` repetitions of `glyph`.
pub fn rule(glyph: char, width: usize) -> String {
    std::iter::repeat(glyph).take(width).collect()
}
