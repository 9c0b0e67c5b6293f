//! Ordered token-recognition patterns (spec §4.1 "Token recognition order").
//!
//! Ordering here is semantically meaningful and must not be reshuffled:
//! grammar sentinel, then version (three shrinking-specificity passes before
//! falling through to NUMBER), then envelope markers, then operators
//! longest-first, then literals, then identifiers.

use std::sync::OnceLock;

use regex::Regex;

use crate::token::TokenKind;

fn regex_cell(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap())
}

pub fn grammar_sentinel() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex_cell(&CELL, r"^OCTAVE::\d+\.\d+\.\d+(?:-[0-9A-Za-z.]+)?(?:\+[0-9A-Za-z.]+)?")
}

pub fn envelope_end() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex_cell(&CELL, r"^===END===")
}

pub fn envelope_start() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex_cell(&CELL, r"^===([^=\n]*)===")
}

pub fn inline_fence_antipattern() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex_cell(&CELL, r"^\s*\w+::\s*```")
}

// Version must be tried in three shrinking-specificity passes before NUMBER.
fn version_full() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex_cell(&CELL, r"^\d+\.\d+\.\d+(?:-[0-9A-Za-z.]+)?(?:\+[0-9A-Za-z.]+)?")
}
fn version_prerelease() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex_cell(&CELL, r"^\d+\.\d+-[0-9A-Za-z.]+")
}
fn version_build() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex_cell(&CELL, r"^\d+\.\d+\+[0-9A-Za-z.]+")
}

pub fn match_version(s: &str) -> Option<String> {
    for re in [version_full(), version_prerelease(), version_build()] {
        if let Some(m) = re.find(s) {
            return Some(m.as_str().to_string());
        }
    }
    None
}

fn number_re() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex_cell(&CELL, r"^-?\d+(\.\d+)?([eE][+-]?\d+)?")
}

pub fn match_number(s: &str) -> Option<(String, usize)> {
    number_re().find(s).map(|m| (m.as_str().to_string(), m.as_str().chars().count()))
}

fn quoted_re() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex_cell(&CELL, r#"^"((?:[^"\\]|\\.)*)""#)
}

pub fn match_quoted(s: &str) -> Option<(String, usize)> {
    let caps = quoted_re().captures(s)?;
    let whole = caps.get(0)?.as_str();
    let inner = caps.get(1)?.as_str();
    let unescaped = inner.replace("\\n", "\n").replace("\\t", "\t").replace("\\r", "\r").replace("\\\"", "\"");
    Some((unescaped, whole.chars().count()))
}

pub fn match_triple_quoted(s: &str) -> Option<(String, usize)> {
    if !s.starts_with("\"\"\"") {
        return None;
    }
    let rest = &s[3..];
    let end = rest.find("\"\"\"")?;
    let content = &rest[..end];
    let consumed = 3 + content.chars().count() + 3;
    Some((content.to_string(), consumed))
}

const BOOLEAN_NULL_CANDIDATES: &[(&str, &str)] = &[
    ("true", "true"),
    ("True", "true"),
    ("TRUE", "true"),
    ("false", "false"),
    ("False", "false"),
    ("FALSE", "false"),
    ("null", "null"),
    ("Null", "null"),
    ("NULL", "null"),
    ("none", "null"),
    ("None", "null"),
    ("NONE", "null"),
];

pub fn match_boolean_or_null(s: &str) -> Option<(&'static str, &'static str, usize)> {
    for (literal, canonical) in BOOLEAN_NULL_CANDIDATES {
        if s.starts_with(literal) {
            let after = &s[literal.len()..];
            let boundary_ok = after.chars().next().map(|c| !c.is_alphanumeric() && c != '_').unwrap_or(true);
            if boundary_ok {
                return Some((canonical, literal, literal.chars().count()));
            }
        }
    }
    None
}

/// Operators are matched longest-first so `::` wins over `:` and `<->` wins
/// over `->`/`<`. Returns (ascii_spelling, unicode_spelling, kind, consumed_chars).
pub fn match_operator(s: &str) -> Option<(&'static str, &'static str, TokenKind, usize)> {
    const TABLE: &[(&str, &str, TokenKind)] = &[
        ("::", "::", TokenKind::Assign),
        ("<->", "⇌", TokenKind::Tension),
        ("⇌", "⇌", TokenKind::Tension),
        ("->", "→", TokenKind::Flow),
        ("→", "→", TokenKind::Flow),
        ("⊕", "⊕", TokenKind::Synthesis),
        ("⧺", "⧺", TokenKind::Concat),
        ("∧", "∧", TokenKind::Constraint),
        ("∨", "∨", TokenKind::Alternative),
        ("§", "§", TokenKind::Section),
        (":", ":", TokenKind::Block),
        ("[", "[", TokenKind::ListStart),
        ("]", "]", TokenKind::ListEnd),
        (",", ",", TokenKind::Comma),
        ("@", "@", TokenKind::At),
    ];
    for (ascii, unicode, kind) in TABLE {
        if s.starts_with(ascii) {
            return Some((ascii, unicode, *kind, ascii.chars().count()));
        }
    }
    // Single-char ASCII aliases that require word-boundary or context checks.
    if let Some(rest) = s.strip_prefix('+') {
        if !rest.starts_with('+') {
            return Some(("+", "⊕", TokenKind::Synthesis, 1));
        }
    }
    if let Some(rest) = s.strip_prefix('~') {
        let _ = rest;
        return Some(("~", "⧺", TokenKind::Concat, 1));
    }
    if s.starts_with('|') {
        return Some(("|", "∨", TokenKind::Alternative, 1));
    }
    if s.starts_with('&') {
        return Some(("&", "∧", TokenKind::Constraint, 1));
    }
    if s.starts_with('#') {
        return Some(("#", "§", TokenKind::Section, 1));
    }
    if s.starts_with("vs") {
        let after = s[2..].chars().next();
        let before_ok = true; // boundary before is checked by the caller via whitespace scan
        if before_ok && after.map(|c| !c.is_alphanumeric()).unwrap_or(true) {
            return Some(("vs", "⇌", TokenKind::Tension, 2));
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceDecision {
    Close,
    NestedError,
    Content,
}

/// The four-way fence precedence rule (spec §4.1, Open Question in §9:
/// equal-length-with-trailing-content is an error, never "new info tag").
pub fn evaluate_fence_line(line: &str, open_len: usize) -> FenceDecision {
    let trimmed = line.trim_start();
    if !trimmed.starts_with("```") {
        return FenceDecision::Content;
    }
    let backtick_len = trimmed.chars().take_while(|&c| c == '`').count();
    let trailing = &trimmed[backtick_len..];

    if backtick_len == open_len && trailing.trim().is_empty() {
        FenceDecision::Close
    } else if backtick_len >= open_len && !trailing.trim().is_empty() {
        FenceDecision::NestedError
    } else if backtick_len > open_len {
        FenceDecision::NestedError
    } else {
        FenceDecision::Content
    }
}

/// Length of the opening fence marker on this (already-normalized) line, if
/// it opens one (indented up to 3 spaces, per spec).
pub fn fence_open_len(line: &str) -> Option<usize> {
    let indent = line.chars().take_while(|&c| c == ' ').count();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    if !rest.starts_with("```") {
        return None;
    }
    Some(rest.chars().take_while(|&c| c == '`').count())
}

pub fn envelope_identifier(matched: &str) -> &str {
    matched.trim_start_matches("===").trim_end_matches("===")
}

pub fn validate_envelope_identifier(id: &str, line: usize, column: usize) -> Result<(), crate::error::LexerError> {
    if id.is_empty() {
        return Ok(());
    }
    let mut chars = id.chars();
    let first = chars.next().unwrap();
    if first.is_ascii_digit() {
        return Err(crate::error::LexerError::new(
            format!("envelope identifier '{id}' cannot start with a digit"),
            line,
            column,
            "E_INVALID_ENVELOPE_ID",
        ));
    }
    for c in id.chars() {
        if c == '-' {
            return Err(crate::error::LexerError::new(
                format!("envelope identifier '{id}' contains a hyphen, which is not allowed"),
                line,
                column,
                "E_INVALID_ENVELOPE_ID",
            ));
        }
        if c == ' ' {
            return Err(crate::error::LexerError::new(
                format!("envelope identifier '{id}' contains a space, which is not allowed"),
                line,
                column,
                "E_INVALID_ENVELOPE_ID",
            ));
        }
        if !(c.is_alphanumeric() || c == '_') {
            return Err(crate::error::LexerError::new(
                format!("envelope identifier '{id}' contains invalid character '{c}'"),
                line,
                column,
                "E_INVALID_ENVELOPE_ID",
            ));
        }
    }
    Ok(())
}
