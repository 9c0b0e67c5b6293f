//! Unicode-aware identifier and annotation matching (spec §4.1).
//!
//! Start set: letter / `_` / `.` / `/` / Unicode category L*, So, Sm, Sk, Po,
//! No. Body set: start set ∪ digits ∪ `-` ∪ category N*, M*. OCTAVE operator
//! glyphs (`→⊕⧺⇌∧∨§`) are excluded from both sets. Trailing `-` is stripped.

use finl_unicode::categories::CharacterCategories;

use crate::error::LexerError;
use crate::token::Warning;

const OPERATOR_GLYPHS: &[char] = &['→', '⊕', '⧺', '⇌', '∧', '∨', '§'];

fn is_operator_glyph(c: char) -> bool {
    OPERATOR_GLYPHS.contains(&c)
}

pub fn is_identifier_start(c: char) -> bool {
    if is_operator_glyph(c) {
        return false;
    }
    // ASCII fast path mirrors the source lexer exactly: only letters, `_`,
    // `.`, `/` start an identifier. The broader category buckets (spec
    // L*/So/Sm/Sk/Po/No, collapsed to finl_unicode's coarser letter/symbol/
    // punctuation/number groups; see DESIGN.md) apply only outside ASCII —
    // otherwise ordinary punctuation like `<`, `%`, `!`, `+` would wrongly
    // absorb into identifiers instead of erroring or staying their own token.
    if c.is_ascii() {
        return c.is_ascii_alphabetic() || c == '_' || c == '.' || c == '/';
    }
    c.is_letter() || c.is_symbol() || c.is_punctuation() || c.is_number()
}

pub fn is_identifier_body(c: char) -> bool {
    if is_operator_glyph(c) {
        return false;
    }
    if c.is_ascii() {
        return c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '/' || c == '-';
    }
    is_identifier_start(c) || c.is_number() || c.is_mark()
}

pub struct IdentifierMatch {
    pub text: String,
    pub consumed: usize,
    /// Set when a `{qualifier}` curly-brace annotation was auto-repaired to
    /// `<qualifier>`, carrying the original lexeme for the repairs audit trail.
    pub curly_repair_original: Option<String>,
}

/// Lookahead chain per spec: match the base identifier first, then — without
/// committing — check for a trailing `<qualifier>` annotation, then (only if
/// that's absent) a `{qualifier}` curly-brace form which is either
/// auto-repaired (lenient) or rejected (strict).
pub fn match_identifier(
    s: &str,
    lenient: bool,
    line: usize,
    column: usize,
    warnings: &mut Vec<Warning>,
) -> Result<Option<IdentifierMatch>, LexerError> {
    let mut chars = s.chars();
    let first = match chars.next() {
        Some(c) if is_identifier_start(c) => c,
        _ => return Ok(None),
    };

    let mut base = String::new();
    base.push(first);
    let mut consumed_chars = 1usize;
    for c in chars {
        if is_identifier_body(c) {
            base.push(c);
            consumed_chars += 1;
        } else {
            break;
        }
    }
    while base.ends_with('-') {
        base.pop();
        consumed_chars -= 1;
    }

    let rest = &s[base.len()..];

    if let Some(angle) = match_angle_qualifier(rest) {
        let full = format!("{base}{angle}");
        let full_chars = full.chars().count();
        return Ok(Some(IdentifierMatch { text: full, consumed: full_chars, curly_repair_original: None }));
    }

    if let Some(curly) = match_curly_qualifier(rest) {
        if lenient {
            warnings.push(Warning::new(
                "W_REPAIR_CANDIDATE",
                format!("'{base}{{{curly}}}' auto-repaired to '{base}<{curly}>'"),
                line,
                column,
            ));
            let full = format!("{base}<{curly}>");
            let consumed = base.chars().count() + curly.chars().count() + 2;
            return Ok(Some(IdentifierMatch {
                text: full,
                consumed,
                curly_repair_original: Some(format!("{base}{{{curly}}}")),
            }));
        } else {
            return Err(LexerError::new(
                format!("curly-brace annotation '{{{curly}}}' must be written as '<{curly}>'"),
                line,
                column,
                "E005",
            ));
        }
    }

    Ok(Some(IdentifierMatch { text: base, consumed: consumed_chars, curly_repair_original: None }))
}

fn match_angle_qualifier(rest: &str) -> Option<String> {
    let mut chars = rest.chars();
    if chars.next()? != '<' {
        return None;
    }
    let after_bracket = &rest[1..];
    let qualifier_start = after_bracket.chars().next()?;
    if !is_identifier_start(qualifier_start) {
        return None;
    }
    let end = after_bracket.find('>')?;
    Some(format!("<{}>", &after_bracket[..end]))
}

fn match_curly_qualifier(rest: &str) -> Option<String> {
    let mut chars = rest.chars();
    if chars.next()? != '{' {
        return None;
    }
    let after_bracket = &rest[1..];
    let end = after_bracket.find('}')?;
    Some(after_bracket[..end].to_string())
}

/// `$VAR` — a dollar sign followed directly by an identifier.
pub fn match_variable(s: &str) -> Option<(String, usize)> {
    if !s.starts_with('$') {
        return None;
    }
    let rest = &s[1..];
    let mut chars = rest.chars();
    let first = chars.next()?;
    if !is_identifier_start(first) {
        return None;
    }
    let mut name = String::new();
    name.push(first);
    for c in chars {
        if is_identifier_body(c) {
            name.push(c);
        } else {
            break;
        }
    }
    let consumed = 1 + name.chars().count();
    Some((name, consumed))
}
