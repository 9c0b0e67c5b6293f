//! Phase 1: Lexer — tokenization.
//!
//! `tokenize(text, lenient)` turns source text into a flat `Vec<Token>` plus
//! a `Vec<Repair>` audit trail, or raises [`LexerError`] on a structural
//! failure (unbalanced brackets, unterminated fence, tab outside a literal
//! zone, invalid envelope identifier).
//!
//! ## Submodules
//!
//! - [`patterns`] — ordered token-pattern table and the fence precedence rule
//! - [`identifier`] — Unicode-aware identifier/annotation matching
//! - [`normalize`] — NFC normalization with literal-zone (fence) detection

pub mod identifier;
pub mod normalize;
pub mod patterns;

use tracing::instrument;

use crate::error::LexerError;
use crate::token::{Repair, RepairKind, Token, TokenKind, Warning};

/// Bracket kinds tracked for balance checking (spec §4.1 "Bracket balance").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BracketChar {
    Square,
}

struct BracketFrame {
    kind: BracketChar,
    line: usize,
    column: usize,
}

pub struct Lexer<'a> {
    lenient: bool,
    repairs: Vec<Repair>,
    warnings: Vec<Warning>,
    bracket_stack: Vec<BracketFrame>,
    _source: &'a str,
}

/// Full lex result: the token stream, the repair audit trail, and any
/// non-fatal lenient-mode warnings.
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub repairs: Vec<Repair>,
    pub warnings: Vec<Warning>,
}

#[instrument(skip(text))]
pub fn tokenize(text: &str, lenient: bool) -> Result<LexOutput, LexerError> {
    let mut lexer = Lexer { lenient, repairs: Vec::new(), warnings: Vec::new(), bracket_stack: Vec::new(), _source: text };
    let tokens = lexer.run(text)?;
    Ok(LexOutput { tokens, repairs: lexer.repairs, warnings: lexer.warnings })
}

impl<'a> Lexer<'a> {
    fn run(&mut self, text: &str) -> Result<Vec<Token>, LexerError> {
        let lines = normalize::normalize_with_fences(text);
        let mut tokens = Vec::new();
        let mut in_fence: Option<(usize, String)> = None; // (fence length, marker string)

        for (line_idx, line) in lines.iter().enumerate() {
            let line_no = line_idx + 1;

            if let Some((fence_len, _)) = &in_fence {
                match patterns::evaluate_fence_line(&line.text, *fence_len) {
                    patterns::FenceDecision::Close => {
                        tokens.push(Token::new(TokenKind::FenceClose, line.text.trim().to_string(), line_no, 1));
                        in_fence = None;
                        continue;
                    }
                    patterns::FenceDecision::NestedError => {
                        return Err(LexerError::new(
                            "nested fence of equal or greater length inside an open fence",
                            line_no,
                            1,
                            "E007",
                        ));
                    }
                    patterns::FenceDecision::Content => {
                        tokens.push(
                            Token::new(TokenKind::LiteralContent, line.raw.clone(), line_no, 1).with_raw_lexeme(line.raw.clone()),
                        );
                        continue;
                    }
                }
            }

            if let Some(open_len) = patterns::fence_open_len(&line.text) {
                let marker = "`".repeat(open_len);
                let info_tag = line.text.trim_start_matches('`').trim();
                let mut value = marker.clone();
                if !info_tag.is_empty() {
                    value.push_str(info_tag);
                }
                tokens.push(Token::new(TokenKind::FenceOpen, value, line_no, 1));
                in_fence = Some((open_len, marker));
                continue;
            }

            self.tokenize_line(&line.text, line_no, line_idx == 0, &mut tokens)?;
            tokens.push(Token::new(TokenKind::Newline, "\n", line_no, line.text.chars().count() + 1));
        }

        if in_fence.is_some() {
            let hint = lines
                .iter()
                .take(lines.len().saturating_sub(1))
                .find(|l| patterns::inline_fence_antipattern().is_match(&l.text))
                .map(|l| format!(" (possible inline-fence antipattern on: {})", l.text.trim()));
            return Err(LexerError::new(
                format!("unterminated literal zone{}", hint.unwrap_or_default()),
                lines.len(),
                1,
                "E006",
            ));
        }

        if let Some(frame) = self.bracket_stack.first() {
            return Err(LexerError::new("unclosed '['", frame.line, frame.column, "E_UNBALANCED_BRACKET"));
        }

        tokens.push(Token::new(TokenKind::Eof, "", lines.len() + 1, 1));
        Ok(tokens)
    }

    fn tokenize_line(&mut self, line: &str, line_no: usize, is_first_line: bool, out: &mut Vec<Token>) -> Result<(), LexerError> {
        let chars: Vec<char> = line.chars().collect();
        let mut col = 0usize; // 0-based char index into `chars`

        while col < chars.len() {
            let c = chars[col];

            if c == '\t' {
                return Err(LexerError::new("tab character outside literal zone", line_no, col + 1, "E005"));
            }
            if c == ' ' {
                col += 1;
                continue;
            }
            let remainder: String = chars[col..].iter().collect();

            if remainder.starts_with("//") {
                let text: String = chars[col + 2..].iter().collect();
                out.push(Token::new(TokenKind::Comment, text.trim().to_string(), line_no, col + 1));
                return Ok(());
            }

            if is_first_line && col == 0 {
                if let Some(m) = patterns::grammar_sentinel().find(&remainder) {
                    let matched = m.as_str();
                    let version = matched.trim_start_matches("OCTAVE::");
                    out.push(Token::new(TokenKind::GrammarSentinel, "OCTAVE", line_no, col + 1));
                    out.push(Token::new(TokenKind::Assign, "::", line_no, col + 1 + 6));
                    out.push(Token::new(TokenKind::Version, version, line_no, col + 1 + 8).with_raw_lexeme(version));
                    col += matched.chars().count();
                    continue;
                }
            }

            if let Some(m) = patterns::envelope_end().find(&remainder) {
                out.push(Token::new(TokenKind::EnvelopeEnd, m.as_str(), line_no, col + 1));
                col += m.as_str().chars().count();
                continue;
            }
            if let Some(m) = patterns::envelope_start().find(&remainder) {
                let captured = patterns::envelope_identifier(m.as_str());
                patterns::validate_envelope_identifier(captured, line_no, col + 1)?;
                out.push(Token::new(TokenKind::EnvelopeStart, m.as_str(), line_no, col + 1));
                col += m.as_str().chars().count();
                continue;
            }

            if remainder.starts_with("---") && !remainder.chars().nth(3).map(|c| c.is_alphanumeric()).unwrap_or(false) {
                out.push(Token::new(TokenKind::Separator, "---", line_no, col + 1));
                col += 3;
                continue;
            }

            if let Some(ver) = patterns::match_version(&remainder) {
                out.push(Token::new(TokenKind::Version, ver.clone(), line_no, col + 1).with_raw_lexeme(ver.clone()));
                col += ver.chars().count();
                continue;
            }

            if let Some((ascii, unicode, kind, consumed)) = patterns::match_operator(&remainder) {
                let tok_kind = kind;
                if ascii != unicode {
                    self.repairs.push(Repair {
                        kind: RepairKind::AsciiAlias,
                        original: ascii.to_string(),
                        normalized: unicode.to_string(),
                        line: line_no,
                        column: col + 1,
                    });
                }
                if tok_kind == TokenKind::ListStart {
                    self.bracket_stack.push(BracketFrame { kind: BracketChar::Square, line: line_no, column: col + 1 });
                } else if tok_kind == TokenKind::ListEnd {
                    if self.bracket_stack.pop().is_none() {
                        return Err(LexerError::new("unmatched ']'", line_no, col + 1, "E_UNBALANCED_BRACKET"));
                    }
                }
                out.push(Token::new(tok_kind, unicode, line_no, col + 1));
                col += consumed;
                continue;
            }

            if remainder.starts_with("\"\"\"") {
                if let Some((content, consumed)) = patterns::match_triple_quoted(&remainder) {
                    self.repairs.push(Repair {
                        kind: RepairKind::TripleQuoteString,
                        original: format!("\"\"\"{content}\"\"\""),
                        normalized: format!("\"{content}\""),
                        line: line_no,
                        column: col + 1,
                    });
                    out.push(Token::new(TokenKind::String, content, line_no, col + 1));
                    col += consumed;
                    continue;
                }
            }
            if remainder.starts_with('"') {
                if let Some((content, consumed)) = patterns::match_quoted(&remainder) {
                    out.push(Token::new(TokenKind::String, content, line_no, col + 1));
                    col += consumed;
                    continue;
                }
            }

            if let Some((value, consumed)) = patterns::match_number(&remainder) {
                out.push(Token::new(TokenKind::Number, value.clone(), line_no, col + 1).with_raw_lexeme(value));
                col += consumed;
                continue;
            }

            if let Some((canonical, original, consumed)) = patterns::match_boolean_or_null(&remainder) {
                let kind = match canonical {
                    "true" | "false" => TokenKind::Boolean,
                    _ => TokenKind::Null,
                };
                let mut tok = Token::new(kind, canonical, line_no, col + 1);
                if canonical != original {
                    self.warnings.push(Warning::new(
                        "W_WRONG_CASE",
                        format!("'{original}' should be written as '{canonical}'"),
                        line_no,
                        col + 1,
                    ));
                    tok = tok.with_normalization(original);
                }
                out.push(tok);
                col += consumed;
                continue;
            }

            if c == '$' {
                if let Some((name, consumed)) = identifier::match_variable(&remainder) {
                    out.push(Token::new(TokenKind::Variable, name, line_no, col + 1));
                    col += consumed;
                    continue;
                }
            }

            if let Some(m) = identifier::match_identifier(&remainder, self.lenient, line_no, col + 1, &mut self.warnings)? {
                if let Some(original) = &m.curly_repair_original {
                    self.repairs.push(Repair {
                        kind: RepairKind::CurlyBraceAnnotation,
                        original: original.clone(),
                        normalized: m.text.clone(),
                        line: line_no,
                        column: col + 1,
                    });
                }
                out.push(Token::new(TokenKind::Identifier, m.text.clone(), line_no, col + 1));
                col += m.consumed;
                continue;
            }

            // GH#287: `%` merges into the preceding NUMBER/IDENTIFIER token
            // (e.g. `60%`, `100%_complete`) — a standalone or prefix `%` is
            // still E005. ADR-0005 Decision 3: `%` is only valid in value
            // contexts, not in keys, so a `%` immediately followed by `::`
            // is left alone (merging it would let a value-only suffix
            // bypass the key/value grammar boundary).
            if c == '%' {
                let followed_by_assign = chars.get(col + 1) == Some(&':') && chars.get(col + 2) == Some(&':');
                if !followed_by_assign {
                    if let Some(prev) = out.last() {
                        let prev_mergeable = matches!(prev.kind, TokenKind::Number | TokenKind::Identifier);
                        let prev_ends_alnum = prev.value.chars().next_back().map(|pc| pc.is_alphanumeric()).unwrap_or(false);
                        if prev_mergeable && prev_ends_alnum {
                            let mut suffix = String::from("%");
                            let mut consumed = 1usize;
                            while col + consumed < chars.len() {
                                let sc = chars[col + consumed];
                                if !identifier::is_identifier_body(sc) {
                                    break;
                                }
                                suffix.push(sc);
                                consumed += 1;
                            }
                            while suffix.len() > 1 && suffix.ends_with('-') {
                                suffix.pop();
                                consumed -= 1;
                            }
                            let merged_value = format!("{}{}", prev.value, suffix);
                            out.last_mut().unwrap().value = merged_value;
                            col += consumed;
                            continue;
                        }
                    }
                }
            }

            return Err(LexerError::new(format!("unexpected character '{c}'"), line_no, col + 1, "E005"));
        }
        Ok(())
    }
}
