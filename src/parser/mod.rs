//! Phase 2: Parser — lenient-by-default recursive descent over the token
//! stream produced by [`crate::lexer`] (spec §4.2).
//!
//! Indentation discipline is derived from token column rather than a
//! dedicated INDENT token stream: tokens are grouped into logical lines
//! (delimited by NEWLINE), and a logical line belongs to the current block
//! only while its first token's column exceeds the block's own column.

pub mod value;

use tracing::instrument;

use crate::ast::{Assignment, Block, Comment, Document, Node, Section};
use crate::error::ParserError;
use crate::token::{Token, TokenKind, Warning};

pub const MAX_NESTING_DEPTH: usize = 100;
pub const DEFAULT_DEEP_NESTING_WARN_THRESHOLD: usize = 5;

pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    strict: bool,
    pub warnings: Vec<Warning>,
    bracket_depth: usize,
    warned_deep_nesting_lines: std::collections::HashSet<usize>,
}

/// One logical-line's worth of tokens: a NEWLINE-delimited run, except that a
/// NEWLINE occurring while a `[...]` is still open (bracket depth > 0) is
/// swallowed and accumulation continues onto the next physical line. This is
/// what lets a value position list/inline-map/holographic pattern span
/// several physical lines (the shape the emitter itself produces for
/// "Multi-line arrays", spec §4.3) and still round-trip through re-parsing.
struct LogicalLine {
    tokens: Vec<Token>,
    column: usize,
    line: usize,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token], strict: bool) -> Self {
        Self { tokens, pos: 0, strict, warnings: Vec::new(), bracket_depth: 0, warned_deep_nesting_lines: std::collections::HashSet::new() }
    }

    fn logical_lines(&self) -> Vec<LogicalLine> {
        let mut lines = Vec::new();
        let mut current: Vec<Token> = Vec::new();
        let mut depth: i32 = 0;

        for tok in self.tokens.iter() {
            match tok.kind {
                TokenKind::ListStart => {
                    depth += 1;
                    current.push(tok.clone());
                }
                TokenKind::ListEnd => {
                    depth -= 1;
                    current.push(tok.clone());
                }
                TokenKind::Newline | TokenKind::Eof => {
                    if depth > 0 {
                        // Inside an open bracket: this newline is layout, not
                        // a logical-line boundary.
                        continue;
                    }
                    if !current.is_empty() {
                        let column = current[0].column;
                        let line = current[0].line;
                        lines.push(LogicalLine { tokens: std::mem::take(&mut current), column, line });
                    }
                }
                _ => current.push(tok.clone()),
            }
        }
        if !current.is_empty() {
            let column = current[0].column;
            let line = current[0].line;
            lines.push(LogicalLine { tokens: current, column, line });
        }
        lines
    }

    fn strip_yaml_frontmatter(text: &str) -> (Option<String>, String) {
        if !text.starts_with("---\n") && !text.starts_with("---\r\n") {
            return (None, text.to_string());
        }
        let after_first = &text[text.find('\n').map(|i| i + 1).unwrap_or(0)..];
        if let Some(end_rel) = after_first.find("\n---") {
            let frontmatter_body = &after_first[..end_rel];
            let close_len = "\n---".len();
            let after_close = &after_first[end_rel + close_len..];
            let after_close = after_close.strip_prefix('\n').unwrap_or(after_close);
            let raw = format!("---\n{frontmatter_body}\n---");
            let line_count = raw.lines().count();
            let replacement = "\n".repeat(line_count);
            return (Some(raw), format!("{replacement}{after_close}"));
        }
        (None, text.to_string())
    }
}

/// Parses `text` and raises on the first structural error (strict mode) or
/// accumulates recoverable issues silently (lenient parse, no warnings
/// returned — use [`parse_with_warnings`] to see them).
pub fn parse(text: &str, strict: bool) -> Result<Document, ParserError> {
    parse_with_warnings(text, strict).map(|(doc, _)| doc)
}

#[instrument(skip(text))]
pub fn parse_with_warnings(text: &str, strict: bool) -> Result<(Document, Vec<Warning>), ParserError> {
    let (raw_frontmatter, body_text) = Parser::strip_yaml_frontmatter(text);
    let lex = crate::lexer::tokenize(&body_text, !strict)?;
    let mut parser = Parser::new(&lex.tokens, strict);
    parser.warnings.extend(lex.warnings);
    let mut document = parser.parse_document()?;
    document.raw_frontmatter = raw_frontmatter;
    Ok((document, parser.warnings))
}

impl<'t> Parser<'t> {
    fn parse_document(&mut self) -> Result<Document, ParserError> {
        let lines = self.logical_lines();
        let mut idx = 0usize;

        let mut name = "INFERRED".to_string();
        let mut grammar_version = None;

        if idx < lines.len() && lines[idx].tokens.first().map(|t| t.kind) == Some(TokenKind::GrammarSentinel) {
            grammar_version = lines[idx].tokens.get(2).map(|t| t.value.clone());
            idx += 1;
        }
        if idx < lines.len() && lines[idx].tokens.first().map(|t| t.kind) == Some(TokenKind::EnvelopeStart) {
            let raw = &lines[idx].tokens[0].value;
            name = raw.trim_start_matches("===").trim_end_matches("===").to_string();
            idx += 1;
        }

        let mut meta = Vec::new();
        if idx < lines.len() && lines[idx].tokens.first().map(|t| t.value.as_str()) == Some("META") {
            idx += 1;
            let meta_col = lines.get(idx).map(|l| l.column).unwrap_or(usize::MAX);
            let mut seen: std::collections::HashMap<String, Vec<usize>> = std::collections::HashMap::new();
            while idx < lines.len() && lines[idx].column >= meta_col && !is_section_or_envelope(&lines[idx]) {
                if let Some((key, value, line)) = self.parse_assignment_line(&lines[idx].tokens, lines[idx].line)? {
                    seen.entry(key.clone()).or_default().push(line);
                    if let Some(pos) = meta.iter().position(|(k, _): &(String, crate::ast::Value)| k == &key) {
                        meta[pos] = (key, value);
                    } else {
                        meta.push((key, value));
                    }
                }
                idx += 1;
            }
            for (key, occurrences) in seen {
                if occurrences.len() > 1 {
                    self.warnings.push(Warning::new(
                        "W_DUPLICATE_KEY",
                        format!("duplicate META key '{key}' at lines {occurrences:?}"),
                        occurrences[0],
                        1,
                    ));
                }
            }
        }

        if idx < lines.len() && lines[idx].tokens.first().map(|t| t.kind) == Some(TokenKind::Separator) {
            idx += 1;
        }

        let mut sections = Vec::new();
        let mut trailing_comments = Vec::new();
        while idx < lines.len() {
            if lines[idx].tokens.first().map(|t| t.kind) == Some(TokenKind::EnvelopeEnd) {
                idx += 1;
                break;
            }
            if lines[idx].tokens.first().map(|t| t.kind) == Some(TokenKind::Section) {
                let (section, next_idx) = self.parse_section(&lines, idx, 0)?;
                sections.push(section);
                idx = next_idx;
                continue;
            }
            if lines[idx].tokens.len() == 1 && lines[idx].tokens[0].kind == TokenKind::Comment {
                trailing_comments.push(Comment { text: lines[idx].tokens[0].value.clone() });
                idx += 1;
                continue;
            }
            idx += 1;
        }

        Ok(Document {
            name,
            meta,
            sections,
            grammar_version,
            raw_frontmatter: None,
            trailing_comments,
        })
    }

    fn parse_section(&mut self, lines: &[LogicalLine], start: usize, depth: usize) -> Result<(Section, usize), ParserError> {
        let mut leading_comments = Vec::new();
        let mut idx = start;
        while idx > 0 && lines[idx - 1].tokens.len() == 1 && lines[idx - 1].tokens[0].kind == TokenKind::Comment {
            idx -= 1;
        }
        while idx < start {
            leading_comments.push(Comment { text: lines[idx].tokens[0].value.clone() });
            idx += 1;
        }

        let header = &lines[start].tokens;
        let section_col = lines[start].column;
        let section_id = header.get(0).map(|_| extract_section_id(header)).unwrap_or_default();
        let (key, annotation) = extract_section_name_and_annotation(header, &section_id);

        let mut children_idx = start + 1;
        let mut children = Vec::new();
        let mut child_lines = Vec::new();
        while children_idx < lines.len() && lines[children_idx].column > section_col {
            let line = lines[children_idx].line;
            let (node, next) = self.parse_body_line(lines, children_idx, depth + 1)?;
            if let Some(node) = node {
                children.push(node);
                child_lines.push(line);
            }
            children_idx = next;
        }
        self.apply_duplicate_key_policy(&mut children, &child_lines);

        Ok((Section { section_id, key, annotation, children, leading_comments }, children_idx))
    }

    fn parse_body_line(&mut self, lines: &[LogicalLine], idx: usize, depth: usize) -> Result<(Option<Node>, usize), ParserError> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(ParserError::new("maximum nesting depth exceeded", lines[idx].line, lines[idx].column, "E_MAX_NESTING_EXCEEDED"));
        }

        let tokens = &lines[idx].tokens;
        if tokens.len() == 1 && tokens[0].kind == TokenKind::Comment {
            return Ok((Some(Node::Comment(Comment { text: tokens[0].value.clone() })), idx + 1));
        }

        if tokens.first().map(|t| t.kind) == Some(TokenKind::Section) {
            let (section, next) = self.parse_section(lines, idx, depth)?;
            return Ok((Some(Node::Section(section)), next));
        }

        // block: IDENTIFIER [annotation] ':' NEWLINE INDENT body
        if tokens.len() >= 2 && tokens[0].kind == TokenKind::Identifier {
            let block_end_is_colon = tokens.iter().position(|t| t.kind == TokenKind::Block);
            let assign_pos = tokens.iter().position(|t| t.kind == TokenKind::Assign);
            if let Some(block_pos) = block_end_is_colon {
                if assign_pos.is_none() || assign_pos.unwrap() > block_pos {
                    let key = tokens[0].value.clone();
                    let (inheritance_target, raw_annotation) = extract_block_annotation(&tokens[1..block_pos]);
                    let block_col = lines[idx].column;
                    let mut children = Vec::new();
                    let mut child_lines = Vec::new();
                    let mut child_idx = idx + 1;
                    while child_idx < lines.len() && lines[child_idx].column > block_col {
                        let line = lines[child_idx].line;
                        let (node, next) = self.parse_body_line(lines, child_idx, depth + 1)?;
                        if let Some(node) = node {
                            children.push(node);
                            child_lines.push(line);
                        }
                        child_idx = next;
                    }
                    self.apply_duplicate_key_policy(&mut children, &child_lines);
                    return Ok((
                        Some(Node::Block(Block { key, inheritance_target, raw_annotation, children, leading_comments: Vec::new() })),
                        child_idx,
                    ));
                }
            }
        }

        // assignment: IDENTIFIER '::' value
        if tokens.first().map(|t| t.kind) == Some(TokenKind::Identifier) && tokens.get(1).map(|t| t.kind) == Some(TokenKind::Assign) {
            let key = tokens[0].value.clone();

            if tokens.len() == 2 {
                // value is a fenced literal zone spanning subsequent lines
                if let Some((zone, next)) = self.try_parse_literal_zone_lines(lines, idx + 1) {
                    return Ok((Some(Node::Assignment(Assignment { key, value: zone, leading_comments: Vec::new(), trailing_comment: None })), next));
                }
            }

            let (value, trailing_comment) = value::parse_value_tokens(&tokens[2..], self, lines[idx].line)?;
            return Ok((Some(Node::Assignment(Assignment { key, value, leading_comments: Vec::new(), trailing_comment })), idx + 1));
        }

        if tokens.len() == 1 && tokens[0].kind == TokenKind::Identifier {
            self.warnings.push(Warning::new(
                "bare_line_dropped",
                format!("bare identifier '{}' dropped (no '::' or ':')", tokens[0].value),
                tokens[0].line,
                tokens[0].column,
            ));
            return Ok((None, idx + 1));
        }

        Ok((None, idx + 1))
    }

    fn parse_assignment_line(&mut self, tokens: &[Token], line: usize) -> Result<Option<(String, crate::ast::Value, usize)>, ParserError> {
        if tokens.first().map(|t| t.kind) == Some(TokenKind::Identifier) && tokens.get(1).map(|t| t.kind) == Some(TokenKind::Assign) {
            let key = tokens[0].value.clone();
            let (value, _) = value::parse_value_tokens(&tokens[2..], self, line)?;
            return Ok(Some((key, value, line)));
        }
        Ok(None)
    }

    fn try_parse_literal_zone_lines(&self, lines: &[LogicalLine], start_idx: usize) -> Option<(crate::ast::Value, usize)> {
        let open = lines.get(start_idx)?;
        let open_tok = open.tokens.first()?;
        if open_tok.kind != TokenKind::FenceOpen {
            return None;
        }
        let marker_and_tag = &open_tok.value;
        let fence_len = marker_and_tag.chars().take_while(|&c| c == '`').count();
        let fence_marker = "`".repeat(fence_len);
        let info_tag = marker_and_tag.trim_start_matches('`');
        let info_tag = if info_tag.is_empty() { None } else { Some(info_tag.to_string()) };

        let mut content_lines = Vec::new();
        let mut idx = start_idx + 1;
        while idx < lines.len() {
            let tok = lines[idx].tokens.first()?;
            match tok.kind {
                TokenKind::LiteralContent => {
                    content_lines.push(tok.value.clone());
                    idx += 1;
                }
                TokenKind::FenceClose => {
                    idx += 1;
                    break;
                }
                _ => break,
            }
        }

        Some((
            crate::ast::Value::LiteralZone(crate::ast::LiteralZoneValue { content: content_lines.join("\n"), fence_marker, info_tag }),
            idx,
        ))
    }

    pub fn note_bracket_depth_warning(&mut self, line: usize) {
        if self.bracket_depth >= DEFAULT_DEEP_NESTING_WARN_THRESHOLD && self.warned_deep_nesting_lines.insert(line) {
            self.warnings.push(Warning::new("W_DEEP_NESTING", format!("bracket nesting depth {} at line {line}", self.bracket_depth), line, 1));
        }
    }

    pub fn enter_bracket(&mut self) {
        self.bracket_depth += 1;
    }

    pub fn bracket_depth(&self) -> usize {
        self.bracket_depth
    }

    pub fn exit_bracket(&mut self) {
        self.bracket_depth = self.bracket_depth.saturating_sub(1);
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn push_warning(&mut self, w: Warning) {
        self.warnings.push(w);
    }

    /// Duplicate assignment keys among a block/section's direct children
    /// (spec §4.2 "META block", generalized to "any block/section"): warn
    /// once per key listing every line it appeared on, then keep only the
    /// last occurrence so emission stays idempotent.
    fn apply_duplicate_key_policy(&mut self, children: &mut Vec<Node>, child_lines: &[usize]) {
        let mut seen: std::collections::HashMap<String, Vec<usize>> = std::collections::HashMap::new();
        for (i, node) in children.iter().enumerate() {
            if let Node::Assignment(a) = node {
                seen.entry(a.key.clone()).or_default().push(child_lines[i]);
            }
        }
        let duplicated: Vec<String> = seen.iter().filter(|(_, lines)| lines.len() > 1).map(|(k, _)| k.clone()).collect();
        if duplicated.is_empty() {
            return;
        }
        for key in &duplicated {
            let lines = &seen[key];
            self.warnings.push(Warning::new("W_DUPLICATE_KEY", format!("duplicate key '{key}' at lines {lines:?}"), lines[0], 1));
        }

        let mut last_index_for_key: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for (i, node) in children.iter().enumerate() {
            if let Node::Assignment(a) = node {
                if duplicated.contains(&a.key) {
                    last_index_for_key.insert(a.key.clone(), i);
                }
            }
        }
        let mut idx = 0usize;
        children.retain(|node| {
            let keep = match node {
                Node::Assignment(a) if duplicated.contains(&a.key) => last_index_for_key.get(&a.key) == Some(&idx),
                _ => true,
            };
            idx += 1;
            keep
        });
    }
}

fn is_section_or_envelope(line: &LogicalLine) -> bool {
    matches!(line.tokens.first().map(|t| t.kind), Some(TokenKind::Section) | Some(TokenKind::EnvelopeEnd))
}

fn extract_section_id(tokens: &[Token]) -> String {
    // §<id>::<name> — id is numeric with an optional single-letter suffix
    // (`§2b`) or a bare identifier (`§CONTEXT`). The lexer tokenizes a
    // leading digit run as NUMBER and a trailing letter as a separate
    // IDENTIFIER, so the id is reassembled here from every token adjacent
    // (no gap) to the SECTION marker, stopping at the first gap or at `::`.
    let assign_pos = tokens.iter().position(|t| t.kind == TokenKind::Assign).unwrap_or(tokens.len());
    let mut id = String::new();
    let mut prev_end: Option<(usize, usize)> = None;
    for tok in &tokens[1..assign_pos.min(tokens.len())] {
        if let Some((line, col)) = prev_end {
            if tok.line != line || tok.column != col {
                break;
            }
        }
        id.push_str(&tok.value);
        prev_end = Some((tok.line, tok.column + tok.value.chars().count()));
    }
    id
}

fn extract_section_name_and_annotation(tokens: &[Token], section_id: &str) -> (String, Option<String>) {
    let assign_pos = tokens.iter().position(|t| t.kind == TokenKind::Assign);
    let Some(assign_pos) = assign_pos else {
        return (section_id.to_string(), None);
    };
    let name = tokens.get(assign_pos + 1).filter(|t| t.kind == TokenKind::Identifier).map(|t| t.value.clone());
    let name = name.unwrap_or_else(|| section_id.to_string());
    let annotation = extract_bracket_annotation(&tokens[assign_pos + 1..]);
    (name, annotation)
}

fn extract_bracket_annotation(tokens: &[Token]) -> Option<String> {
    let start = tokens.iter().position(|t| t.kind == TokenKind::ListStart)?;
    let end = tokens.iter().skip(start).position(|t| t.kind == TokenKind::ListEnd)? + start;
    let inner = &tokens[start + 1..end];
    Some(inner.iter().map(|t| t.value.clone()).collect::<Vec<_>>().join(""))
}

fn extract_block_annotation(tokens: &[Token]) -> (Option<String>, Option<String>) {
    let Some(start) = tokens.iter().position(|t| t.kind == TokenKind::ListStart) else {
        return (None, None);
    };
    let Some(end_rel) = tokens.iter().skip(start).position(|t| t.kind == TokenKind::ListEnd) else {
        return (None, None);
    };
    let end = end_rel + start;
    let inner = &tokens[start + 1..end];
    if inner.first().map(|t| t.kind) == Some(TokenKind::Flow) {
        let target = inner.get(1).map(|t| t.value.clone());
        (target, None)
    } else {
        let raw: String = inner
            .iter()
            .filter(|t| !matches!(t.kind, TokenKind::Comment | TokenKind::Newline | TokenKind::Indent))
            .map(|t| t.value.clone())
            .collect::<Vec<_>>()
            .join("");
        (None, Some(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_document_name_when_no_envelope() {
        let doc = parse("META:\n  TYPE::\"x\"\n---\n", true).unwrap();
        assert_eq!(doc.name, "INFERRED");
    }

    #[test]
    fn parses_simple_assignment_in_section() {
        let text = "===T===\n§1::CONTEXT\n  KEY::\"value\"\n===END===\n";
        let doc = parse(text, true).unwrap();
        assert_eq!(doc.name, "T");
        assert_eq!(doc.sections.len(), 1);
    }

    #[test]
    fn duplicate_meta_key_emits_warning_and_keeps_last_value() {
        let text = "===T===\nMETA:\n  K::\"first\"\n  K::\"second\"\n---\n§1::S\n===END===\n";
        let (doc, warnings) = parse_with_warnings(text, false).unwrap();
        assert!(warnings.iter().any(|w| w.code == "W_DUPLICATE_KEY"));
        assert_eq!(doc.meta_get("K"), Some(&crate::ast::Value::string("second")));
    }
}
