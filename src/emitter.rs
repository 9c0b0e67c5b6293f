//! Canonical deterministic emitter (spec §4.3).
//!
//! `emit(document, options)` always produces a trailing newline and never
//! invents content it didn't receive (I3): tri-state absence filtering,
//! comment preservation, and idempotence (`emit(parse(emit(parse(t)))) ==
//! emit(parse(t))`) all live here.

use std::sync::OnceLock;

use regex::Regex;
use tracing::instrument;

use crate::ast::{Document, InlineMap, ListValue, Node, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingWhitespace {
    Strip,
    Preserve,
}

#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub indent_normalize: bool,
    pub blank_line_normalize: bool,
    pub trailing_whitespace: TrailingWhitespace,
    pub key_sorting: bool,
    pub strip_comments: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_normalize: true,
            blank_line_normalize: false,
            trailing_whitespace: TrailingWhitespace::Strip,
            key_sorting: false,
            strip_comments: false,
        }
    }
}

fn identifier_pattern() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r"^[\p{L}_./][\p{L}\p{N}_./-]*$").unwrap())
}

const ALWAYS_QUOTE_KEYS: &[&str] = &["PATTERN", "REGEX"];
const RESERVED_WORDS: &[&str] = &["true", "false", "null", "vs"];

pub fn is_absent(value: &Value) -> bool {
    value.is_absent()
}

fn needs_quotes(s: &str) -> bool {
    if RESERVED_WORDS.contains(&s) {
        return true;
    }
    if s.contains('\n') || s.contains('\t') || s.contains('\r') {
        return true;
    }
    !identifier_pattern().is_match(s)
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n").replace('\t', "\\t").replace('\r', "\\r")
}

#[instrument(skip(document, options))]
pub fn emit(document: &Document, options: &FormatOptions) -> String {
    let mut out = String::new();

    if let Some(frontmatter) = &document.raw_frontmatter {
        out.push_str(frontmatter);
        if !frontmatter.ends_with('\n') {
            out.push('\n');
        }
    }

    if let Some(version) = &document.grammar_version {
        out.push_str(&format!("OCTAVE::{version}\n"));
    }

    out.push_str(&format!("==={}===\n", document.name));

    let meta_pairs: Vec<&(String, Value)> = document.meta.iter().filter(|(_, v)| !is_absent(v)).collect();
    if !meta_pairs.is_empty() {
        out.push_str("META:\n");
        for (key, value) in &meta_pairs {
            emit_assignment_line(&mut out, 1, key, value, options);
        }
    }

    out.push_str("---\n");

    for section in &document.sections {
        emit_leading_comments(&mut out, 0, &section.leading_comments, options);
        let annotation = section.annotation.as_deref().map(|a| format!("[{a}]")).unwrap_or_default();
        out.push_str(&format!("§{}::{}{}\n", section.section_id, section.key, annotation));
        emit_children(&mut out, 1, &section.children, options);
    }

    if !options.strip_comments {
        for comment in &document.trailing_comments {
            out.push_str(&format!("// {}\n", comment.text));
        }
    }

    out.push_str("===END===\n");

    if options.blank_line_normalize {
        out = normalize_blank_lines(&out);
    }
    if options.trailing_whitespace == TrailingWhitespace::Strip {
        out = strip_trailing_whitespace(&out);
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn indent(level: usize) -> String {
    "  ".repeat(level)
}

fn emit_leading_comments(out: &mut String, level: usize, comments: &[crate::ast::Comment], options: &FormatOptions) {
    if options.strip_comments {
        return;
    }
    for c in comments {
        out.push_str(&format!("{}// {}\n", indent(level), c.text));
    }
}

fn emit_children(out: &mut String, level: usize, children: &[Node], options: &FormatOptions) {
    let ordered = sort_children(children, options.key_sorting);
    for child in ordered {
        match child {
            Node::Section(s) => {
                emit_leading_comments(out, level, &s.leading_comments, options);
                let annotation = s.annotation.as_deref().map(|a| format!("[{a}]")).unwrap_or_default();
                out.push_str(&format!("{}§{}::{}{}\n", indent(level), s.section_id, s.key, annotation));
                emit_children(out, level + 1, &s.children, options);
            }
            Node::Block(b) => {
                emit_leading_comments(out, level, &b.leading_comments, options);
                let annotation = if let Some(target) = &b.inheritance_target {
                    format!("[→{target}]")
                } else if let Some(raw) = &b.raw_annotation {
                    format!("[{raw}]")
                } else {
                    String::new()
                };
                out.push_str(&format!("{}{}{}:\n", indent(level), b.key, annotation));
                emit_children(out, level + 1, &b.children, options);
            }
            Node::Assignment(a) => {
                if is_absent(&a.value) {
                    continue;
                }
                emit_leading_comments(out, level, &a.leading_comments, options);
                emit_assignment_line(out, level, &a.key, &a.value, options);
                if let Some(trailing) = &a.trailing_comment {
                    if !options.strip_comments {
                        let line_len = out.len();
                        out.truncate(line_len - 1);
                        out.push_str(&format!(" // {trailing}\n"));
                    }
                }
            }
            Node::Comment(c) => {
                if !options.strip_comments {
                    out.push_str(&format!("{}// {}\n", indent(level), c.text));
                }
            }
        }
    }
}

fn sort_children<'a>(children: &'a [Node], key_sorting: bool) -> Vec<&'a Node> {
    if !key_sorting {
        return children.iter().collect();
    }
    let mut assignments: Vec<&Node> = children.iter().filter(|c| matches!(c, Node::Assignment(_))).collect();
    assignments.sort_by_key(|c| match c {
        Node::Assignment(a) => a.key.clone(),
        _ => unreachable!(),
    });
    let rest: Vec<&Node> = children.iter().filter(|c| !matches!(c, Node::Assignment(_))).collect();
    let mut out = assignments;
    out.extend(rest);
    out
}

fn emit_assignment_line(out: &mut String, level: usize, key: &str, value: &Value, options: &FormatOptions) {
    if let Value::LiteralZone(lz) = value {
        out.push_str(&format!("{}{}::\n", indent(level), key));
        let fence_indent = indent(level + 1);
        let info = lz.info_tag.clone().unwrap_or_default();
        out.push_str(&format!("{}{}{}\n", fence_indent, lz.fence_marker, info));
        for line in lz.content.lines() {
            out.push_str(&format!("{fence_indent}{line}\n"));
        }
        out.push_str(&format!("{fence_indent}{}\n", lz.fence_marker));
        return;
    }

    let key_str = if ALWAYS_QUOTE_KEYS.contains(&key) { format!("\"{key}\"") } else { key.to_string() };
    out.push_str(&format!("{}{}::{}\n", indent(level), key_str, emit_value(value, level, options)));
}

pub fn emit_value(value: &Value, level: usize, options: &FormatOptions) -> String {
    match value {
        Value::String(s) => {
            if needs_quotes(s) {
                format!("\"{}\"", escape_string(s))
            } else {
                s.clone()
            }
        }
        Value::Integer(i, raw) => raw.clone().unwrap_or_else(|| i.to_string()),
        Value::Float(f, raw) => raw.clone().unwrap_or_else(|| {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{f:.1}")
            } else {
                f.to_string()
            }
        }),
        Value::Boolean(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Variable(v) => format!("${v}"),
        Value::SectionRef(s) => format!("§{s}"),
        Value::Holographic(h) => h.raw_pattern.clone(),
        Value::LiteralZone(_) => String::new(), // handled by emit_assignment_line
        Value::List(list) => emit_list(list, level, options),
        Value::InlineMap(map) => emit_inline_map(map, options),
        Value::Absent => String::new(),
    }
}

fn emit_list(list: &ListValue, level: usize, options: &FormatOptions) -> String {
    let items: Vec<&Value> = list.items.iter().filter(|v| !is_absent(v)).collect();
    if needs_multiline(&items) {
        let inner_indent = indent(level + 1);
        let mut out = String::from("[\n");
        for item in &items {
            out.push_str(&format!("{}{},\n", inner_indent, emit_value(item, level + 1, options)));
        }
        out.push_str(&format!("{}]", indent(level)));
        out
    } else {
        let rendered: Vec<String> = items.iter().map(|v| emit_value(v, level, options)).collect();
        format!("[{}]", rendered.join(", "))
    }
}

fn needs_multiline(items: &[&Value]) -> bool {
    if items.len() >= 3 && items.iter().all(|v| matches!(v, Value::String(_) | Value::Integer(_, _) | Value::Float(_, _) | Value::Boolean(_))) {
        return true;
    }
    items.iter().any(|v| matches!(v, Value::InlineMap(m) if !m.pairs.iter().all(|(_, v)| is_absent(v))) || matches!(v, Value::List(_)) || matches!(v, Value::Holographic(_)))
}

fn emit_inline_map(map: &InlineMap, options: &FormatOptions) -> String {
    let pairs: Vec<String> = map
        .pairs
        .iter()
        .filter(|(_, v)| !is_absent(v))
        .map(|(k, v)| format!("{}::{}", k, emit_value(v, 0, options)))
        .collect();
    format!("[{}]", pairs.join(", "))
}

fn strip_trailing_whitespace(text: &str) -> String {
    text.lines().map(|l| l.trim_end()).collect::<Vec<_>>().join("\n") + if text.ends_with('\n') { "\n" } else { "" }
}

fn normalize_blank_lines(text: &str) -> String {
    let mut out = Vec::new();
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run <= 1 {
                out.push(line.to_string());
            }
        } else {
            blank_run = 0;
            out.push(line.to_string());
        }
    }
    out.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Assignment;

    #[test]
    fn absent_assignment_is_skipped() {
        let mut doc = Document::new("T");
        doc.sections.push(crate::ast::Section {
            section_id: "1".to_string(),
            key: "S".to_string(),
            annotation: None,
            children: vec![
                Node::Assignment(Assignment { key: "K1".to_string(), value: Value::string("value"), leading_comments: Vec::new(), trailing_comment: None }),
                Node::Assignment(Assignment { key: "K2".to_string(), value: Value::Null, leading_comments: Vec::new(), trailing_comment: None }),
                Node::Assignment(Assignment { key: "K3".to_string(), value: Value::Absent, leading_comments: Vec::new(), trailing_comment: None }),
            ],
            leading_comments: Vec::new(),
        });
        let text = emit(&doc, &FormatOptions::default());
        assert!(text.contains("K1::value"));
        assert!(text.contains("K2::null"));
        assert!(!text.contains("K3"));
    }

    #[test]
    fn holographic_value_round_trips_raw_pattern() {
        let value = Value::Holographic(crate::ast::HolographicValue {
            example: Box::new(Value::string("abc123")),
            constraint_chain: "REQ∧ENUM[X,Y]".to_string(),
            target: Some("INDEXER".to_string()),
            raw_pattern: "[\"abc123\"∧REQ∧ENUM[X,Y]→§INDEXER]".to_string(),
        });
        assert_eq!(emit_value(&value, 0, &FormatOptions::default()), "[\"abc123\"∧REQ∧ENUM[X,Y]→§INDEXER]");
    }

    #[test]
    fn trailing_newline_is_always_present() {
        let doc = Document::new("T");
        let text = emit(&doc, &FormatOptions::default());
        assert!(text.ends_with('\n'));
    }
}
