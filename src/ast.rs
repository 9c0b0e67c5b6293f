//! AST node types produced by the parser.
//!
//! The dynamic `value: Any` fields of the source implementation become the
//! tagged sum type [`Value`]; downstream code dispatches on the variant
//! instead of duck-typing (spec §9 Design Notes).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::token::Token;

/// A fully parsed OCTAVE document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub meta: Vec<(String, Value)>,
    pub sections: Vec<Section>,
    pub grammar_version: Option<String>,
    /// Byte-preserved `---\n...\n---` block, if the source had one (I4).
    pub raw_frontmatter: Option<String>,
    pub trailing_comments: Vec<Comment>,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meta: Vec::new(),
            sections: Vec::new(),
            grammar_version: None,
            raw_frontmatter: None,
            trailing_comments: Vec::new(),
        }
    }

    pub fn meta_get(&self, key: &str) -> Option<&Value> {
        self.meta.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub section_id: String,
    pub key: String,
    pub annotation: Option<String>,
    pub children: Vec<Node>,
    pub leading_comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub key: String,
    /// Routing target parsed out of a `[→TARGET]` annotation.
    pub inheritance_target: Option<String>,
    /// Verbatim text of a non-arrow bracket annotation, preserved for I1.
    pub raw_annotation: Option<String>,
    pub children: Vec<Node>,
    pub leading_comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub key: String,
    pub value: Value,
    pub leading_comments: Vec<Comment>,
    pub trailing_comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

/// Any structural child of a Document, Section, or Block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type")]
pub enum Node {
    Section(Section),
    Block(Block),
    Assignment(Assignment),
    Comment(Comment),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListValue {
    pub items: Vec<Value>,
    /// Index range into the token buffer this list was parsed from, kept so
    /// the parser can retry interpretation as a holographic pattern.
    #[serde(skip)]
    pub token_slice: Option<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineMap {
    pub pairs: Vec<(String, Value)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolographicValue {
    pub example: Box<Value>,
    pub constraint_chain: String,
    pub target: Option<String>,
    /// Original syntax, byte-for-byte, so I1 round-trips exactly.
    pub raw_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralZoneValue {
    pub content: String,
    pub fence_marker: String,
    pub info_tag: Option<String>,
}

/// Scalar or structured value. `Absent` is distinct from `Null` (I2).
///
/// `Integer`/`Float` carry an optional verbatim source lexeme alongside the
/// numeric value: the parser preserves `1e10`'s original text so emission
/// never re-renders it as `10000000000.0` (spec §3 "Number `raw_lexeme` is
/// preserved through parse→emit"). The lexeme does not participate in
/// equality — two numbers with the same value are equal regardless of how
/// they were spelled or constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "value_type", content = "value")]
pub enum Value {
    String(String),
    Integer(i64, Option<String>),
    Float(f64, Option<String>),
    Boolean(bool),
    Null,
    List(ListValue),
    InlineMap(InlineMap),
    Holographic(HolographicValue),
    LiteralZone(LiteralZoneValue),
    /// A `$VAR` reference.
    Variable(String),
    /// A `§TARGET` section reference.
    SectionRef(String),
    Absent,
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn integer(i: i64) -> Self {
        Value::Integer(i, None)
    }

    pub fn float(f: f64) -> Self {
        Value::Float(f, None)
    }

    /// Build a numeric value from a parsed token's verbatim lexeme,
    /// preserving it for round-trip emission (I1).
    pub fn number_from_lexeme(raw: &str) -> Self {
        if raw.contains('.') || raw.contains('e') || raw.contains('E') {
            Value::Float(raw.parse().unwrap_or(0.0), Some(raw.to_string()))
        } else {
            match raw.parse::<i64>() {
                Ok(i) => Value::Integer(i, Some(raw.to_string())),
                Err(_) => Value::Float(raw.parse().unwrap_or(0.0), Some(raw.to_string())),
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (String(a), String(b)) => a == b,
            (Integer(a, _), Integer(b, _)) => a == b,
            (Float(a, _), Float(b, _)) => a == b,
            (Boolean(a), Boolean(b)) => a == b,
            (Null, Null) => true,
            (List(a), List(b)) => a == b,
            (InlineMap(a), InlineMap(b)) => a == b,
            (Holographic(a), Holographic(b)) => a == b,
            (LiteralZone(a), LiteralZone(b)) => a == b,
            (Variable(a), Variable(b)) => a == b,
            (SectionRef(a), SectionRef(b)) => a == b,
            (Absent, Absent) => true,
            _ => false,
        }
    }
}

/// Extracted schema definition (spec §4.5), keyed by field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub name: String,
    pub version: String,
    pub policy: PolicyDefinition,
    pub fields: BTreeMap<String, FieldDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub example: Value,
    pub constraint_chain: String,
    pub target: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownFieldsPolicy {
    Reject,
    Warn,
    Ignore,
}

impl Default for UnknownFieldsPolicy {
    fn default() -> Self {
        UnknownFieldsPolicy::Reject
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDefinition {
    pub version: String,
    pub unknown_fields: UnknownFieldsPolicy,
    pub targets: Vec<String>,
}

impl Default for PolicyDefinition {
    fn default() -> Self {
        Self { version: "1.0".to_string(), unknown_fields: UnknownFieldsPolicy::default(), targets: Vec::new() }
    }
}

/// Token-witnessed raw slice, referenced by index range rather than owned
/// tokens so the buffer can outlive a single reconstruction attempt.
pub fn slice_tokens<'a>(tokens: &'a [Token], slice: (usize, usize)) -> &'a [Token] {
    &tokens[slice.0..slice.1]
}
