//! Token kinds and the `Token` struct produced by the lexer.
//!
//! Pipeline position: `text` -> **`[Token]`** -> `parser` -> `AST`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    EnvelopeStart,
    EnvelopeEnd,
    Separator,
    GrammarSentinel,
    Version,
    Assign,
    Block,
    ListStart,
    ListEnd,
    Comma,
    String,
    Number,
    Boolean,
    Null,
    Identifier,
    Variable,
    Section,
    Comment,
    Newline,
    Indent,
    FenceOpen,
    FenceClose,
    LiteralContent,
    Eof,

    // expression operators
    Flow,
    Synthesis,
    Concat,
    At,
    Tension,
    Constraint,
    Alternative,
}

impl TokenKind {
    /// Operators carry meaning purely through their kind; this is used by the
    /// parser's expression-mode switch (spec §4.2).
    pub fn is_expression_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Flow
                | TokenKind::Synthesis
                | TokenKind::Concat
                | TokenKind::At
                | TokenKind::Tension
                | TokenKind::Constraint
                | TokenKind::Alternative
        )
    }

    /// Tokens that can start or continue a coalescible multi-word value.
    pub fn is_value_atom(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::String
                | TokenKind::Number
                | TokenKind::Boolean
                | TokenKind::Null
                | TokenKind::Version
                | TokenKind::Variable
        )
    }
}

/// A single lexed token. `column` and `line` are 1-based per spec §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub line: usize,
    pub column: usize,
    /// Original lexeme before an ASCII-alias or fence-case normalization, if any.
    pub normalized_from: Option<String>,
    /// Verbatim source text for this token; load-bearing for NUMBER, where
    /// `1e10` must never be re-rendered as `10000000000.0`.
    pub raw_lexeme: Option<String>,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, line: usize, column: usize) -> Self {
        Self { kind, value: value.into(), line, column, normalized_from: None, raw_lexeme: None }
    }

    pub fn with_normalization(mut self, original: impl Into<String>) -> Self {
        self.normalized_from = Some(original.into());
        self
    }

    pub fn with_raw_lexeme(mut self, raw: impl Into<String>) -> Self {
        self.raw_lexeme = Some(raw.into());
        self
    }
}

/// One entry in the lexer's audit trail (spec I4: every lossy/normalizing
/// change must be logged).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repair {
    pub kind: RepairKind,
    pub original: String,
    pub normalized: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairKind {
    AsciiAlias,
    TripleQuoteString,
    CurlyBraceAnnotation,
}

/// Non-fatal diagnostic recorded during a lenient lex or parse pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub code: &'static str,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl Warning {
    pub fn new(code: &'static str, message: impl Into<String>, line: usize, column: usize) -> Self {
        Self { code, message: message.into(), line, column }
    }
}
