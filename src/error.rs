//! Error types for the OCTAVE pipeline.
//!
//! Each phase gets its own error enum with a stable `error_code` string
//! (spec §6/§7) rather than a shared `anyhow`-style error — callers that
//! need to branch on a specific failure match on `error_code()`, and
//! `Display` carries the human-readable message.

use std::fmt;

/// Error raised by [`crate::lexer::tokenize`].
#[derive(Debug, Clone, PartialEq)]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub error_code: &'static str,
}

impl LexerError {
    pub fn new(message: impl Into<String>, line: usize, column: usize, error_code: &'static str) -> Self {
        Self { message: message.into(), line, column, error_code }
    }
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}, column {}: {}", self.error_code, self.line, self.column, self.message)
    }
}

impl std::error::Error for LexerError {}

/// Error raised by [`crate::parser::parse`] in strict mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub error_code: &'static str,
}

impl ParserError {
    pub fn new(message: impl Into<String>, line: usize, column: usize, error_code: &'static str) -> Self {
        Self { message: message.into(), line, column, error_code }
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}, column {}: {}", self.error_code, self.line, self.column, self.message)
    }
}

impl std::error::Error for ParserError {}

impl From<LexerError> for ParserError {
    fn from(e: LexerError) -> Self {
        ParserError::new(e.message, e.line, e.column, "E_TOKENIZE")
    }
}

/// Error raised while compiling or constructing a [`crate::schema::SchemaDefinition`].
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    pub message: String,
    pub error_code: &'static str,
}

impl SchemaError {
    pub fn new(message: impl Into<String>, error_code: &'static str) -> Self {
        Self { message: message.into(), error_code }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_code, self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Error raised by [`crate::hydrator::hydrate`] and related vocabulary operations.
#[derive(Debug, Clone, PartialEq)]
pub enum VocabularyError {
    UnknownNamespace { namespace: String },
    NotCapsule { found_type: Option<String> },
    Collision { term: String, local_def: String, imported_def: String, all_collisions: Vec<String> },
    VersionMismatch { namespace: String, requested: String, registry: Option<String> },
    Cycle { path: Vec<String> },
    PathSecurity { reason: &'static str },
    InvalidPruneStrategy { given: String },
    Io { path: String, message: String },
}

impl fmt::Display for VocabularyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VocabularyError::UnknownNamespace { namespace } => {
                write!(f, "Unknown vocabulary namespace: {namespace}")
            }
            VocabularyError::NotCapsule { found_type } => match found_type {
                Some(t) => write!(f, "Vocabulary file is not a CAPSULE: META.TYPE is '{t}'"),
                None => write!(f, "Vocabulary file is not a CAPSULE: missing META.TYPE"),
            },
            VocabularyError::Collision { term, local_def, imported_def, all_collisions } => {
                if all_collisions.len() > 1 {
                    let all_terms: Vec<String> = all_collisions.iter().map(|t| format!("'{t}'")).collect();
                    write!(
                        f,
                        "Term collision detected: {} terms conflict. Colliding terms: {}. First collision '{}': Local: {:?}, Imported: {:?}",
                        all_collisions.len(),
                        all_terms.join(", "),
                        term,
                        local_def,
                        imported_def
                    )
                } else {
                    write!(
                        f,
                        "Term collision detected: '{term}' is defined both locally and in imported vocabulary. Local: {local_def:?}, Imported: {imported_def:?}"
                    )
                }
            }
            VocabularyError::VersionMismatch { namespace, requested, registry } => match registry {
                Some(v) => write!(
                    f,
                    "Version mismatch for '{namespace}': requested version '{requested}' but registry has version '{v}'"
                ),
                None => write!(
                    f,
                    "Version mismatch for '{namespace}': requested version '{requested}' but registry has no version information"
                ),
            },
            VocabularyError::Cycle { path } => {
                write!(f, "Cycle detected while resolving vocabulary imports: {}", path.join(" -> "))
            }
            VocabularyError::PathSecurity { reason } => write!(f, "E_PATH: {reason}"),
            VocabularyError::InvalidPruneStrategy { given } => write!(
                f,
                "Invalid prune strategy '{given}'. Valid options: list, hash, count, elide"
            ),
            VocabularyError::Io { path, message } => write!(f, "E_READ: failed to read '{path}': {message}"),
        }
    }
}

impl std::error::Error for VocabularyError {}
