//! OCTAVE core — lexer, parser, emitter, schema, and hydrator for the
//! envelope-delimited, indentation-structured OCTAVE document format.
//!
//! Pipeline: `text` -> [`lexer`] -> `[Token]` -> [`parser`] -> [`ast::Document`]
//! -> [`emitter`] -> `text`, with [`schema`]/[`validator`] and [`hydrator`]
//! operating on the parsed AST.

pub mod ast;
pub mod constraint;
pub mod emitter;
pub mod error;
pub mod hydrator;
pub mod lexer;
pub mod parser;
pub mod schema;
pub mod token;
pub mod validator;

pub use ast::{Document, Node, Value};
pub use emitter::{emit, FormatOptions};
pub use error::{LexerError, ParserError, SchemaError, VocabularyError};
pub use hydrator::{hydrate, HydrationPolicy, VocabularyRegistry};
pub use lexer::tokenize;
pub use parser::{parse, parse_with_warnings};
pub use schema::extract_schema;
pub use validator::{validate, ValidationStatus};
