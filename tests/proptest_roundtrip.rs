//! Round-trip and idempotence properties (spec §8).

use proptest::prelude::*;

use octave_core::ast::{Assignment, Document, Node, Section, Value};
use octave_core::emitter::{emit, FormatOptions};
use octave_core::parser::parse;

fn single_assignment_doc(value: Value) -> Document {
    let mut doc = Document::new("DOC");
    let mut section = Section { section_id: "1".to_string(), key: "CONTEXT".to_string(), annotation: None, children: Vec::new(), leading_comments: Vec::new() };
    section.children.push(Node::Assignment(Assignment { key: "RATE".to_string(), value, leading_comments: Vec::new(), trailing_comment: None }));
    doc.sections.push(section);
    doc
}

proptest! {
    /// Any integer literal written into an OCTAVE document survives a
    /// parse -> emit round trip with the exact same digits it was written
    /// with (I1): no reformatting into a different, semantically-equal
    /// spelling.
    #[test]
    fn integer_literal_round_trips_verbatim(n in any::<i64>()) {
        let text = format!("===DOC===\n\u{00a7}1::A\n  RATE:: {n}\n===END===\n");
        let doc = parse(&text, false).unwrap();
        let rendered = emit(&doc, &FormatOptions::default());
        prop_assert!(rendered.contains(&format!("RATE::{n}")), "expected '{n}' preserved verbatim, got: {rendered}");
    }

    /// A bare ASCII word (letters/digits/underscore only, not a reserved
    /// word, never starting with a digit) never gets wrapped in quotes on
    /// emission, since it needs no escaping to round-trip.
    #[test]
    fn bare_ascii_word_is_never_quoted(word in "[a-zA-Z_][a-zA-Z0-9_]{0,15}") {
        prop_assume!(!matches!(word.as_str(), "true" | "false" | "null" | "vs"));
        let doc = single_assignment_doc(Value::string(word.clone()));
        let rendered = emit(&doc, &FormatOptions::default());
        prop_assert!(rendered.contains(&format!("RATE::{word}")), "expected unquoted '{word}', got: {rendered}");
    }

    /// A string value containing a space always round-trips through a
    /// quoted spelling (it would otherwise be ambiguous with multi-word
    /// coalescing on re-parse).
    #[test]
    fn value_with_space_always_round_trips_through_quotes(
        first in "[a-zA-Z]{1,8}",
        second in "[a-zA-Z]{1,8}",
    ) {
        let value = format!("{first} {second}");
        let doc = single_assignment_doc(Value::string(value.clone()));
        let rendered = emit(&doc, &FormatOptions::default());
        let reparsed = parse(&rendered, false).unwrap();
        let Node::Assignment(a) = &reparsed.sections[0].children[0] else { panic!("expected assignment") };
        prop_assert_eq!(&a.value, &Value::string(value));
    }

    /// `emit` is idempotent on its own output for any generated single-value
    /// document: re-parsing and re-emitting never changes the text further.
    #[test]
    fn emit_parse_emit_is_idempotent_for_generated_values(word in "[a-zA-Z][a-zA-Z0-9_]{0,12}") {
        prop_assume!(!matches!(word.as_str(), "true" | "false" | "null" | "vs"));
        let options = FormatOptions::default();
        let first_pass = emit(&single_assignment_doc(Value::string(word)), &options);
        let reparsed = parse(&first_pass, false).unwrap();
        let second_pass = emit(&reparsed, &options);
        prop_assert_eq!(first_pass, second_pass);
    }
}
