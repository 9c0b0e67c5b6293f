use octave_core::ast::{Assignment, Document, Node, Section, Value};
use octave_core::emitter::{emit, FormatOptions};
use octave_core::parser::parse;

#[test]
fn scientific_notation_raw_lexeme_survives_parse_and_emit() {
    let text = "===DOC===\n\u{00a7}1::A\n  RATE:: 1e10\n===END===\n";
    let doc = parse(text, false).unwrap();
    let Node::Assignment(a) = &doc.sections[0].children[0] else { panic!("expected assignment") };
    assert_eq!(a.value, Value::float(1e10));
    let rendered = emit(&doc, &FormatOptions::default());
    assert!(rendered.contains("RATE::1e10"), "expected raw lexeme preserved, got: {rendered}");
    assert!(!rendered.contains("10000000000"));
}

fn simple_document() -> Document {
    let mut doc = Document::new("SPEC");
    doc.meta.push(("TYPE".to_string(), Value::string("schema")));
    let mut section = Section { section_id: "1".to_string(), key: "CONTEXT".to_string(), annotation: None, children: Vec::new(), leading_comments: Vec::new() };
    section.children.push(Node::Assignment(Assignment { key: "NAME".to_string(), value: Value::string("hello world"), leading_comments: Vec::new(), trailing_comment: None }));
    section.children.push(Node::Assignment(Assignment { key: "UNSET".to_string(), value: Value::Absent, leading_comments: Vec::new(), trailing_comment: None }));
    section.children.push(Node::Assignment(Assignment { key: "EMPTY".to_string(), value: Value::Null, leading_comments: Vec::new(), trailing_comment: None }));
    doc.sections.push(section);
    doc
}

#[test]
fn absent_values_are_filtered_but_null_is_emitted_literally() {
    let text = emit(&simple_document(), &FormatOptions::default());
    assert!(!text.contains("UNSET"));
    assert!(text.contains("EMPTY::null"));
}

#[test]
fn emitted_document_always_has_envelope_and_trailing_newline() {
    let text = emit(&simple_document(), &FormatOptions::default());
    assert!(text.starts_with("===SPEC===\n"));
    assert!(text.trim_end_matches('\n').ends_with("===END==="));
    assert!(text.ends_with('\n'));
}

#[test]
fn emit_parse_emit_is_idempotent() {
    let options = FormatOptions::default();
    let first = emit(&simple_document(), &options);
    let reparsed = parse(&first, false).unwrap();
    let second = emit(&reparsed, &options);
    assert_eq!(first, second);
}

#[test]
fn multiline_emitted_list_re_parses_and_re_emits_identically() {
    let mut doc = Document::new("SPEC");
    let mut section = Section { section_id: "1".to_string(), key: "CONTEXT".to_string(), annotation: None, children: Vec::new(), leading_comments: Vec::new() };
    let items = vec![Value::string("alpha"), Value::string("beta"), Value::string("gamma"), Value::string("delta")];
    section.children.push(Node::Assignment(Assignment {
        key: "ITEMS".to_string(),
        value: Value::List(items),
        leading_comments: Vec::new(),
        trailing_comment: None,
    }));
    doc.sections.push(section);

    let options = FormatOptions::default();
    let first = emit(&doc, &options);
    assert!(first.matches("alpha").count() == 1 && first.contains('\n'), "expected a multi-line list, got: {first}");

    let reparsed = parse(&first, false).expect("re-parsing a multi-line emitted list must succeed");
    let Node::Assignment(a) = &reparsed.sections[0].children[0] else { panic!("expected assignment") };
    assert_eq!(a.value, Value::List(vec![Value::string("alpha"), Value::string("beta"), Value::string("gamma"), Value::string("delta")]));

    let second = emit(&reparsed, &options);
    assert_eq!(first, second);
}

#[test]
fn values_requiring_quotes_are_quoted_on_emission() {
    let mut doc = Document::new("SPEC");
    let mut section = Section { section_id: "1".to_string(), key: "CONTEXT".to_string(), annotation: None, children: Vec::new(), leading_comments: Vec::new() };
    section.children.push(Node::Assignment(Assignment { key: "LABEL".to_string(), value: Value::string("has space"), leading_comments: Vec::new(), trailing_comment: None }));
    doc.sections.push(section);
    let text = emit(&doc, &FormatOptions::default());
    assert!(text.contains("\"has space\""));
}
