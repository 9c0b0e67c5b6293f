use octave_core::ast::{Node, Value};
use octave_core::parser::{parse, parse_with_warnings};

#[test]
fn envelope_name_is_inferred_when_absent() {
    let doc = parse("META:\n  X:: 1\n---\n", false).unwrap();
    assert_eq!(doc.name, "INFERRED");
}

#[test]
fn envelope_name_comes_from_header() {
    let doc = parse("===SPEC===\n===END===\n", false).unwrap();
    assert_eq!(doc.name, "SPEC");
}

#[test]
fn numeric_and_identifier_section_ids_both_parse() {
    let text = "===DOC===\n\u{00a7}1::Intro\n  X:: 1\n\u{00a7}CONTEXT::\n  Y:: 2\n===END===\n";
    let doc = parse(text, false).unwrap();
    assert_eq!(doc.sections.len(), 2);
    assert_eq!(doc.sections[0].section_id, "1");
    assert_eq!(doc.sections[0].key, "Intro");
    assert_eq!(doc.sections[1].section_id, "CONTEXT");
    assert_eq!(doc.sections[1].key, "CONTEXT");
}

#[test]
fn section_id_with_letter_suffix_keeps_the_suffix() {
    let text = "===DOC===\n\u{00a7}2b::Intro\n  X:: 1\n===END===\n";
    let doc = parse(text, false).unwrap();
    assert_eq!(doc.sections[0].section_id, "2b");
    assert_eq!(doc.sections[0].key, "Intro");
}

#[test]
fn block_inheritance_annotation_is_extracted() {
    let text = "===DOC===\n\u{00a7}1::A\n  RULES[\u{2192}DECISION_LOG]:\n    X:: 1\n===END===\n";
    let doc = parse(text, false).unwrap();
    let Node::Block(block) = &doc.sections[0].children[0] else { panic!("expected block") };
    assert_eq!(block.key, "RULES");
    assert_eq!(block.inheritance_target.as_deref(), Some("DECISION_LOG"));
}

#[test]
fn duplicate_meta_key_emits_warning_and_last_value_wins() {
    let text = "===DOC===\nMETA:\n  X:: 1\n  X:: 2\n---\n===END===\n";
    let (doc, warnings) = parse_with_warnings(text, false).unwrap();
    assert_eq!(doc.meta_get("X"), Some(&Value::integer(2)));
    assert!(warnings.iter().any(|w| w.code == "W_DUPLICATE_KEY"));
}

#[test]
fn multi_word_value_coalesces_to_a_single_string() {
    let text = "===DOC===\n\u{00a7}1::A\n  NAME:: hello world\n===END===\n";
    let doc = parse(text, false).unwrap();
    let Node::Assignment(a) = &doc.sections[0].children[0] else { panic!("expected assignment") };
    assert_eq!(a.value, Value::string("hello world"));
}

#[test]
fn strict_mode_raises_on_unclosed_list() {
    let text = "===DOC===\n\u{00a7}1::A\n  X:: [1, 2\n===END===\n";
    let err = parse(text, true).unwrap_err();
    assert_eq!(err.error_code, "E_UNBALANCED_BRACKET");
}

#[test]
fn duplicate_key_within_a_section_is_also_warned_and_deduped() {
    let text = "===DOC===\n\u{00a7}1::A\n  X:: 1\n  X:: 2\n===END===\n";
    let (doc, warnings) = parse_with_warnings(text, false).unwrap();
    assert!(warnings.iter().any(|w| w.code == "W_DUPLICATE_KEY"));
    assert_eq!(doc.sections[0].children.len(), 1);
    let Node::Assignment(a) = &doc.sections[0].children[0] else { panic!("expected assignment") };
    assert_eq!(a.value, Value::integer(2));
}

#[test]
fn yaml_frontmatter_is_preserved_and_line_numbers_stay_stable() {
    let text = "---\ntitle: x\n---\n===DOC===\n===END===\n";
    let doc = parse(text, false).unwrap();
    assert!(doc.raw_frontmatter.as_deref().unwrap().contains("title: x"));
}
