use std::collections::HashMap;

use octave_core::ast::Value;
use octave_core::parser::parse;
use octave_core::schema::extract_schema;
use octave_core::validator::{validate, ValidationStatus};

fn schema_document_text() -> String {
    "===SPEC===\nMETA:\n  TYPE:: \"PROTOCOL_DEFINITION\"\n  VERSION:: \"1.0\"\n---\n\u{00a7}1::FIELDS\n  NAME:: [\"abc\"\u{2227}REQ\u{2192}\u{00a7}SELF]\n\u{00a7}2::POLICY\n  UNKNOWN_FIELDS:: \"REJECT\"\n===END===\n".to_string()
}

#[test]
fn holographic_pattern_lifts_into_a_required_field() {
    let doc = parse(&schema_document_text(), false).unwrap();
    let schema = extract_schema(&doc).unwrap();
    assert_eq!(schema.policy.unknown_fields, octave_core::ast::UnknownFieldsPolicy::Reject);
    let field = schema.fields.get("NAME").expect("NAME field extracted from holographic pattern");
    assert_eq!(field.constraint_chain, "REQ");
    assert_eq!(field.target.as_deref(), Some("SELF"));
    assert_eq!(field.example, Value::string("abc"));
}

#[test]
fn non_protocol_document_is_rejected_for_schema_extraction() {
    let doc = parse("===PLAIN===\n\u{00a7}1::A\n  X:: 1\n===END===\n", false).unwrap();
    assert!(extract_schema(&doc).is_err());
}

#[test]
fn validator_flags_missing_required_field_against_a_lifted_schema() {
    let schema_doc = parse(&schema_document_text(), false).unwrap();
    let schema = extract_schema(&schema_doc).unwrap();

    let instance = parse("===INSTANCE===\n\u{00a7}1::FIELDS\n===END===\n", false).unwrap();
    let mut schemas = HashMap::new();
    schemas.insert("FIELDS".to_string(), schema);

    let result = validate(&instance, &schemas);
    assert_eq!(result.status_by_section["FIELDS"], ValidationStatus::Invalid);
    assert!(result.errors.iter().any(|e| e.code == "E_REQUIRED"));
}

#[test]
fn validator_routes_fields_with_builtin_targets() {
    let schema_doc = parse(&schema_document_text(), false).unwrap();
    let schema = extract_schema(&schema_doc).unwrap();

    let instance = parse(
        "===INSTANCE===\n\u{00a7}1::FIELDS\n  NAME:: \"hello\"\n===END===\n",
        false,
    )
    .unwrap();
    let mut schemas = HashMap::new();
    schemas.insert("FIELDS".to_string(), schema);

    let result = validate(&instance, &schemas);
    assert_eq!(result.status_by_section["FIELDS"], ValidationStatus::Validated);
    assert_eq!(result.routing_log.targets.get("SELF").map(|v| v.len()), Some(1));
}
