//! Schema extraction (spec §4.5): lifts a [`SchemaDefinition`] out of a
//! parsed document whose `META.TYPE` marks it as a protocol/schema
//! definition.

use std::collections::BTreeMap;

use crate::ast::{Document, FieldDefinition, Node, PolicyDefinition, SchemaDefinition, UnknownFieldsPolicy, Value};
use crate::error::SchemaError;

const PROTOCOL_TYPE_MARKERS: &[&str] = &["PROTOCOL_DEFINITION", "SCHEMA_DEFINITION"];

pub fn extract_schema(document: &Document) -> Result<SchemaDefinition, SchemaError> {
    match document.meta_get("TYPE") {
        Some(Value::String(t)) if PROTOCOL_TYPE_MARKERS.contains(&t.as_str()) => {}
        _ => {
            return Err(SchemaError::new(
                "document META.TYPE is not a recognized protocol/schema definition marker",
                "E_SCHEMA",
            ))
        }
    }

    let fields_section = document.sections.iter().find(|s| s.key.eq_ignore_ascii_case("FIELDS"));
    let mut fields = BTreeMap::new();
    if let Some(section) = fields_section {
        for child in &section.children {
            if let Node::Assignment(assignment) = child {
                if let Value::Holographic(h) = &assignment.value {
                    fields.insert(
                        assignment.key.clone(),
                        FieldDefinition {
                            name: assignment.key.clone(),
                            example: (*h.example).clone(),
                            constraint_chain: h.constraint_chain.clone(),
                            target: h.target.clone(),
                        },
                    );
                }
            }
        }
    }

    let policy_section = document.sections.iter().find(|s| s.key.eq_ignore_ascii_case("POLICY"));
    let policy = match policy_section {
        Some(section) => extract_policy(section)?,
        None => PolicyDefinition::default(),
    };

    let version = match document.meta_get("VERSION") {
        Some(Value::String(v)) => v.clone(),
        _ => "1.0".to_string(),
    };

    Ok(SchemaDefinition { name: document.name.clone(), version, policy, fields })
}

fn extract_policy(section: &crate::ast::Section) -> Result<PolicyDefinition, SchemaError> {
    let mut policy = PolicyDefinition::default();
    for child in &section.children {
        if let Node::Assignment(a) = child {
            match a.key.as_str() {
                "VERSION" => {
                    if let Value::String(v) = &a.value {
                        policy.version = v.clone();
                    }
                }
                "UNKNOWN_FIELDS" => {
                    let raw = match &a.value {
                        Value::String(v) => v.clone(),
                        other => return Err(SchemaError::new(format!("UNKNOWN_FIELDS must be a string, got {other:?}"), "E_SCHEMA")),
                    };
                    policy.unknown_fields = match raw.as_str() {
                        "REJECT" => UnknownFieldsPolicy::Reject,
                        "WARN" => UnknownFieldsPolicy::Warn,
                        "IGNORE" => UnknownFieldsPolicy::Ignore,
                        other => {
                            return Err(SchemaError::new(
                                format!("invalid UNKNOWN_FIELDS value '{other}'; expected REJECT, WARN, or IGNORE"),
                                "E_SCHEMA",
                            ))
                        }
                    };
                }
                "TARGETS" => {
                    if let Value::List(list) = &a.value {
                        policy.targets = list
                            .items
                            .iter()
                            .filter_map(|v| match v {
                                Value::SectionRef(s) => Some(s.clone()),
                                Value::String(s) => Some(s.trim_start_matches('§').to_string()),
                                _ => None,
                            })
                            .collect();
                    }
                }
                _ => {}
            }
        }
    }
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Assignment, HolographicValue, Section};

    fn sample_document() -> Document {
        let mut doc = Document::new("SCHEMA");
        doc.meta.push(("TYPE".to_string(), Value::string("PROTOCOL_DEFINITION")));
        let mut fields = Section { section_id: "1".to_string(), key: "FIELDS".to_string(), annotation: None, children: Vec::new(), leading_comments: Vec::new() };
        fields.children.push(Node::Assignment(Assignment {
            key: "NAME".to_string(),
            value: Value::Holographic(HolographicValue {
                example: Box::new(Value::string("abc")),
                constraint_chain: "REQ".to_string(),
                target: Some("SELF".to_string()),
                raw_pattern: "[\"abc\"∧REQ→§SELF]".to_string(),
            }),
            leading_comments: Vec::new(),
            trailing_comment: None,
        }));
        doc.sections.push(fields);
        doc
    }

    #[test]
    fn extracts_fields_from_holographic_assignments() {
        let schema = extract_schema(&sample_document()).unwrap();
        assert!(schema.fields.contains_key("NAME"));
    }

    #[test]
    fn rejects_non_protocol_document() {
        let doc = Document::new("PLAIN");
        assert!(extract_schema(&doc).is_err());
    }
}
