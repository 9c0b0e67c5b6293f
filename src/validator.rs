//! Schema-driven validation with policy enforcement and routing-target
//! registry (spec §4.6).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::ast::{Document, Node, SchemaDefinition, UnknownFieldsPolicy};
use crate::constraint::ConstraintChain;

const BUILTIN_TARGETS: &[&str] = &["SELF", "INDEXER", "DECISION_LOG", "META"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
    pub field_path: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    Validated,
    Invalid,
    Unvalidated,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingLog {
    pub targets: BTreeMap<String, Vec<String>>,
}

impl RoutingLog {
    fn record(&mut self, target: &str, field_path: &str) {
        self.targets.entry(target.to_string()).or_default().push(field_path.to_string());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status_by_section: BTreeMap<String, ValidationStatus>,
    pub errors: Vec<ValidationError>,
    pub routing_log: RoutingLog,
}

#[instrument(skip(document, section_schemas))]
pub fn validate(document: &Document, section_schemas: &HashMap<String, SchemaDefinition>) -> ValidationResult {
    let mut errors = Vec::new();
    let mut routing_log = RoutingLog::default();
    let mut status_by_section = BTreeMap::new();

    for section in &document.sections {
        let Some(schema) = section_schemas.get(&section.key) else {
            status_by_section.insert(section.key.clone(), ValidationStatus::Unvalidated);
            continue;
        };

        let mut section_errors = Vec::new();
        let assignments: BTreeMap<&str, &crate::ast::Value> = section
            .children
            .iter()
            .filter_map(|c| if let Node::Assignment(a) = c { Some((a.key.as_str(), &a.value)) } else { None })
            .collect();

        for (field_name, field) in &schema.fields {
            let chain = ConstraintChain::parse(&field.constraint_chain).unwrap_or(ConstraintChain { constraints: Vec::new() });
            let field_path = format!("{}.{}", section.key, field_name);
            match assignments.get(field_name.as_str()) {
                Some(value) => {
                    if let Err(msg) = chain.validate(value, None) {
                        section_errors.push(ValidationError {
                            code: "E_CONSTRAINT",
                            message: msg,
                            field_path: field_path.clone(),
                            severity: Severity::Error,
                        });
                    }
                }
                None => {
                    if chain.constraints.contains(&crate::constraint::Constraint::Req) {
                        section_errors.push(ValidationError {
                            code: "E_REQUIRED",
                            message: format!("required field '{field_name}' is missing"),
                            field_path: field_path.clone(),
                            severity: Severity::Error,
                        });
                    }
                }
            }

            if let Some(target) = &field.target {
                if !BUILTIN_TARGETS.contains(&target.as_str()) && !schema.policy.targets.iter().any(|t| t == target) {
                    section_errors.push(ValidationError {
                        code: "E009",
                        message: format!("unknown routing target '{target}'"),
                        field_path: field_path.clone(),
                        severity: Severity::Error,
                    });
                } else {
                    routing_log.record(target, &field_path);
                }
            }
        }

        for (key, _) in &assignments {
            if !schema.fields.contains_key(*key) {
                let field_path = format!("{}.{}", section.key, key);
                match schema.policy.unknown_fields {
                    UnknownFieldsPolicy::Reject => section_errors.push(ValidationError {
                        code: "E007",
                        message: format!("unknown field '{key}'"),
                        field_path,
                        severity: Severity::Error,
                    }),
                    UnknownFieldsPolicy::Warn => section_errors.push(ValidationError {
                        code: "W001",
                        message: format!("unknown field '{key}'"),
                        field_path,
                        severity: Severity::Warning,
                    }),
                    UnknownFieldsPolicy::Ignore => {}
                }
            }
        }

        let has_errors = section_errors.iter().any(|e| e.severity == Severity::Error);
        status_by_section.insert(section.key.clone(), if has_errors { ValidationStatus::Invalid } else { ValidationStatus::Validated });
        errors.extend(section_errors);
    }

    ValidationResult { status_by_section, errors, routing_log }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Assignment, FieldDefinition, PolicyDefinition, Section, Value};

    fn schema_with_required_field() -> SchemaDefinition {
        let mut fields = BTreeMap::new();
        fields.insert(
            "NAME".to_string(),
            FieldDefinition { name: "NAME".to_string(), example: Value::string("x"), constraint_chain: "REQ".to_string(), target: Some("SELF".to_string()) },
        );
        SchemaDefinition { name: "TEST".to_string(), version: "1.0".to_string(), policy: PolicyDefinition::default(), fields }
    }

    #[test]
    fn missing_required_field_is_invalid() {
        let mut doc = Document::new("DOC");
        doc.sections.push(Section { section_id: "1".to_string(), key: "CONTEXT".to_string(), annotation: None, children: Vec::new(), leading_comments: Vec::new() });
        let mut schemas = HashMap::new();
        schemas.insert("CONTEXT".to_string(), schema_with_required_field());
        let result = validate(&doc, &schemas);
        assert_eq!(result.status_by_section["CONTEXT"], ValidationStatus::Invalid);
    }

    #[test]
    fn section_without_schema_is_unvalidated() {
        let mut doc = Document::new("DOC");
        doc.sections.push(Section { section_id: "1".to_string(), key: "OTHER".to_string(), annotation: None, children: Vec::new(), leading_comments: Vec::new() });
        let result = validate(&doc, &HashMap::new());
        assert_eq!(result.status_by_section["OTHER"], ValidationStatus::Unvalidated);
    }

    #[test]
    fn reject_policy_flags_unknown_field() {
        let mut doc = Document::new("DOC");
        let mut section = Section { section_id: "1".to_string(), key: "CONTEXT".to_string(), annotation: None, children: Vec::new(), leading_comments: Vec::new() };
        section.children.push(Node::Assignment(Assignment { key: "NAME".to_string(), value: Value::string("x"), leading_comments: Vec::new(), trailing_comment: None }));
        section.children.push(Node::Assignment(Assignment { key: "EXTRA".to_string(), value: Value::string("y"), leading_comments: Vec::new(), trailing_comment: None }));
        doc.sections.push(section);
        let mut schemas = HashMap::new();
        schemas.insert("CONTEXT".to_string(), schema_with_required_field());
        let result = validate(&doc, &schemas);
        assert!(result.errors.iter().any(|e| e.code == "E007"));
    }
}
