//! `VocabularyRegistry`: maps `@ns/name` to a (path, optional version) pair.
//!
//! Two construction modes are kept, both present in the original
//! implementation: parsed from a registry document (`§<id>::<NAME>` sections
//! with `NAME`/`PATH`/`VERSION` children), and a direct namespace→path
//! mapping built in-process.

use std::collections::HashMap;

use crate::ast::{Document, Node, Value};
use crate::error::VocabularyError;

#[derive(Debug, Clone)]
pub struct ResolvedVocabulary {
    pub path: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VocabularyRegistry {
    entries: HashMap<String, ResolvedVocabulary>,
}

impl VocabularyRegistry {
    pub fn from_mappings(mappings: HashMap<String, String>) -> Self {
        let entries = mappings.into_iter().map(|(ns, path)| (ns, ResolvedVocabulary { path, version: None })).collect();
        Self { entries }
    }

    pub fn from_mappings_with_versions(mappings: HashMap<String, (String, Option<String>)>) -> Self {
        let entries = mappings.into_iter().map(|(ns, (path, version))| (ns, ResolvedVocabulary { path, version })).collect();
        Self { entries }
    }

    /// Parses a registry document made of `§<id>::<NAME>` sections, each
    /// carrying `NAME`, `PATH`, and optional `VERSION` assignments.
    pub fn from_registry_document(document: &Document) -> Self {
        let mut entries = HashMap::new();
        for section in &document.sections {
            let mut name = None;
            let mut path = None;
            let mut version = None;
            for child in &section.children {
                if let Node::Assignment(a) = child {
                    match a.key.as_str() {
                        "NAME" => name = string_value(&a.value),
                        "PATH" => path = string_value(&a.value),
                        "VERSION" => version = string_value(&a.value),
                        _ => {}
                    }
                }
            }
            if let (Some(name), Some(path)) = (name, path) {
                entries.insert(name, ResolvedVocabulary { path, version });
            }
        }
        Self { entries }
    }

    pub fn resolve(&self, namespace: &str, requested_version: Option<&str>) -> Result<ResolvedVocabulary, VocabularyError> {
        let entry = self.entries.get(namespace).ok_or_else(|| VocabularyError::UnknownNamespace { namespace: namespace.to_string() })?;
        if let Some(requested) = requested_version {
            match &entry.version {
                Some(registry_version) if registry_version == requested => {}
                Some(registry_version) => {
                    return Err(VocabularyError::VersionMismatch {
                        namespace: namespace.to_string(),
                        requested: requested.to_string(),
                        registry: Some(registry_version.clone()),
                    })
                }
                None => {
                    return Err(VocabularyError::VersionMismatch { namespace: namespace.to_string(), requested: requested.to_string(), registry: None })
                }
            }
        }
        Ok(entry.clone())
    }
}

fn string_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_direct_mapping() {
        let mut map = HashMap::new();
        map.insert("@ns/name".to_string(), "vocab.oct.md".to_string());
        let registry = VocabularyRegistry::from_mappings(map);
        let resolved = registry.resolve("@ns/name", None).unwrap();
        assert_eq!(resolved.path, "vocab.oct.md");
    }

    #[test]
    fn version_mismatch_is_an_error() {
        let mut map = HashMap::new();
        map.insert("@ns/name".to_string(), ("vocab.oct.md".to_string(), Some("1.0.0".to_string())));
        let registry = VocabularyRegistry::from_mappings_with_versions(map);
        let err = registry.resolve("@ns/name", Some("2.0.0")).unwrap_err();
        assert!(matches!(err, VocabularyError::VersionMismatch { .. }));
    }

    #[test]
    fn unknown_namespace_is_an_error() {
        let registry = VocabularyRegistry::from_mappings(HashMap::new());
        assert!(matches!(registry.resolve("@missing/ns", None), Err(VocabularyError::UnknownNamespace { .. })));
    }
}
