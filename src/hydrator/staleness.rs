//! Staleness checking (spec §4.7 "Staleness checking").
//!
//! For each `SNAPSHOT`+`MANIFEST` pair in a hydrated document, re-resolve
//! `SOURCE_URI` relative to `base_path`, recompute its hash, and compare
//! against the recorded `SOURCE_HASH`. Malformed manifests produce an
//! explicit `ERROR` result rather than being silently skipped (I5).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::{Document, Node, Value};
use crate::hydrator::{security, vocabulary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StalenessStatus {
    Fresh,
    Stale,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StalenessResult {
    pub namespace: String,
    pub status: StalenessStatus,
    pub expected_hash: Option<String>,
    pub actual_hash: Option<String>,
    pub error: Option<String>,
}

pub fn check_staleness(document: &Document, base_path: &Path, allowed_root: Option<&Path>) -> Vec<StalenessResult> {
    let allowed_root = allowed_root.unwrap_or(base_path);
    let mut results = Vec::new();
    let mut last_namespace: Option<String> = None;

    for section in &document.sections {
        if section.section_id.eq_ignore_ascii_case("CONTEXT") && section.key.eq_ignore_ascii_case("SNAPSHOT") {
            last_namespace = section.annotation.as_deref().map(|a| a.trim_matches('"').trim_start_matches('@').to_string());
            continue;
        }
        if !(section.section_id.eq_ignore_ascii_case("SNAPSHOT") && section.key.eq_ignore_ascii_case("MANIFEST")) {
            continue;
        }

        let namespace = last_namespace.clone().unwrap_or_else(|| "unknown".to_string());
        results.push(check_one_manifest(&namespace, section, base_path, allowed_root));
    }

    results
}

fn string_assignment(section: &crate::ast::Section, key: &str) -> Option<String> {
    section.children.iter().find_map(|c| match c {
        Node::Assignment(a) if a.key == key => match &a.value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        },
        _ => None,
    })
}

fn check_one_manifest(namespace: &str, manifest: &crate::ast::Section, base_path: &Path, allowed_root: &Path) -> StalenessResult {
    let error_result = |message: String| StalenessResult {
        namespace: namespace.to_string(),
        status: StalenessStatus::Error,
        expected_hash: None,
        actual_hash: None,
        error: Some(message),
    };

    let Some(source_uri) = string_assignment(manifest, "SOURCE_URI") else {
        return error_result("manifest is missing SOURCE_URI".to_string());
    };
    if source_uri.is_empty() {
        return error_result("manifest has an empty SOURCE_URI".to_string());
    }
    let Some(expected_hash) = string_assignment(manifest, "SOURCE_HASH") else {
        return error_result("manifest is missing SOURCE_HASH".to_string());
    };

    let resolved_path = match security::validate_source_uri(&source_uri, base_path, allowed_root) {
        Ok(p) => p,
        Err(e) => return error_result(e.to_string()),
    };

    let actual_hash = match vocabulary::compute_vocabulary_hash(&resolved_path) {
        Ok(h) => h,
        Err(e) => return error_result(e.to_string()),
    };

    let status = if actual_hash == expected_hash { StalenessStatus::Fresh } else { StalenessStatus::Stale };
    StalenessResult { namespace: namespace.to_string(), status, expected_hash: Some(expected_hash), actual_hash: Some(actual_hash), error: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Assignment, Document, Section};
    use std::fs;
    use tempfile::tempdir;

    fn manifest_section(source_uri: &str, source_hash: &str) -> Section {
        Section {
            section_id: "SNAPSHOT".to_string(),
            key: "MANIFEST".to_string(),
            annotation: None,
            children: vec![
                Node::Assignment(Assignment { key: "SOURCE_URI".to_string(), value: Value::string(source_uri), leading_comments: Vec::new(), trailing_comment: None }),
                Node::Assignment(Assignment { key: "SOURCE_HASH".to_string(), value: Value::string(source_hash), leading_comments: Vec::new(), trailing_comment: None }),
            ],
            leading_comments: Vec::new(),
        }
    }

    #[test]
    fn missing_source_uri_is_an_explicit_error() {
        let mut doc = Document::new("T");
        let mut manifest = manifest_section("x", "sha256:deadbeef");
        manifest.children.remove(0);
        doc.sections.push(manifest);
        let dir = tempdir().unwrap();
        let results = check_staleness(&doc, dir.path(), None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, StalenessStatus::Error);
    }

    #[test]
    fn matching_hash_is_fresh() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("vocab.oct.md"), "===V===\n===END===\n").unwrap();
        let hash = vocabulary::compute_vocabulary_hash(&dir.path().join("vocab.oct.md")).unwrap();
        let mut doc = Document::new("T");
        doc.sections.push(manifest_section("vocab.oct.md", &hash));
        let results = check_staleness(&doc, dir.path(), None);
        assert_eq!(results[0].status, StalenessStatus::Fresh);
    }

    #[test]
    fn mismatched_hash_is_stale() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("vocab.oct.md"), "===V===\n===END===\n").unwrap();
        let mut doc = Document::new("T");
        doc.sections.push(manifest_section("vocab.oct.md", "sha256:0000"));
        let results = check_staleness(&doc, dir.path(), None);
        assert_eq!(results[0].status, StalenessStatus::Stale);
    }
}
