//! Vocabulary (CAPSULE) parsing, used-term detection, and content-addressed
//! hashing (spec §4.7).

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::ast::{Document, Node, Value};
use crate::error::VocabularyError;

const HASH_CHUNK_SIZE: usize = 8 * 1024;

/// Asserts `META.TYPE == "CAPSULE"` and recursively extracts `KEY::"def"`
/// pairs from every section/block in the document.
pub fn parse_vocabulary(document: &Document) -> Result<BTreeMap<String, Value>, VocabularyError> {
    match document.meta_get("TYPE") {
        Some(Value::String(t)) if t == "CAPSULE" => {}
        Some(Value::String(t)) => return Err(VocabularyError::NotCapsule { found_type: Some(t.clone()) }),
        _ => return Err(VocabularyError::NotCapsule { found_type: None }),
    }

    let mut terms = BTreeMap::new();
    for section in &document.sections {
        extract_terms_from_nodes(&section.children, &mut terms);
    }
    Ok(terms)
}

fn extract_terms_from_nodes(nodes: &[Node], out: &mut BTreeMap<String, Value>) {
    for node in nodes {
        match node {
            Node::Assignment(a) => {
                out.insert(a.key.clone(), a.value.clone());
            }
            Node::Block(b) => extract_terms_from_nodes(&b.children, out),
            Node::Section(s) => extract_terms_from_nodes(&s.children, out),
            Node::Comment(_) => {}
        }
    }
}

/// Terms defined in the source document's own `§CONTEXT::LOCAL` section.
pub fn local_definitions(document: &Document) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    if let Some(section) = document.sections.iter().find(|s| s.key.eq_ignore_ascii_case("CONTEXT") && s.annotation.as_deref() == Some("LOCAL")) {
        extract_terms_from_nodes(&section.children, &mut out);
    }
    if let Some(section) = document.sections.iter().find(|s| s.section_id.eq_ignore_ascii_case("LOCAL") || s.key.eq_ignore_ascii_case("LOCAL")) {
        extract_terms_from_nodes(&section.children, &mut out);
    }
    out
}

/// Scans section keys, assignment keys (exact match), and string values
/// (substring match, including META values) for any vocabulary term.
pub fn detect_used_terms(document: &Document, vocabulary: &BTreeMap<String, Value>) -> BTreeSet<String> {
    let mut used = BTreeSet::new();
    for (key, _) in &document.meta {
        check_key_for_terms(key, vocabulary, &mut used);
    }
    for (_, value) in &document.meta {
        check_value_for_terms(value, vocabulary, &mut used);
    }
    for section in &document.sections {
        check_key_for_terms(&section.key, vocabulary, &mut used);
        scan_nodes(&section.children, vocabulary, &mut used);
    }
    used
}

fn scan_nodes(nodes: &[Node], vocabulary: &BTreeMap<String, Value>, used: &mut BTreeSet<String>) {
    for node in nodes {
        match node {
            Node::Assignment(a) => {
                check_key_for_terms(&a.key, vocabulary, used);
                check_value_for_terms(&a.value, vocabulary, used);
            }
            Node::Block(b) => {
                check_key_for_terms(&b.key, vocabulary, used);
                scan_nodes(&b.children, vocabulary, used);
            }
            Node::Section(s) => {
                check_key_for_terms(&s.key, vocabulary, used);
                scan_nodes(&s.children, vocabulary, used);
            }
            Node::Comment(_) => {}
        }
    }
}

fn check_key_for_terms(key: &str, vocabulary: &BTreeMap<String, Value>, used: &mut BTreeSet<String>) {
    if vocabulary.contains_key(key) {
        used.insert(key.to_string());
    }
}

fn check_value_for_terms(value: &Value, vocabulary: &BTreeMap<String, Value>, used: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            for term in vocabulary.keys() {
                if s.contains(term.as_str()) {
                    used.insert(term.clone());
                }
            }
        }
        Value::List(list) => {
            for item in &list.items {
                check_value_for_terms(item, vocabulary, used);
            }
        }
        Value::InlineMap(map) => {
            for (_, v) in &map.pairs {
                check_value_for_terms(v, vocabulary, used);
            }
        }
        _ => {}
    }
}

/// Streaming SHA-256 over 8 KiB chunks, so multi-hundred-MB vocabularies
/// never get slurped whole (spec §5).
pub fn compute_vocabulary_hash(path: &Path) -> Result<String, VocabularyError> {
    let mut file = std::fs::File::open(path).map_err(|e| VocabularyError::Io { path: path.display().to_string(), message: e.to_string() })?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer).map_err(|e| VocabularyError::Io { path: path.display().to_string(), message: e.to_string() })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_capsule_document() {
        let doc = Document::new("X");
        assert!(matches!(parse_vocabulary(&doc), Err(VocabularyError::NotCapsule { .. })));
    }

    #[test]
    fn detects_term_used_as_value_substring() {
        let mut vocab = BTreeMap::new();
        vocab.insert("ALPHA".to_string(), Value::string("def"));
        let mut doc = Document::new("X");
        doc.meta.push(("NOTE".to_string(), Value::string("uses ALPHA here")));
        let used = detect_used_terms(&doc, &vocab);
        assert!(used.contains("ALPHA"));
    }
}
