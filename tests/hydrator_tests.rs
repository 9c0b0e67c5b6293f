use std::collections::HashMap;
use std::fs;

use octave_core::ast::{Node, Value};
use octave_core::hydrator::{hydrate, HydrationPolicy, VocabularyRegistry};
use tempfile::tempdir;

fn write_capsule(dir: &std::path::Path) {
    let capsule = "===VOCAB===\nMETA:\n  TYPE:: \"CAPSULE\"\n---\n\u{00a7}1::TERMS\n  ALPHA:: \"definition of alpha\"\n  BETA:: \"definition of beta\"\n===END===\n";
    fs::write(dir.join("vocab.oct.md"), capsule).unwrap();
}

fn write_source(dir: &std::path::Path) -> std::path::PathBuf {
    let source = "===DOC===\n\u{00a7}CONTEXT::IMPORT\n  SOURCE:: [\"@ns/name\"]\n\u{00a7}1::NOTES\n  TEXT:: \"references ALPHA concept\"\n===END===\n";
    let path = dir.join("doc.oct.md");
    fs::write(&path, source).unwrap();
    path
}

fn registry() -> VocabularyRegistry {
    let mut map = HashMap::new();
    map.insert("@ns/name".to_string(), "vocab.oct.md".to_string());
    VocabularyRegistry::from_mappings(map)
}

#[test]
fn import_section_becomes_snapshot_manifest_and_pruned_triple() {
    let dir = tempdir().unwrap();
    write_capsule(dir.path());
    let source_path = write_source(dir.path());

    let doc = hydrate(&source_path, &registry(), &HydrationPolicy::default()).unwrap();

    assert!(!doc.sections.iter().any(|s| s.key.eq_ignore_ascii_case("IMPORT")));
    let snapshot = doc.sections.iter().find(|s| s.key == "SNAPSHOT" && s.annotation.is_some()).expect("snapshot section");
    assert_eq!(snapshot.annotation.as_deref(), Some("\"@ns/name\""));

    let used = snapshot.children.iter().any(|c| matches!(c, Node::Assignment(a) if a.key == "ALPHA"));
    assert!(used, "ALPHA is referenced by the source document and must survive hydration");

    let manifest = doc.sections.iter().find(|s| s.key == "MANIFEST").expect("manifest section");
    let has_hash = manifest.children.iter().any(|c| matches!(c, Node::Assignment(a) if a.key == "SOURCE_HASH"));
    assert!(has_hash);

    let pruned = doc.sections.iter().find(|s| s.key == "PRUNED").expect("pruned section");
    let Node::Assignment(terms) = &pruned.children[0] else { panic!("expected TERMS assignment") };
    let Value::List(list) = &terms.value else { panic!("expected list") };
    assert!(list.items.contains(&Value::string("BETA")));

    let notes = doc.sections.iter().find(|s| s.key == "NOTES").expect("unrelated section is untouched");
    assert!(!notes.children.is_empty());
}

#[test]
fn unknown_namespace_is_rejected() {
    let dir = tempdir().unwrap();
    write_capsule(dir.path());
    let source_path = write_source(dir.path());
    let empty_registry = VocabularyRegistry::from_mappings(HashMap::new());

    let err = hydrate(&source_path, &empty_registry, &HydrationPolicy::default()).unwrap_err();
    assert!(matches!(err, octave_core::error::VocabularyError::UnknownNamespace { .. }));
}

#[test]
fn count_prune_strategy_reports_the_number_of_unused_terms() {
    let dir = tempdir().unwrap();
    write_capsule(dir.path());
    let source_path = write_source(dir.path());

    let policy = HydrationPolicy { prune: octave_core::hydrator::PruneStrategy::parse("count").unwrap(), ..HydrationPolicy::default() };
    let doc = hydrate(&source_path, &registry(), &policy).unwrap();

    let pruned = doc.sections.iter().find(|s| s.key == "PRUNED").expect("pruned section");
    let Node::Assignment(count) = &pruned.children[0] else { panic!("expected COUNT assignment") };
    assert_eq!(count.value, Value::integer(1));
}
