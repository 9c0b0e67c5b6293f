//! Phase 5: Hydrator — vocabulary snapshot resolution (spec §4.7).
//!
//! `hydrate(source_path, registry, policy)` replaces every
//! `§CONTEXT::IMPORT["@ns/name", version?]` with a `SNAPSHOT` +
//! `MANIFEST` + `PRUNED` triple. Registry resolution, vocabulary parsing,
//! collision/cycle detection, staleness checking, and path-security
//! validation live in their own submodules.

pub mod manifest;
pub mod registry;
pub mod security;
pub mod staleness;
pub mod vocabulary;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::instrument;

use crate::ast::{Assignment, Document, Node, Section, Value};
use crate::error::VocabularyError;

pub use manifest::PruneStrategy;
pub use registry::VocabularyRegistry;
pub use staleness::{check_staleness, StalenessResult, StalenessStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    Error,
    SourceWins,
    LocalWins,
}

#[derive(Debug, Clone)]
pub struct HydrationPolicy {
    pub depth: u32,
    pub prune: PruneStrategy,
    pub collision: CollisionPolicy,
    pub allowed_root: Option<PathBuf>,
}

impl Default for HydrationPolicy {
    fn default() -> Self {
        Self { depth: 1, prune: PruneStrategy::List, collision: CollisionPolicy::Error, allowed_root: None }
    }
}

#[instrument(skip(registry, policy))]
pub fn hydrate(source_path: &Path, registry: &VocabularyRegistry, policy: &HydrationPolicy) -> Result<Document, VocabularyError> {
    let base_path = source_path.parent().unwrap_or_else(|| Path::new("."));
    let allowed_root = policy.allowed_root.clone().unwrap_or_else(|| base_path.to_path_buf());

    let text = std::fs::read_to_string(source_path).map_err(|e| VocabularyError::Io { path: source_path.display().to_string(), message: e.to_string() })?;
    let mut document = crate::parser::parse(&text, false).map_err(|e| VocabularyError::Io { path: source_path.display().to_string(), message: e.to_string() })?;

    let mut active_paths: HashSet<PathBuf> = HashSet::new();
    let local_definitions = vocabulary::local_definitions(&document);

    let mut new_sections = Vec::new();
    for section in document.sections.drain(..) {
        if let Some((namespace, requested_version)) = find_import(&section) {
            let hydrated = hydrate_import(
                &namespace,
                requested_version.as_deref(),
                &document,
                &local_definitions,
                registry,
                policy,
                base_path,
                &allowed_root,
                &mut active_paths,
            )?;
            new_sections.extend(hydrated);
        } else {
            new_sections.push(section);
        }
    }
    document.sections = new_sections;
    Ok(document)
}

fn find_import(section: &Section) -> Option<(String, Option<String>)> {
    if !section.key.eq_ignore_ascii_case("IMPORT") {
        return None;
    }
    for child in &section.children {
        if let Node::Assignment(a) = child {
            if let Value::List(list) = &a.value {
                let namespace = list.items.first().and_then(|v| if let Value::String(s) = v { Some(s.clone()) } else { None })?;
                let version = list.items.get(1).and_then(|v| if let Value::String(s) = v { Some(s.clone()) } else { None });
                return Some((namespace, version));
            }
        }
    }
    None
}

#[allow(clippy::too_many_arguments)]
fn hydrate_import(
    namespace: &str,
    requested_version: Option<&str>,
    _source_document: &Document,
    local_definitions: &std::collections::BTreeMap<String, Value>,
    registry: &VocabularyRegistry,
    policy: &HydrationPolicy,
    base_path: &Path,
    allowed_root: &Path,
    active_paths: &mut HashSet<PathBuf>,
) -> Result<Vec<Section>, VocabularyError> {
    let resolved = registry.resolve(namespace, requested_version)?;
    let resolved_path = security::validate_source_uri(&resolved.path, base_path, allowed_root)?;

    if active_paths.contains(&resolved_path) {
        let mut path: Vec<String> = active_paths.iter().map(|p| p.display().to_string()).collect();
        path.sort();
        path.push(resolved_path.display().to_string());
        return Err(VocabularyError::Cycle { path });
    }
    active_paths.insert(resolved_path.clone());

    let capsule_text = std::fs::read_to_string(&resolved_path).map_err(|e| VocabularyError::Io { path: resolved_path.display().to_string(), message: e.to_string() })?;
    let capsule = crate::parser::parse(&capsule_text, false).map_err(|e| VocabularyError::Io { path: resolved_path.display().to_string(), message: e.to_string() })?;
    let vocabulary_terms = vocabulary::parse_vocabulary(&capsule)?;

    let used_terms = vocabulary::detect_used_terms(_source_document, &vocabulary_terms);

    if policy.collision == CollisionPolicy::Error {
        let mut colliding: Vec<&String> = used_terms
            .iter()
            .filter(|term| {
                vocabulary_terms.get(*term).is_some_and(|imported| local_definitions.get(*term).is_some_and(|local| local != imported))
            })
            .collect();
        colliding.sort();
        if let Some(first) = colliding.first() {
            let all_collisions: Vec<String> = colliding.iter().map(|t| t.to_string()).collect();
            return Err(VocabularyError::Collision {
                term: first.to_string(),
                local_def: format!("{:?}", local_definitions[first.as_str()]),
                imported_def: format!("{:?}", vocabulary_terms[first.as_str()]),
                all_collisions,
            });
        }
    }

    let mut snapshot_terms: std::collections::BTreeMap<String, Value> = std::collections::BTreeMap::new();
    let mut pruned_names: Vec<String> = Vec::new();

    for (term, definition) in &vocabulary_terms {
        if used_terms.contains(term) {
            if let Some(local_def) = local_definitions.get(term) {
                resolve_collision(term, local_def, definition, policy, &mut snapshot_terms)?;
            } else {
                snapshot_terms.insert(term.clone(), definition.clone());
            }
        } else {
            pruned_names.push(term.clone());
        }
    }
    pruned_names.sort();

    let source_hash = vocabulary::compute_vocabulary_hash(&resolved_path)?;
    let relative_uri = resolved.path.clone();

    let mut snapshot = Section {
        section_id: String::new(),
        key: "SNAPSHOT".to_string(),
        annotation: Some(format!("\"{namespace}\"")),
        children: snapshot_terms.into_iter().map(|(k, v)| Node::Assignment(Assignment { key: k, value: v, leading_comments: Vec::new(), trailing_comment: None })).collect(),
        leading_comments: Vec::new(),
    };
    snapshot.section_id = "CONTEXT".to_string();

    let manifest = manifest::build_manifest_section(&relative_uri, &source_hash, requested_version, resolved.version.as_deref(), policy, Utc::now());
    let pruned = manifest::build_pruned_section(&pruned_names, policy.prune.clone());

    active_paths.remove(&resolved_path);

    let mut out = vec![snapshot, manifest];
    if let Some(pruned) = pruned {
        out.push(pruned);
    }
    Ok(out)
}

fn resolve_collision(
    term: &str,
    local_def: &Value,
    imported_def: &Value,
    policy: &HydrationPolicy,
    snapshot_terms: &mut std::collections::BTreeMap<String, Value>,
) -> Result<(), VocabularyError> {
    if local_def == imported_def {
        snapshot_terms.insert(term.to_string(), imported_def.clone());
        return Ok(());
    }
    match policy.collision {
        CollisionPolicy::Error => Err(VocabularyError::Collision {
            term: term.to_string(),
            local_def: format!("{local_def:?}"),
            imported_def: format!("{imported_def:?}"),
            all_collisions: vec![term.to_string()],
        }),
        CollisionPolicy::SourceWins => {
            snapshot_terms.insert(term.to_string(), imported_def.clone());
            Ok(())
        }
        CollisionPolicy::LocalWins => {
            snapshot_terms.insert(term.to_string(), local_def.clone());
            Ok(())
        }
    }
}
