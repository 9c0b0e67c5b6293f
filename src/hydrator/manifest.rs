//! Manifest construction and prune-strategy rendering (spec §4.7, §6
//! "Persisted manifest layout").

use chrono::{DateTime, Utc};

use crate::ast::{Assignment, Block, Node, Section, Value};
use crate::error::VocabularyError;
use crate::hydrator::{CollisionPolicy, HydrationPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneStrategy {
    List,
    Hash,
    Count,
    Elide,
}

impl PruneStrategy {
    pub fn parse(s: &str) -> Result<Self, VocabularyError> {
        match s {
            "list" => Ok(PruneStrategy::List),
            "hash" => Ok(PruneStrategy::Hash),
            "count" => Ok(PruneStrategy::Count),
            "elide" => Ok(PruneStrategy::Elide),
            other => Err(VocabularyError::InvalidPruneStrategy { given: other.to_string() }),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            PruneStrategy::List => "list",
            PruneStrategy::Hash => "hash",
            PruneStrategy::Count => "count",
            PruneStrategy::Elide => "elide",
        }
    }
}

fn collision_str(policy: CollisionPolicy) -> &'static str {
    match policy {
        CollisionPolicy::Error => "error",
        CollisionPolicy::SourceWins => "source_wins",
        CollisionPolicy::LocalWins => "local_wins",
    }
}

fn assign(key: &str, value: Value) -> Node {
    Node::Assignment(Assignment { key: key.to_string(), value, leading_comments: Vec::new(), trailing_comment: None })
}

/// `§SNAPSHOT::MANIFEST` — provenance for one hydrated import.
pub fn build_manifest_section(
    source_uri: &str,
    source_hash: &str,
    requested_version: Option<&str>,
    resolved_version: Option<&str>,
    policy: &HydrationPolicy,
    now: DateTime<Utc>,
) -> Section {
    let policy_block = Node::Block(Block {
        key: "HYDRATION_POLICY".to_string(),
        inheritance_target: None,
        raw_annotation: None,
        children: vec![
            assign("DEPTH", Value::integer(policy.depth as i64)),
            assign("PRUNE", Value::string(policy.prune.as_str())),
            assign("COLLISION", Value::string(collision_str(policy.collision))),
        ],
        leading_comments: Vec::new(),
    });

    let children = vec![
        assign("SOURCE_URI", Value::string(source_uri)),
        assign("SOURCE_HASH", Value::string(source_hash)),
        assign("HYDRATION_TIME", Value::string(now.to_rfc3339())),
        assign("REQUESTED_VERSION", Value::string(requested_version.unwrap_or("unspecified"))),
        assign("RESOLVED_VERSION", Value::string(resolved_version.unwrap_or("unknown"))),
        policy_block,
    ];

    Section { section_id: "SNAPSHOT".to_string(), key: "MANIFEST".to_string(), annotation: None, children, leading_comments: Vec::new() }
}

/// `§SNAPSHOT::PRUNED` — unused-term accounting, shaped by `strategy`.
/// Returns `None` for `elide`, which omits the section entirely.
pub fn build_pruned_section(pruned_names: &[String], strategy: PruneStrategy) -> Option<Section> {
    let child = match strategy {
        PruneStrategy::Elide => return None,
        PruneStrategy::List => {
            assign("TERMS", Value::List(crate::ast::ListValue { items: pruned_names.iter().map(|n| Value::string(n.clone())).collect(), token_slice: None }))
        }
        PruneStrategy::Hash => {
            use sha2::{Digest, Sha256};
            let mut sorted = pruned_names.to_vec();
            sorted.sort();
            let mut hasher = Sha256::new();
            hasher.update(sorted.join(",").as_bytes());
            assign("HASH", Value::string(format!("sha256:{}", hex::encode(hasher.finalize()))))
        }
        PruneStrategy::Count => assign("COUNT", Value::integer(pruned_names.len() as i64)),
    };
    Some(Section { section_id: "SNAPSHOT".to_string(), key: "PRUNED".to_string(), annotation: None, children: vec![child], leading_comments: Vec::new() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_prune_strategy_is_rejected() {
        assert!(matches!(PruneStrategy::parse("bogus"), Err(VocabularyError::InvalidPruneStrategy { .. })));
    }

    #[test]
    fn elide_omits_pruned_section() {
        assert!(build_pruned_section(&["A".to_string()], PruneStrategy::Elide).is_none());
    }

    #[test]
    fn count_strategy_reports_length() {
        let section = build_pruned_section(&["A".to_string(), "B".to_string()], PruneStrategy::Count).unwrap();
        let Node::Assignment(a) = &section.children[0] else { panic!("expected assignment") };
        assert_eq!(a.value, Value::integer(2));
    }
}
