//! Merge output types.

use serde::{Deserialize, Serialize};

use crate::diff::{ConfigurationSet, SetClassification};
use crate::model::AnnotationStore;

/// Why a set was left for manual resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// Sources disagree (or one source stacked annotations)
    Differing,
    /// Some source is absent and incomplete sets were not to be merged
    IncompleteNotMerged,
    /// Accepted on its own, but it points at something that was not merged
    DanglingReference,
    /// A chain link whose predecessor was not merged, so it would no longer
    /// sit at its ordinal
    BrokenChain,
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            UnresolvedReason::Differing => "differing",
            UnresolvedReason::IncompleteNotMerged => "incomplete (not merged)",
            UnresolvedReason::DanglingReference => "dangling reference",
            UnresolvedReason::BrokenChain => "broken chain",
        };
        write!(f, "{}", label)
    }
}

/// A set requiring a human decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedSet {
    pub set: ConfigurationSet,
    pub classification: SetClassification,
    pub reason: UnresolvedReason,
}

/// Counters describing what the merge did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Reference annotations accepted as they were
    pub kept_from_reference: usize,
    /// Annotations copied in from a non-reference source
    pub added_from_other_sources: usize,
    /// Slot links copied in from a non-reference source
    pub added_links: usize,
    /// Reference annotations taken out (unresolved or dangling)
    pub removed: usize,
    /// Reference annotations whose position is not in the diff, kept untouched
    pub retained_outside_diff: usize,
    /// Chain links whose successor was not merged
    pub truncated_chains: usize,
    /// Spans outside the diffed layers carried in as relation endpoints or
    /// link targets
    pub carried_spans: usize,
    /// Links dropped because their target was not merged
    pub pruned_links: usize,
}

/// Curated store plus everything left for manual resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Labelled `curation`
    pub curated: AnnotationStore,
    /// In position order; every set at most once
    pub unresolved: Vec<UnresolvedSet>,
    pub stats: MergeStats,
}

impl MergeOutcome {
    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn unresolved_by(&self, reason: UnresolvedReason) -> impl Iterator<Item = &UnresolvedSet> {
        self.unresolved.iter().filter(move |u| u.reason == reason)
    }
}
