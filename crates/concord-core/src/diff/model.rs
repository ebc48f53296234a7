//! Diff output types.
//!
//! Collections use `BTreeMap` and sorted `Vec` for deterministic serialization.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::diff::classifier::classify;
use crate::diff::position::Position;
use crate::model::{
    Annotation, AnnotationId, AnnotationStore, FeatureValue, LayerSet, LinkCompareBehavior,
    SourceLabel,
};

/// Which link of a host's slot feature a slot configuration stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRef {
    pub feature: String,
    /// Index into the host's link list
    pub link_index: usize,
}

/// One (source, annotation) pair contributing to a position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub source: SourceLabel,
    /// Id of the annotation (for slots: of the host) in the source store
    pub annotation_id: AnnotationId,
    /// Index of the annotation in its store; diagnostic only
    pub store_order: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<SlotRef>,
    /// Compared primitive feature values; unset and `Null` are both omitted.
    /// Always empty for slot configurations.
    #[serde(default)]
    pub values: BTreeMap<String, FeatureValue>,
}

impl Configuration {
    pub fn is_slot(&self) -> bool {
        self.slot.is_some()
    }
}

/// All configurations sharing one position, across all sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationSet {
    pub position: Position,
    /// Ordered by (source label, store order)
    pub configurations: Vec<Configuration>,
}

impl ConfigurationSet {
    /// Distinct sources present in this set
    pub fn sources(&self) -> BTreeSet<&SourceLabel> {
        self.configurations.iter().map(|c| &c.source).collect()
    }

    pub fn has_source(&self, source: &SourceLabel) -> bool {
        self.configurations.iter().any(|c| &c.source == source)
    }

    /// Configurations contributed by one source (more than one means stacking)
    pub fn configurations_for<'a>(
        &'a self,
        source: &'a SourceLabel,
    ) -> impl Iterator<Item = &'a Configuration> + 'a {
        self.configurations.iter().filter(move |c| &c.source == source)
    }

    /// The single configuration of `source`, or `None` if absent or stacked
    pub fn sole_configuration_for<'a>(
        &'a self,
        source: &'a SourceLabel,
    ) -> Option<&'a Configuration> {
        let mut iter = self.configurations_for(source);
        let first = iter.next()?;
        match iter.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    /// True if some source contributed more than one configuration
    pub fn is_stacked(&self) -> bool {
        self.configurations
            .windows(2)
            .any(|pair| pair[0].source == pair[1].source)
    }

    pub fn is_slot(&self) -> bool {
        self.position.is_slot()
    }

    pub fn layer(&self) -> &str {
        self.position.layer()
    }
}

/// Classification of one configuration set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetClassification {
    /// Every source is present once and all compared values agree
    Unanimous,
    /// Stacking, or present sources disagree on a compared value
    Differing,
    /// Present sources agree but at least one source is absent
    ///
    /// A partly present set whose values disagree is `Differing`, never
    /// `Incomplete`.
    Incomplete,
}

impl std::fmt::Display for SetClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SetClassification::Unanimous => "unanimous",
            SetClassification::Differing => "differing",
            SetClassification::Incomplete => "incomplete",
        };
        write!(f, "{}", label)
    }
}

/// Number of sets per classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationCounts {
    pub unanimous: usize,
    pub differing: usize,
    pub incomplete: usize,
}

impl ClassificationCounts {
    pub fn total(&self) -> usize {
        self.unanimous + self.differing + self.incomplete
    }
}

/// Result of aligning several sources over one document
///
/// The stores are kept so that agreement and merge can read the raw values
/// behind every configuration. Classification is derived on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Source labels, sorted
    pub sources: Vec<SourceLabel>,
    pub layers: LayerSet,
    pub link_compare: LinkCompareBehavior,
    /// Sets sorted by position
    pub sets: Vec<ConfigurationSet>,
    pub stores: BTreeMap<SourceLabel, AnnotationStore>,
}

impl DiffResult {
    pub fn classification(&self, set: &ConfigurationSet) -> SetClassification {
        classify(set, &self.sources)
    }

    /// Sets with their classification, in position order
    pub fn classified(&self) -> impl Iterator<Item = (&ConfigurationSet, SetClassification)> {
        self.sets.iter().map(move |s| (s, self.classification(s)))
    }

    fn with_class(&self, wanted: SetClassification) -> impl Iterator<Item = &ConfigurationSet> {
        self.classified()
            .filter(move |(_, c)| *c == wanted)
            .map(|(s, _)| s)
    }

    pub fn unanimous(&self) -> impl Iterator<Item = &ConfigurationSet> {
        self.with_class(SetClassification::Unanimous)
    }

    pub fn differing(&self) -> impl Iterator<Item = &ConfigurationSet> {
        self.with_class(SetClassification::Differing)
    }

    pub fn incomplete(&self) -> impl Iterator<Item = &ConfigurationSet> {
        self.with_class(SetClassification::Incomplete)
    }

    pub fn counts(&self) -> ClassificationCounts {
        let mut counts = ClassificationCounts::default();
        for (_, class) in self.classified() {
            match class {
                SetClassification::Unanimous => counts.unanimous += 1,
                SetClassification::Differing => counts.differing += 1,
                SetClassification::Incomplete => counts.incomplete += 1,
            }
        }
        counts
    }

    /// Set at `position`, if any source has an annotation there
    pub fn set_at(&self, position: &Position) -> Option<&ConfigurationSet> {
        self.sets
            .binary_search_by(|s| s.position.cmp(position))
            .ok()
            .map(|idx| &self.sets[idx])
    }

    pub fn has_source(&self, source: &SourceLabel) -> bool {
        self.stores.contains_key(source)
    }

    pub fn store(&self, source: &SourceLabel) -> Option<&AnnotationStore> {
        self.stores.get(source)
    }

    /// The annotation behind a configuration
    pub fn annotation(&self, configuration: &Configuration) -> Option<&Annotation> {
        self.stores
            .get(&configuration.source)?
            .get(configuration.annotation_id)
    }

    /// True when every set is unanimous
    pub fn is_unanimous(&self) -> bool {
        self.classified()
            .all(|(_, c)| c == SetClassification::Unanimous)
    }
}
