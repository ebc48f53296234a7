//! Agreement input and output types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::diff::{Position, SetClassification};
use crate::model::{FeatureValue, SourceLabel};

/// The (layer, feature) agreement is computed for
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureId {
    pub layer: String,
    pub feature: String,
}

impl FeatureId {
    pub fn new(layer: impl Into<String>, feature: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            feature: feature.into(),
        }
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.layer, self.feature)
    }
}

impl std::str::FromStr for FeatureId {
    type Err = String;

    /// Parse `Layer.feature`; the feature name is everything after the last dot
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('.') {
            Some((layer, feature)) if !layer.is_empty() && !feature.is_empty() => {
                Ok(FeatureId::new(layer, feature))
            }
            _ => Err(format!("expected LAYER.FEATURE, got '{}'", s)),
        }
    }
}

/// What one source says about one unit
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "category", content = "value", rename_all = "snake_case")]
pub enum Category {
    /// Annotated with this value
    Value(FeatureValue),
    /// Annotated, but the feature is unset (or null)
    Unset,
    /// No annotation at this position
    Absent,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Value(v) => write!(f, "{}", v),
            Category::Unset => write!(f, "<unset>"),
            Category::Absent => write!(f, "<absent>"),
        }
    }
}

/// One populated cell of a contingency table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyCell {
    pub a: Category,
    pub b: Category,
    pub count: u64,
}

/// Counts of (category of source A, category of source B) over all units
///
/// Cells are kept sorted by (a, b); empty cells are not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyTable {
    cells: Vec<ContingencyCell>,
}

impl ContingencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, a: Category, b: Category) {
        self.add_count(a, b, 1);
    }

    fn add_count(&mut self, a: Category, b: Category, count: u64) {
        match self
            .cells
            .binary_search_by(|cell| (&cell.a, &cell.b).cmp(&(&a, &b)))
        {
            Ok(idx) => self.cells[idx].count += count,
            Err(idx) => self.cells.insert(idx, ContingencyCell { a, b, count }),
        }
    }

    /// Add every cell of `other` to this table
    pub fn absorb(&mut self, other: &ContingencyTable) {
        for cell in &other.cells {
            self.add_count(cell.a.clone(), cell.b.clone(), cell.count);
        }
    }

    pub fn cells(&self) -> &[ContingencyCell] {
        &self.cells
    }

    pub fn count(&self, a: &Category, b: &Category) -> u64 {
        self.cells
            .iter()
            .find(|cell| &cell.a == a && &cell.b == b)
            .map(|cell| cell.count)
            .unwrap_or(0)
    }

    /// Number of units
    pub fn total(&self) -> u64 {
        self.cells.iter().map(|c| c.count).sum()
    }

    /// Number of units on the diagonal
    pub fn agreed(&self) -> u64 {
        self.cells
            .iter()
            .filter(|c| c.a == c.b)
            .map(|c| c.count)
            .sum()
    }

    pub fn marginals_a(&self) -> BTreeMap<Category, u64> {
        let mut out = BTreeMap::new();
        for cell in &self.cells {
            *out.entry(cell.a.clone()).or_insert(0) += cell.count;
        }
        out
    }

    pub fn marginals_b(&self) -> BTreeMap<Category, u64> {
        let mut out = BTreeMap::new();
        for cell in &self.cells {
            *out.entry(cell.b.clone()).or_insert(0) += cell.count;
        }
        out
    }

    pub fn contains_absent(&self) -> bool {
        self.cells
            .iter()
            .any(|c| c.a == Category::Absent || c.b == Category::Absent)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// One unit as seen by one pair of sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementUnit {
    /// Document the unit belongs to, when aggregated across documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    pub position: Position,
    pub classification: SetClassification,
    pub a: Category,
    pub b: Category,
}

/// Agreement between two sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairAgreement {
    pub source_a: SourceLabel,
    pub source_b: SourceLabel,
    /// `None` when the pair shares no units or the measure is undefined
    pub score: Option<f64>,
    pub table: ContingencyTable,
    /// Units used, in position order
    pub units: Vec<AgreementUnit>,
    /// Units skipped because exactly one source was absent
    pub incomplete_units: u64,
    /// Units skipped because a source stacked annotations there
    pub stacked_units: u64,
}

/// Symmetric matrix of pairwise agreement for one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseAgreementResult {
    pub feature: FeatureId,
    pub measure: String,
    pub exclude_incomplete: bool,
    pub sources: Vec<SourceLabel>,
    /// One entry per unordered pair, `source_a < source_b`, lexicographic
    pub pairs: Vec<PairAgreement>,
}

impl PairwiseAgreementResult {
    /// Entry for the unordered pair `{a, b}`
    pub fn get(&self, a: &SourceLabel, b: &SourceLabel) -> Option<&PairAgreement> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.pairs
            .iter()
            .find(|p| &p.source_a == lo && &p.source_b == hi)
    }

    /// Score for the unordered pair `{a, b}`
    pub fn score(&self, a: &SourceLabel, b: &SourceLabel) -> Option<f64> {
        self.get(a, b).and_then(|p| p.score)
    }

    /// Tag every unit with the document it came from
    pub fn with_document(mut self, document: &str) -> Self {
        for pair in &mut self.pairs {
            for unit in &mut pair.units {
                unit.document = Some(document.to_string());
            }
        }
        self
    }
}
