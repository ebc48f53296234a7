//! Set classification.

use crate::diff::model::{ConfigurationSet, SetClassification};
use crate::model::SourceLabel;

/// Classify one configuration set against the full list of diffed sources
///
/// Rules, in order:
/// 1. a source contributed more than one configuration: `Differing`
/// 2. present configurations disagree on a compared value: `Differing`
/// 3. some source is absent: `Incomplete`
/// 4. otherwise `Unanimous`
///
/// Disagreement therefore wins over incompleteness; such sets are never
/// auto-merged.
pub fn classify(set: &ConfigurationSet, all_sources: &[SourceLabel]) -> SetClassification {
    if set.is_stacked() {
        return SetClassification::Differing;
    }

    if let Some((first, rest)) = set.configurations.split_first() {
        if rest.iter().any(|c| c.values != first.values) {
            return SetClassification::Differing;
        }
    }

    if all_sources.iter().any(|s| !set.has_source(s)) {
        return SetClassification::Incomplete;
    }

    SetClassification::Unanimous
}
