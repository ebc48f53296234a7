//! Pairwise agreement over a diff result.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::agreement::measure::AgreementMeasure;
use crate::agreement::model::{
    AgreementUnit, Category, ContingencyTable, FeatureId, PairAgreement, PairwiseAgreementResult,
};
use crate::diff::{ConfigurationSet, DiffResult, SetClassification, StoreIndex};
use crate::errors::{ConcordError, Result};
use crate::model::{FeatureValue, LinkCompareBehavior, SourceLabel};
use crate::{log_op_end, log_op_error, log_op_start};

/// What one source contributes to one unit
enum Observation {
    Seen(Category),
    Stacked,
}

/// Fail unless `measure` can score tables built with `exclude_incomplete`
///
/// # Errors
///
/// `UnsupportedMeasureConfiguration` when incomplete units are kept and the
/// measure has no representation for `Absent`.
pub fn check_measure_configuration(
    measure: &dyn AgreementMeasure,
    exclude_incomplete: bool,
) -> Result<()> {
    if !exclude_incomplete && !measure.supports_absent() {
        return Err(ConcordError::UnsupportedMeasureConfiguration {
            measure: measure.name().to_string(),
            reason: "measure has no category for missing annotations; \
                     exclude incomplete units or choose a measure that supports them"
                .to_string(),
        });
    }
    Ok(())
}

/// Compute pairwise agreement on one feature for every pair of diffed sources
///
/// Units are the base sets on the feature's layer. Incomplete sets take part
/// only when `exclude_incomplete` is false, in which case a source without an
/// annotation contributes the `Absent` category.
///
/// # Errors
///
/// `UnsupportedMeasureConfiguration` when `exclude_incomplete` is false and
/// the measure cannot represent `Absent`. Checked before any table is built.
pub fn pairwise_agreement(
    diff: &DiffResult,
    feature: &FeatureId,
    measure: &dyn AgreementMeasure,
    exclude_incomplete: bool,
) -> Result<PairwiseAgreementResult> {
    let start = Instant::now();
    log_op_start!(
        "pairwise_agreement",
        feature = %feature,
        measure = measure.name(),
        exclude_incomplete = exclude_incomplete
    );

    if let Err(err) = check_measure_configuration(measure, exclude_incomplete) {
        log_op_error!(
            "pairwise_agreement",
            err.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        return Err(err);
    }

    let unit_sets: Vec<(&ConfigurationSet, SetClassification)> = diff
        .classified()
        .filter(|(set, class)| {
            !set.is_slot()
                && set.layer() == feature.layer
                && (*class != SetClassification::Incomplete || !exclude_incomplete)
        })
        .collect();

    let indexes: BTreeMap<&SourceLabel, StoreIndex<'_>> = diff
        .stores
        .iter()
        .map(|(label, store)| (label, StoreIndex::new(store)))
        .collect();

    let mut pairs = Vec::new();
    for (i, source_a) in diff.sources.iter().enumerate() {
        for source_b in &diff.sources[i + 1..] {
            let mut table = ContingencyTable::new();
            let mut units = Vec::new();
            let mut incomplete_units = 0;
            let mut stacked_units = 0;

            for (set, class) in &unit_sets {
                let a = observe(diff, &indexes, set, source_a, feature);
                let b = observe(diff, &indexes, set, source_b, feature);
                let (a, b) = match (a, b) {
                    (Observation::Stacked, _) | (_, Observation::Stacked) => {
                        stacked_units += 1;
                        continue;
                    }
                    (Observation::Seen(a), Observation::Seen(b)) => (a, b),
                };
                match (&a, &b) {
                    (Category::Absent, Category::Absent) => continue,
                    (Category::Absent, _) | (_, Category::Absent) if exclude_incomplete => {
                        incomplete_units += 1;
                        continue;
                    }
                    _ => {}
                }
                table.add(a.clone(), b.clone());
                units.push(AgreementUnit {
                    document: None,
                    position: set.position.clone(),
                    classification: *class,
                    a,
                    b,
                });
            }

            pairs.push(PairAgreement {
                source_a: source_a.clone(),
                source_b: source_b.clone(),
                score: measure.score(&table),
                table,
                units,
                incomplete_units,
                stacked_units,
            });
        }
    }

    log_op_end!(
        "pairwise_agreement",
        duration_ms = start.elapsed().as_millis() as u64,
        pair_count = pairs.len(),
        unit_sets = unit_sets.len()
    );

    Ok(PairwiseAgreementResult {
        feature: feature.clone(),
        measure: measure.name().to_string(),
        exclude_incomplete,
        sources: diff.sources.clone(),
        pairs,
    })
}

fn observe(
    diff: &DiffResult,
    indexes: &BTreeMap<&SourceLabel, StoreIndex<'_>>,
    set: &ConfigurationSet,
    source: &SourceLabel,
    feature: &FeatureId,
) -> Observation {
    let mut configurations = set.configurations_for(source);
    let Some(configuration) = configurations.next() else {
        return Observation::Seen(Category::Absent);
    };
    if configurations.next().is_some() {
        return Observation::Stacked;
    }

    let value = diff
        .annotation(configuration)
        .and_then(|a| a.instance.feature(&feature.feature));
    let category = match value {
        None | Some(FeatureValue::Null) => Category::Unset,
        Some(FeatureValue::Links(links)) => match indexes.get(source) {
            Some(index) => {
                Category::Value(FeatureValue::Str(link_signature(links, index, diff.link_compare)))
            }
            None => Category::Unset,
        },
        Some(other) => Category::Value(other.clone()),
    };
    Observation::Seen(category)
}

/// Store-independent rendering of a link list: sorted `role@target` entries
fn link_signature(
    links: &[crate::model::Link],
    index: &StoreIndex<'_>,
    behavior: LinkCompareBehavior,
) -> String {
    let entries: BTreeSet<String> = links
        .iter()
        .filter_map(|link| {
            let target = index.span_key(link.target)?;
            Some(match behavior {
                LinkCompareBehavior::IncludeRole => format!("{}@{}", link.role, target),
                LinkCompareBehavior::TargetOnly => target.to_string(),
            })
        })
        .collect();
    entries.into_iter().collect::<Vec<_>>().join(";")
}

/// Merge per-document results for the same feature into one
///
/// Tables are summed and scores recomputed with `measure`; units are
/// concatenated in input order. Returns `None` for an empty input.
///
/// # Errors
///
/// `Internal` if the results disagree on feature or incompleteness handling.
pub fn combine(
    results: Vec<PairwiseAgreementResult>,
    measure: &dyn AgreementMeasure,
) -> Result<Option<PairwiseAgreementResult>> {
    let mut iter = results.into_iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };

    let feature = first.feature.clone();
    let exclude_incomplete = first.exclude_incomplete;
    let mut sources: BTreeSet<SourceLabel> = BTreeSet::new();
    let mut pairs: BTreeMap<(SourceLabel, SourceLabel), PairAgreement> = BTreeMap::new();

    for result in std::iter::once(first).chain(iter) {
        if result.feature != feature || result.exclude_incomplete != exclude_incomplete {
            return Err(ConcordError::Internal {
                message: format!(
                    "cannot combine agreement on {} with agreement on {}",
                    feature, result.feature
                ),
            });
        }
        sources.extend(result.sources);
        for pair in result.pairs {
            let key = (pair.source_a.clone(), pair.source_b.clone());
            match pairs.get_mut(&key) {
                Some(acc) => {
                    acc.table.absorb(&pair.table);
                    acc.units.extend(pair.units);
                    acc.incomplete_units += pair.incomplete_units;
                    acc.stacked_units += pair.stacked_units;
                }
                None => {
                    pairs.insert(key, pair);
                }
            }
        }
    }

    let pairs = pairs
        .into_values()
        .map(|mut pair| {
            pair.score = measure.score(&pair.table);
            pair
        })
        .collect();

    Ok(Some(PairwiseAgreementResult {
        feature,
        measure: measure.name().to_string(),
        exclude_incomplete,
        sources: sources.into_iter().collect(),
        pairs,
    }))
}
