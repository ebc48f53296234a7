//! The four canonical two-annotator scenarios: agreement, disagreement,
//! one-sided annotation (both merge modes) and percentage agreement.

mod common;

use common::{diff_entities, entity_store};
use concord_core::agreement::{pairwise_agreement, FeatureId, PercentageAgreement};
use concord_core::diff::SetClassification;
use concord_core::merge::{merge, UnresolvedReason};
use concord_core::model::{FeatureValue, SourceLabel};

#[test]
fn scenario_same_span_same_value_is_unanimous_and_merged() {
    let d = diff_entities(vec![
        entity_store("A", &[(0, 5, Some("ORG"))]),
        entity_store("B", &[(0, 5, Some("ORG"))]),
    ]);

    assert_eq!(d.sets.len(), 1);
    assert_eq!(d.classification(&d.sets[0]), SetClassification::Unanimous);

    let outcome = merge(&d, &SourceLabel::from("A"), false).unwrap();
    assert!(outcome.unresolved.is_empty());
    assert_eq!(outcome.curated.len(), 1);
    let kept = &outcome.curated.annotations()[0];
    assert_eq!(kept.instance.offsets(), Some((0, 5)));
    assert_eq!(
        kept.instance.feature("value"),
        Some(&FeatureValue::from("ORG"))
    );
    assert_eq!(outcome.curated.source().as_str(), "curation");
}

#[test]
fn scenario_same_span_different_value_is_differing_and_removed() {
    let d = diff_entities(vec![
        entity_store("A", &[(0, 5, Some("ORG"))]),
        entity_store("B", &[(0, 5, Some("PERSON"))]),
    ]);

    assert_eq!(d.classification(&d.sets[0]), SetClassification::Differing);

    let outcome = merge(&d, &SourceLabel::from("A"), true).unwrap();
    assert!(outcome.curated.is_empty());
    assert_eq!(outcome.unresolved.len(), 1);
    assert_eq!(outcome.unresolved[0].reason, UnresolvedReason::Differing);
}

#[test]
fn scenario_one_sided_annotation_is_incomplete() {
    let d = diff_entities(vec![
        entity_store("A", &[(0, 5, Some("ORG"))]),
        entity_store("B", &[]),
    ]);
    assert_eq!(d.classification(&d.sets[0]), SetClassification::Incomplete);

    let merged = merge(&d, &SourceLabel::from("A"), true).unwrap();
    assert_eq!(merged.curated.len(), 1);
    assert!(merged.unresolved.is_empty());

    let not_merged = merge(&d, &SourceLabel::from("A"), false).unwrap();
    assert!(not_merged.curated.is_empty());
    assert_eq!(not_merged.unresolved.len(), 1);
    assert_eq!(
        not_merged.unresolved[0].reason,
        UnresolvedReason::IncompleteNotMerged
    );
}

#[test]
fn scenario_one_sided_annotation_adopted_from_non_reference_source() {
    let d = diff_entities(vec![
        entity_store("A", &[]),
        entity_store("B", &[(0, 5, Some("ORG"))]),
    ]);

    let outcome = merge(&d, &SourceLabel::from("A"), true).unwrap();
    assert_eq!(outcome.curated.len(), 1);
    assert_eq!(outcome.stats.added_from_other_sources, 1);
}

#[test]
fn scenario_two_of_three_units_agree() {
    let d = diff_entities(vec![
        entity_store(
            "A",
            &[(0, 3, Some("ORG")), (5, 8, Some("PER")), (10, 12, Some("LOC"))],
        ),
        entity_store(
            "B",
            &[(0, 3, Some("ORG")), (5, 8, Some("PER")), (10, 12, Some("ORG"))],
        ),
    ]);

    let result = pairwise_agreement(
        &d,
        &FeatureId::new("Entity", "value"),
        &PercentageAgreement,
        true,
    )
    .unwrap();

    let score = result
        .score(&SourceLabel::from("A"), &SourceLabel::from("B"))
        .unwrap();
    assert!((score - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(result.pairs[0].table.total(), 3);
}
