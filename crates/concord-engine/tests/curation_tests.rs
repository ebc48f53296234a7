mod common;

use common::{entity_options, entity_store, finished_document, setup_repo};
use concord_core::errors::ExErrorKind;
use concord_core::merge::UnresolvedReason;
use concord_core::model::SourceLabel;
use concord_engine::{curate_document, diff_document, CurationOptions};
use concord_store::SetStatus;

#[test]
fn test_unanimous_document_curated_as_finished() {
    let (repo, _dir) = setup_repo();
    finished_document(
        &repo,
        "p1",
        "doc-1",
        &[
            entity_store("alice", &[(0, 4, "ORG"), (10, 15, "PER")]),
            entity_store("bob", &[(0, 4, "ORG"), (10, 15, "PER")]),
        ],
    );

    let result = curate_document(
        &repo,
        "doc-1",
        &entity_options(),
        &CurationOptions::default(),
    )
    .unwrap();

    assert_eq!(result.reference, SourceLabel::from("alice"));
    assert_eq!(result.status, SetStatus::Finished);
    let stored = repo.read_store("doc-1", &SourceLabel::curation()).unwrap();
    assert_eq!(stored, result.outcome.curated);
    assert_eq!(stored.len(), 2);
}

#[test]
fn test_conflicts_leave_curation_in_progress() {
    let (repo, _dir) = setup_repo();
    finished_document(
        &repo,
        "p1",
        "doc-1",
        &[
            entity_store("alice", &[(0, 4, "ORG"), (10, 15, "PER")]),
            entity_store("bob", &[(0, 4, "PERSON"), (10, 15, "PER")]),
        ],
    );

    let result = curate_document(
        &repo,
        "doc-1",
        &entity_options(),
        &CurationOptions {
            reference: Some(SourceLabel::from("bob")),
            merge_incomplete: false,
        },
    )
    .unwrap();

    assert_eq!(result.status, SetStatus::InProgress);
    assert_eq!(
        result
            .outcome
            .unresolved_by(UnresolvedReason::Differing)
            .count(),
        1
    );
    assert_eq!(result.outcome.curated.len(), 1);

    let sets = repo.list_sets("doc-1").unwrap();
    let curation = sets
        .iter()
        .find(|s| s.source == SourceLabel::curation())
        .unwrap();
    assert_eq!(curation.status, SetStatus::InProgress);
}

#[test]
fn test_curation_set_never_compared() {
    let (repo, _dir) = setup_repo();
    finished_document(
        &repo,
        "p1",
        "doc-1",
        &[
            entity_store("alice", &[(0, 4, "ORG")]),
            entity_store("bob", &[(0, 4, "ORG")]),
        ],
    );
    curate_document(&repo, "doc-1", &entity_options(), &CurationOptions::default()).unwrap();

    let doc = diff_document(&repo, "doc-1", &entity_options()).unwrap();
    assert!(!doc.diff.has_source(&SourceLabel::curation()));
    assert_eq!(doc.diff.sources.len(), 2);
}

#[test]
fn test_missing_reference_reported() {
    let (repo, _dir) = setup_repo();
    finished_document(
        &repo,
        "p1",
        "doc-1",
        &[entity_store("alice", &[]), entity_store("bob", &[])],
    );

    let err = curate_document(
        &repo,
        "doc-1",
        &entity_options(),
        &CurationOptions {
            reference: Some(SourceLabel::from("zed")),
            merge_incomplete: true,
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ReferenceSourceNotFound);
    assert_eq!(err.document_id(), Some("doc-1"));
    assert!(repo
        .read_store("doc-1", &SourceLabel::curation())
        .is_err());
}

#[test]
fn test_merge_incomplete_adopts_one_sided_annotation() {
    let (repo, _dir) = setup_repo();
    finished_document(
        &repo,
        "p1",
        "doc-1",
        &[
            entity_store("alice", &[(0, 4, "ORG")]),
            entity_store("bob", &[]),
        ],
    );

    let keep = curate_document(
        &repo,
        "doc-1",
        &entity_options(),
        &CurationOptions {
            reference: Some(SourceLabel::from("bob")),
            merge_incomplete: true,
        },
    )
    .unwrap();
    assert_eq!(keep.outcome.curated.len(), 1);
    assert_eq!(keep.status, SetStatus::Finished);

    let drop = curate_document(
        &repo,
        "doc-1",
        &entity_options(),
        &CurationOptions {
            reference: Some(SourceLabel::from("bob")),
            merge_incomplete: false,
        },
    )
    .unwrap();
    assert!(drop.outcome.curated.is_empty());
    assert_eq!(drop.status, SetStatus::InProgress);
}
