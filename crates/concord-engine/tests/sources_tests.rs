mod common;

use common::{entity_options, entity_store, finished_document, setup_repo};
use concord_core::errors::ExErrorKind;
use concord_core::logging_facility::test_capture::init_test_capture;
use concord_core::model::SourceLabel;
use concord_engine::{diff_document, load_eligible_stores};
use concord_store::SetStatus;

/// Point the set of `source` at a blob that does not exist
fn break_source(repo: &concord_store::AnnotationRepository, document_id: &str, source: &str) {
    repo.connection()
        .execute(
            "UPDATE annotation_sets SET digest = ?3 WHERE document_id = ?1 AND source = ?2",
            rusqlite::params![document_id, source, "0".repeat(64)],
        )
        .unwrap();
}

#[test]
fn test_unreadable_source_excluded_not_absent() {
    let capture = init_test_capture();
    let (repo, _dir) = setup_repo();
    finished_document(
        &repo,
        "p1",
        "doc-unreadable",
        &[
            entity_store("alice", &[(0, 4, "ORG")]),
            entity_store("bob", &[(0, 4, "ORG")]),
            entity_store("carol", &[(0, 4, "PER")]),
        ],
    );
    break_source(&repo, "doc-unreadable", "carol");

    let loaded = load_eligible_stores(&repo, "doc-unreadable", SetStatus::Finished).unwrap();
    assert_eq!(
        loaded.labels(),
        vec![&SourceLabel::from("alice"), &SourceLabel::from("bob")]
    );
    assert_eq!(loaded.excluded.len(), 1);
    assert_eq!(loaded.excluded[0].source, SourceLabel::from("carol"));
    assert_eq!(loaded.excluded[0].error.kind(), ExErrorKind::UnreadableSource);
    assert_eq!(
        loaded.excluded[0].error.source_error().map(|e| e.kind()),
        Some(ExErrorKind::Corrupt)
    );

    // carol does not turn the set incomplete
    let doc = diff_document(&repo, "doc-unreadable", &entity_options()).unwrap();
    assert!(doc.diff.is_unanimous());

    let warnings = capture.count_events(|e| {
        e.level == tracing::Level::WARN && e.field("err_code") == Some("ERR_UNREADABLE_SOURCE")
    });
    assert!(warnings >= 1);
}

#[test]
fn test_no_eligible_sources() {
    let (repo, _dir) = setup_repo();
    repo.register_document("p1", "doc-1", "doc-1.txt").unwrap();
    repo.write_store(
        "doc-1",
        &SourceLabel::from("alice"),
        &entity_store("alice", &[]),
        SetStatus::InProgress,
    )
    .unwrap();

    let err = load_eligible_stores(&repo, "doc-1", SetStatus::Finished).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NoEligibleSources);
    assert_eq!(err.document_id(), Some("doc-1"));
    assert!(err.message().contains("finished"));
}

#[test]
fn test_all_sources_unreadable_lists_them() {
    let (repo, _dir) = setup_repo();
    finished_document(
        &repo,
        "p1",
        "doc-1",
        &[entity_store("alice", &[]), entity_store("bob", &[])],
    );
    break_source(&repo, "doc-1", "alice");
    break_source(&repo, "doc-1", "bob");

    let err = load_eligible_stores(&repo, "doc-1", SetStatus::Finished).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NoEligibleSources);
    assert_eq!(
        err.sources(),
        Some(&["alice".to_string(), "bob".to_string()][..])
    );
}

#[test]
fn test_required_status_selects_sources() {
    let (repo, _dir) = setup_repo();
    finished_document(&repo, "p1", "doc-1", &[entity_store("alice", &[(0, 4, "ORG")])]);
    repo.write_store(
        "doc-1",
        &SourceLabel::from("bob"),
        &entity_store("bob", &[(0, 4, "PER")]),
        SetStatus::InProgress,
    )
    .unwrap();

    let finished = diff_document(&repo, "doc-1", &entity_options()).unwrap();
    assert_eq!(finished.diff.sources, vec![SourceLabel::from("alice")]);

    let in_progress = diff_document(
        &repo,
        "doc-1",
        &entity_options().with_required_status(SetStatus::InProgress),
    )
    .unwrap();
    assert_eq!(in_progress.diff.sources, vec![SourceLabel::from("bob")]);
}

#[test]
fn test_unknown_document_is_not_found() {
    let (repo, _dir) = setup_repo();
    let err = diff_document(&repo, "ghost", &entity_options()).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}
