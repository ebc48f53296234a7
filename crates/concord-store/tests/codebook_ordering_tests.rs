mod common;

use common::setup_repo;
use concord_core::errors::ExErrorKind;
use concord_core::ordering::ProjectOrderLocks;
use concord_store::AnnotationRepository;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn test_codebooks_append_in_order() {
    let (repo, _dir) = setup_repo();
    repo.add_codebook("p1", "sentiment").unwrap();
    repo.add_codebook("p1", "topic").unwrap();
    repo.add_codebook("p2", "other").unwrap();

    let listed: Vec<(String, u32)> = repo
        .list_codebooks("p1")
        .unwrap()
        .into_iter()
        .map(|c| (c.name, c.ordinal))
        .collect();
    assert_eq!(
        listed,
        vec![("sentiment".to_string(), 0), ("topic".to_string(), 1)]
    );
    assert_eq!(repo.list_codebooks("p2").unwrap()[0].ordinal, 0);
}

#[test]
fn test_duplicate_codebook_rejected() {
    let (repo, _dir) = setup_repo();
    repo.add_codebook("p1", "sentiment").unwrap();
    let err = repo.add_codebook("p1", "sentiment").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::AlreadyExists);
}

#[test]
fn test_swap_persists_in_sqlite() {
    let (repo, _dir) = setup_repo();
    let locks = ProjectOrderLocks::new();
    repo.add_codebook("p1", "sentiment").unwrap();
    repo.add_codebook("p1", "topic").unwrap();

    let swapped = repo
        .swap_codebook_ordinals(&locks, "p1", "sentiment", "topic")
        .unwrap();
    assert_eq!(swapped, (1, 0));

    let names: Vec<String> = repo
        .list_codebooks("p1")
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["topic", "sentiment"]);
}

#[test]
fn test_swap_with_unknown_codebook_changes_nothing() {
    let (repo, _dir) = setup_repo();
    let locks = ProjectOrderLocks::new();
    repo.add_codebook("p1", "sentiment").unwrap();

    let err = repo
        .swap_codebook_ordinals(&locks, "p1", "sentiment", "ghost")
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert_eq!(repo.list_codebooks("p1").unwrap()[0].ordinal, 0);
}

#[test]
fn test_concurrent_swaps_never_duplicate_ordinals() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("concord.db");
    let cas_root = dir.path().join("cas");
    {
        let repo = AnnotationRepository::open(&db_path, &cas_root).unwrap();
        for name in ["a", "b", "c", "d"] {
            repo.add_codebook("p1", name).unwrap();
        }
    }

    let locks = Arc::new(ProjectOrderLocks::new());
    let pairs = [("a", "b"), ("b", "c"), ("c", "d"), ("d", "a"), ("a", "c"), ("b", "d")];
    let handles: Vec<_> = pairs
        .iter()
        .map(|(x, y)| {
            let locks = Arc::clone(&locks);
            let db_path = db_path.clone();
            let cas_root = cas_root.clone();
            let (x, y) = (x.to_string(), y.to_string());
            thread::spawn(move || {
                let repo = AnnotationRepository::open(&db_path, &cas_root).unwrap();
                for _ in 0..5 {
                    repo.swap_codebook_ordinals(&locks, "p1", &x, &y).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let repo = AnnotationRepository::open(&db_path, &cas_root).unwrap();
    let ordinals: BTreeSet<u32> = repo
        .list_codebooks("p1")
        .unwrap()
        .into_iter()
        .map(|c| c.ordinal)
        .collect();
    assert_eq!(ordinals, BTreeSet::from([0, 1, 2, 3]));
}
