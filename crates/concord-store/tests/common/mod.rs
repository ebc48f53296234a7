use concord_core::model::{AnnotationInstance, AnnotationStore, SourceLabel};
use concord_store::{AnnotationRepository, SetStatus};
use tempfile::TempDir;

/// Repository on a fresh database and CAS inside a temp dir
pub fn setup_repo() -> (AnnotationRepository, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let repo = AnnotationRepository::open(dir.path().join("concord.db"), dir.path().join("cas"))
        .expect("Failed to open repository");
    (repo, dir)
}

/// Store with one `Entity` span per `(begin, end, value)`
#[allow(dead_code)]
pub fn entity_store(label: &str, spans: &[(usize, usize, &str)]) -> AnnotationStore {
    let mut store = AnnotationStore::new(label);
    for (begin, end, value) in spans {
        store.push(AnnotationInstance::span("Entity", *begin, *end).with_feature("value", *value));
    }
    store
}

/// Write `store` under its own label
#[allow(dead_code)]
pub fn put(repo: &AnnotationRepository, document_id: &str, store: &AnnotationStore, status: SetStatus) {
    let label: SourceLabel = store.source().clone();
    repo.write_store(document_id, &label, store, status)
        .expect("write_store failed");
}
