use concord_core::model::{AnnotationInstance, AnnotationStore, LayerSet, SourceLabel};
use concord_engine::DiffOptions;
use concord_store::{AnnotationRepository, SetStatus};
use tempfile::TempDir;

pub fn setup_repo() -> (AnnotationRepository, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let repo = AnnotationRepository::open(dir.path().join("concord.db"), dir.path().join("cas"))
        .expect("Failed to open repository");
    (repo, dir)
}

/// Store with one `Entity` span per `(begin, end, value)`
pub fn entity_store(label: &str, spans: &[(usize, usize, &str)]) -> AnnotationStore {
    let mut store = AnnotationStore::new(label);
    for (begin, end, value) in spans {
        store.push(AnnotationInstance::span("Entity", *begin, *end).with_feature("value", *value));
    }
    store
}

/// Register `document_id` in `project_id` and store every set as finished
pub fn finished_document(
    repo: &AnnotationRepository,
    project_id: &str,
    document_id: &str,
    stores: &[AnnotationStore],
) {
    repo.register_document(project_id, document_id, &format!("{}.txt", document_id))
        .expect("register_document failed");
    for store in stores {
        let label: SourceLabel = store.source().clone();
        repo.write_store(document_id, &label, store, SetStatus::Finished)
            .expect("write_store failed");
    }
}

pub fn entity_options() -> DiffOptions {
    DiffOptions::new(LayerSet::from_names(["Entity"]))
}
