use concord_core::diff::{diff, DiffResult};
use concord_core::model::{
    AnnotationId, AnnotationInstance, AnnotationStore, LayerSet, LinkCompareBehavior,
};

/// Store with one `Entity` span per `(begin, end, value)`; `None` leaves the value unset
#[allow(dead_code)]
pub fn entity_store(label: &str, spans: &[(usize, usize, Option<&str>)]) -> AnnotationStore {
    let mut store = AnnotationStore::new(label);
    for (begin, end, value) in spans {
        add_entity(&mut store, *begin, *end, *value);
    }
    store
}

/// Push one `Entity` span
#[allow(dead_code)]
pub fn add_entity(
    store: &mut AnnotationStore,
    begin: usize,
    end: usize,
    value: Option<&str>,
) -> AnnotationId {
    let mut instance = AnnotationInstance::span("Entity", begin, end);
    if let Some(v) = value {
        instance = instance.with_feature("value", v);
    }
    store.push(instance)
}

/// Diff stores over the given layers with default layer settings
#[allow(dead_code)]
pub fn diff_layers(
    stores: Vec<AnnotationStore>,
    layers: &[&str],
    behavior: LinkCompareBehavior,
) -> DiffResult {
    diff(stores, LayerSet::from_names(layers.iter().copied()), behavior).unwrap()
}

/// Diff `Entity` stores, ignoring link roles
#[allow(dead_code)]
pub fn diff_entities(stores: Vec<AnnotationStore>) -> DiffResult {
    diff_layers(stores, &["Entity"], LinkCompareBehavior::TargetOnly)
}
