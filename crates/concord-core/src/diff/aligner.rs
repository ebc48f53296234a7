//! Alignment of annotations from several sources into configuration sets.

use std::collections::BTreeMap;

use crate::diff::model::{Configuration, ConfigurationSet, SlotRef};
use crate::diff::position::{position_of, slot_positions_of, Position, StoreIndex};
use crate::model::{Annotation, AnnotationStore, FeatureValue, LayerSet, LayerSpec, LinkCompareBehavior};

/// Group the annotations of all stores on the requested layers by position
///
/// Produces one set per distinct position seen in any source, singletons
/// included, sorted by position. Within a set configurations are ordered by
/// (source label, store order). Stacked annotations stay separate.
pub fn align(
    stores: &[AnnotationStore],
    layers: &LayerSet,
    behavior: LinkCompareBehavior,
) -> Vec<ConfigurationSet> {
    let mut by_position: BTreeMap<Position, Vec<Configuration>> = BTreeMap::new();

    let mut ordered: Vec<&AnnotationStore> = stores.iter().collect();
    ordered.sort_by(|a, b| a.source().cmp(b.source()));

    for store in ordered {
        let index = StoreIndex::new(store);
        for (store_order, annotation) in store.annotations().iter().enumerate() {
            let Some(spec) = layers.get(annotation.instance.layer()) else {
                continue;
            };
            let Some(position) = position_of(annotation, &index) else {
                tracing::warn!(
                    source = %store.source(),
                    annotation = %annotation.id,
                    "relation endpoint does not resolve to a span; annotation skipped"
                );
                continue;
            };

            for slot in slot_positions_of(annotation, &position, &index, behavior, |f| {
                spec.compares(f)
            }) {
                by_position
                    .entry(slot.position)
                    .or_default()
                    .push(Configuration {
                        source: store.source().clone(),
                        annotation_id: annotation.id,
                        store_order,
                        slot: Some(SlotRef {
                            feature: slot.feature,
                            link_index: slot.link_index,
                        }),
                        values: BTreeMap::new(),
                    });
            }

            by_position.entry(position).or_default().push(Configuration {
                source: store.source().clone(),
                annotation_id: annotation.id,
                store_order,
                slot: None,
                values: compared_values(annotation, spec),
            });
        }
    }

    let sets: Vec<ConfigurationSet> = by_position
        .into_iter()
        .map(|(position, configurations)| ConfigurationSet {
            position,
            configurations,
        })
        .collect();

    for set in &sets {
        let allows = layers
            .get(set.layer())
            .map(|spec| spec.allow_stacking)
            .unwrap_or(false);
        if set.is_stacked() && !allows {
            tracing::warn!(
                position = %set.position,
                "stacked annotations on a layer that does not allow stacking"
            );
        }
    }

    sets
}

/// Primitive feature values that take part in comparison
///
/// Slot features are compared through their own slot positions, and `Null`
/// is dropped so that an explicit null equals an unset feature.
pub fn compared_values(annotation: &Annotation, spec: &LayerSpec) -> BTreeMap<String, FeatureValue> {
    annotation
        .instance
        .features()
        .iter()
        .filter(|(name, value)| !value.is_links() && !value.is_null() && spec.compares(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
