//! Diff computation entry point.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::diff::aligner::align;
use crate::diff::model::DiffResult;
use crate::errors::{ConcordError, Result};
use crate::model::{AnnotationStore, LayerSet, LinkCompareBehavior, SourceLabel};
use crate::{log_op_end, log_op_error, log_op_start};

/// Align several sources' annotation stores over one document
///
/// Stores are validated first; alignment and classification themselves never
/// fail. An empty input yields an empty result: deciding whether "no sources"
/// is an error belongs to whoever selected the sources.
///
/// # Errors
///
/// - `DuplicateSource` if two stores carry the same label
/// - any validation error of [`AnnotationStore::validate`]
pub fn diff(
    stores: Vec<AnnotationStore>,
    layers: LayerSet,
    link_compare: LinkCompareBehavior,
) -> Result<DiffResult> {
    let start = Instant::now();
    log_op_start!("diff", source_count = stores.len());

    match build(stores, layers, link_compare) {
        Ok(result) => {
            let counts = result.counts();
            log_op_end!(
                "diff",
                duration_ms = start.elapsed().as_millis() as u64,
                set_count = result.sets.len(),
                unanimous = counts.unanimous,
                differing = counts.differing,
                incomplete = counts.incomplete
            );
            Ok(result)
        }
        Err(err) => {
            log_op_error!(
                "diff",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            Err(err)
        }
    }
}

fn build(
    stores: Vec<AnnotationStore>,
    layers: LayerSet,
    link_compare: LinkCompareBehavior,
) -> Result<DiffResult> {
    let mut by_label: BTreeMap<SourceLabel, AnnotationStore> = BTreeMap::new();
    for store in stores {
        store.validate()?;
        let label = store.source().clone();
        if by_label.contains_key(&label) {
            return Err(ConcordError::DuplicateSource {
                label: label.as_str().to_string(),
            });
        }
        by_label.insert(label, store);
    }

    let ordered: Vec<AnnotationStore> = by_label.values().cloned().collect();
    let sets = align(&ordered, &layers, link_compare);

    Ok(DiffResult {
        sources: by_label.keys().cloned().collect(),
        layers,
        link_compare,
        sets,
        stores: by_label,
    })
}
