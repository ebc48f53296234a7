//! Diff of one document's eligible sources.

use std::time::Instant;

use concord_core::diff::{diff, DiffResult};
use concord_core::errors::ExError;
use concord_core::model::{LayerSet, LinkCompareBehavior};
use concord_core::{log_op_end, log_op_start};
use concord_store::errors::Result;
use concord_store::{AnnotationRepository, SetStatus};

use super::sources::{load_eligible_stores, ExcludedSource};

/// Which sources and layers take part in a diff
#[derive(Debug, Clone)]
pub struct DiffOptions {
    pub layers: LayerSet,
    pub link_compare: LinkCompareBehavior,
    pub required_status: SetStatus,
}

impl DiffOptions {
    /// Compare `layers` across finished sets, including link roles
    pub fn new(layers: LayerSet) -> Self {
        Self {
            layers,
            link_compare: LinkCompareBehavior::IncludeRole,
            required_status: SetStatus::Finished,
        }
    }

    pub fn with_link_compare(mut self, link_compare: LinkCompareBehavior) -> Self {
        self.link_compare = link_compare;
        self
    }

    pub fn with_required_status(mut self, status: SetStatus) -> Self {
        self.required_status = status;
        self
    }
}

/// Diff of one document plus the sources left out of it
#[derive(Debug, Clone)]
pub struct DocumentDiff {
    pub document_id: String,
    pub diff: DiffResult,
    pub excluded: Vec<ExcludedSource>,
}

/// Load the eligible sources of `document_id` and diff them
///
/// Reading happens under the shared side of the project barrier.
///
/// # Errors
///
/// - `NotFound` for an unregistered document
/// - `NoEligibleSources` if no source can be read
/// - `Corrupt` if a store read by the repository fails diff-time validation
pub fn diff_document(
    repo: &AnnotationRepository,
    document_id: &str,
    options: &DiffOptions,
) -> Result<DocumentDiff> {
    let start = Instant::now();
    log_op_start!("diff_document", document_id = document_id);

    let result =
        repo.read_consistent(document_id, |repo| diff_unlocked(repo, document_id, options))?;

    let counts = result.diff.counts();
    log_op_end!(
        "diff_document",
        duration_ms = start.elapsed().as_millis() as u64,
        document_id = document_id,
        set_count = counts.total(),
        excluded_count = result.excluded.len()
    );
    Ok(result)
}

/// [`diff_document`] for callers already holding the project barrier
pub(crate) fn diff_unlocked(
    repo: &AnnotationRepository,
    document_id: &str,
    options: &DiffOptions,
) -> Result<DocumentDiff> {
    let loaded = load_eligible_stores(repo, document_id, options.required_status)?;
    let diff = diff(loaded.stores, options.layers.clone(), options.link_compare)
        .map_err(|e| ExError::from(e).with_document_id(document_id))?;
    Ok(DocumentDiff {
        document_id: document_id.to_string(),
        diff,
        excluded: loaded.excluded,
    })
}
