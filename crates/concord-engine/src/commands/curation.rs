//! Curation: merge the eligible sources of a document and store the result
//! as the document's curation set.

use std::time::Instant;

use concord_core::errors::{ConcordError, ExError};
use concord_core::merge::{merge, MergeOutcome};
use concord_core::model::SourceLabel;
use concord_core::{log_op_end, log_op_error, log_op_start};
use concord_store::errors::Result;
use concord_store::{AnnotationRepository, SetStatus};

use super::document_diff::{diff_unlocked, DiffOptions};
use super::sources::ExcludedSource;

#[derive(Debug, Clone, Default)]
pub struct CurationOptions {
    /// Source whose choices win where no other rule applies; `None` picks the
    /// first diffed source in label order
    pub reference: Option<SourceLabel>,
    /// Adopt annotations that only some sources made
    pub merge_incomplete: bool,
}

#[derive(Debug, Clone)]
pub struct CurationResult {
    pub document_id: String,
    pub reference: SourceLabel,
    pub outcome: MergeOutcome,
    /// Digest of the stored curation set
    pub digest: String,
    /// `Finished` when nothing was left unresolved, `InProgress` otherwise
    pub status: SetStatus,
    pub excluded: Vec<ExcludedSource>,
}

/// Diff, merge and persist the curated set of `document_id`
///
/// The read, the merge and the write all happen under the shared side of the
/// project barrier, so a bulk rewrite cannot slip in between them.
///
/// # Errors
///
/// - everything [`diff_document`](super::document_diff::diff_document) reports
/// - `ReferenceSourceNotFound` if the reference is not among the diffed sources
/// - store errors from writing the curated set
pub fn curate_document(
    repo: &AnnotationRepository,
    document_id: &str,
    diff_options: &DiffOptions,
    options: &CurationOptions,
) -> Result<CurationResult> {
    let start = Instant::now();
    log_op_start!(
        "curate_document",
        document_id = document_id,
        merge_incomplete = options.merge_incomplete
    );

    let result = repo.read_consistent(document_id, |repo| {
        let doc = diff_unlocked(repo, document_id, diff_options)?;
        let reference = match &options.reference {
            Some(reference) => reference.clone(),
            None => doc.diff.sources.first().cloned().ok_or_else(|| {
                ExError::from(ConcordError::NoEligibleSources {
                    document_id: document_id.to_string(),
                    required_status: diff_options.required_status.to_string(),
                })
            })?,
        };

        let outcome = merge(&doc.diff, &reference, options.merge_incomplete)
            .map_err(|e| ExError::from(e).with_document_id(document_id))?;

        let status = if outcome.is_fully_resolved() {
            SetStatus::Finished
        } else {
            SetStatus::InProgress
        };
        let digest =
            repo.write_store(document_id, &SourceLabel::curation(), &outcome.curated, status)?;

        Ok(CurationResult {
            document_id: document_id.to_string(),
            reference,
            outcome,
            digest,
            status,
            excluded: doc.excluded,
        })
    });

    match result {
        Ok(result) => {
            log_op_end!(
                "curate_document",
                duration_ms = start.elapsed().as_millis() as u64,
                document_id = document_id,
                unresolved_count = result.outcome.unresolved.len(),
                status = %result.status
            );
            Ok(result)
        }
        Err(e) => {
            log_op_error!(
                "curate_document",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                document_id = document_id
            );
            Err(e)
        }
    }
}
