//! Project-wide agreement: per-document tables computed in parallel and
//! summed per source pair.

use std::time::Instant;

use concord_core::agreement::{
    check_measure_configuration, combine, measure_by_name, pairwise_agreement, FeatureId,
    PairwiseAgreementResult,
};
use concord_core::errors::{ExError, ExErrorKind};
use concord_core::{log_op_end, log_op_error, log_op_start};
use concord_store::errors::Result;
use concord_store::AnnotationRepository;
use rayon::prelude::*;

use super::document_diff::{diff_document, DiffOptions, DocumentDiff};
use super::sources::ExcludedSource;

#[derive(Debug, Clone)]
pub struct AgreementOptions {
    pub feature: FeatureId,
    /// Measure name as accepted by [`measure_by_name`]
    pub measure: String,
    pub exclude_incomplete: bool,
}

/// A document that contributed nothing, with the reason
#[derive(Debug, Clone)]
pub struct SkippedDocument {
    pub document_id: String,
    pub error: ExError,
}

#[derive(Debug, Clone)]
pub struct ProjectAgreement {
    pub project_id: String,
    /// Tables summed over all contributing documents; `None` if none contributed
    pub combined: Option<PairwiseAgreementResult>,
    /// One result per contributing document, in document order
    pub per_document: Vec<PairwiseAgreementResult>,
    pub skipped: Vec<SkippedDocument>,
    /// Unreadable sources per document
    pub excluded: Vec<(String, ExcludedSource)>,
}

/// Agreement on one feature over every document of `project_id`
///
/// Documents without eligible sources are skipped and reported. Stores are
/// read sequentially; the per-document tables are built in parallel.
///
/// # Errors
///
/// - `InvalidInput` for an unknown measure name
/// - `UnsupportedMeasureConfiguration`, before any document is read
/// - store errors other than `NoEligibleSources`
pub fn project_agreement(
    repo: &AnnotationRepository,
    project_id: &str,
    diff_options: &DiffOptions,
    options: &AgreementOptions,
) -> Result<ProjectAgreement> {
    let start = Instant::now();
    log_op_start!(
        "project_agreement",
        project_id = project_id,
        feature = %options.feature,
        measure = options.measure.as_str()
    );

    let fail = |e: ExError| {
        log_op_error!(
            "project_agreement",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            project_id = project_id
        );
        e
    };

    let measure = measure_by_name(&options.measure).map_err(|e| fail(e.into()))?;
    check_measure_configuration(measure.as_ref(), options.exclude_incomplete)
        .map_err(|e| fail(e.into()))?;

    let documents = repo.list_documents(project_id).map_err(fail)?;

    let mut diffs: Vec<DocumentDiff> = Vec::with_capacity(documents.len());
    let mut skipped = Vec::new();
    for doc in &documents {
        match diff_document(repo, &doc.document_id, diff_options) {
            Ok(d) => diffs.push(d),
            Err(e) if e.kind() == ExErrorKind::NoEligibleSources => {
                tracing::info!(
                    project_id,
                    document_id = %doc.document_id,
                    "Skipping document without eligible sources"
                );
                skipped.push(SkippedDocument {
                    document_id: doc.document_id.clone(),
                    error: e,
                });
            }
            Err(e) => return Err(fail(e)),
        }
    }

    let per_document = diffs
        .par_iter()
        .map(|d| {
            pairwise_agreement(
                &d.diff,
                &options.feature,
                measure.as_ref(),
                options.exclude_incomplete,
            )
            .map(|r| r.with_document(&d.document_id))
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| fail(e.into()))?;

    let combined = combine(per_document.clone(), measure.as_ref()).map_err(|e| fail(e.into()))?;

    let excluded = diffs
        .into_iter()
        .flat_map(|d| {
            let document_id = d.document_id;
            d.excluded
                .into_iter()
                .map(move |x| (document_id.clone(), x))
        })
        .collect();

    log_op_end!(
        "project_agreement",
        duration_ms = start.elapsed().as_millis() as u64,
        project_id = project_id,
        document_count = per_document.len(),
        skipped_count = skipped.len()
    );

    Ok(ProjectAgreement {
        project_id: project_id.to_string(),
        combined,
        per_document,
        skipped,
        excluded,
    })
}
