//! Eligible-source loading with recovery of unreadable sources.

use std::time::Instant;

use concord_core::errors::{ConcordError, ExError};
use concord_core::model::{AnnotationStore, SourceLabel};
use concord_core::{log_op_end, log_op_error, log_op_start};
use concord_store::errors::Result;
use concord_store::{AnnotationRepository, SetStatus};
use serde::Serialize;

/// A source that was eligible but could not be read
#[derive(Debug, Clone)]
pub struct ExcludedSource {
    pub source: SourceLabel,
    pub error: ExError,
}

/// Stores read for one document
#[derive(Debug, Clone)]
pub struct LoadedSources {
    pub document_id: String,
    pub stores: Vec<AnnotationStore>,
    pub excluded: Vec<ExcludedSource>,
}

impl LoadedSources {
    pub fn labels(&self) -> Vec<&SourceLabel> {
        self.stores.iter().map(AnnotationStore::source).collect()
    }
}

/// Per-source exclusion as reported to users
#[derive(Debug, Clone, Serialize)]
pub struct ExclusionReport {
    pub source: String,
    pub code: &'static str,
    pub message: String,
}

impl From<&ExcludedSource> for ExclusionReport {
    fn from(excluded: &ExcludedSource) -> Self {
        Self {
            source: excluded.source.to_string(),
            code: excluded.error.code(),
            message: excluded.error.message().to_string(),
        }
    }
}

/// Read every source of `document_id` whose set has `required_status`
///
/// A source whose set is missing or corrupt is excluded with a warning and
/// reported in [`LoadedSources::excluded`]; it never enters the diff as an
/// absent source.
///
/// # Errors
///
/// - `NoEligibleSources` if no readable source remains
/// - store errors other than per-source read failures
pub fn load_eligible_stores(
    repo: &AnnotationRepository,
    document_id: &str,
    required_status: SetStatus,
) -> Result<LoadedSources> {
    let start = Instant::now();
    log_op_start!(
        "load_eligible_stores",
        document_id = document_id,
        required_status = %required_status
    );

    let labels = repo
        .list_sources_with_status(document_id, required_status)
        .map_err(|e| {
            log_op_error!(
                "load_eligible_stores",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

    let mut stores = Vec::with_capacity(labels.len());
    let mut excluded = Vec::new();
    for label in labels {
        match repo.read_store(document_id, &label) {
            Ok(store) => stores.push(store),
            Err(e) => {
                let error = ExError::from(ConcordError::UnreadableSource {
                    document_id: document_id.to_string(),
                    label: label.to_string(),
                    reason: e.message().to_string(),
                })
                .with_op("load_eligible_stores")
                .with_source(e);
                tracing::warn!(
                    document_id,
                    source = %label,
                    err_code = error.code(),
                    cause_code = error.source_error().map(|c| c.code()).unwrap_or_default(),
                    "Excluding unreadable annotation set"
                );
                excluded.push(ExcludedSource {
                    source: label,
                    error,
                });
            }
        }
    }

    if stores.is_empty() {
        let err = ExError::from(ConcordError::NoEligibleSources {
            document_id: document_id.to_string(),
            required_status: required_status.to_string(),
        })
        .with_op("load_eligible_stores")
        .with_sources(excluded.iter().map(|e| e.source.to_string()).collect());
        log_op_error!(
            "load_eligible_stores",
            err.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        return Err(err);
    }

    log_op_end!(
        "load_eligible_stores",
        duration_ms = start.elapsed().as_millis() as u64,
        source_count = stores.len(),
        excluded_count = excluded.len()
    );

    Ok(LoadedSources {
        document_id: document_id.to_string(),
        stores,
        excluded,
    })
}
