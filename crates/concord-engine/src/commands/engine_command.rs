//! Engine-level commands that require I/O (database, CAS).

use concord_core::errors::ExError;
use concord_core_types::RequestId;
use concord_store::errors::Result;
use concord_store::AnnotationRepository;

use super::agreement::{project_agreement, AgreementOptions, ProjectAgreement};
use super::curation::{curate_document, CurationOptions, CurationResult};
use super::document_diff::{diff_document, DiffOptions, DocumentDiff};

#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Diff the eligible sources of one document
    Diff {
        document_id: String,
        options: DiffOptions,
    },
    /// Merge one document and store the curation set
    Curate {
        document_id: String,
        diff: DiffOptions,
        curation: CurationOptions,
    },
    /// Agreement over every document of a project
    Agreement {
        project_id: String,
        diff: DiffOptions,
        agreement: AgreementOptions,
    },
}

#[derive(Debug, Clone)]
pub enum EngineCommandResult {
    Diff(Box<DocumentDiff>),
    Curate(Box<CurationResult>),
    Agreement(Box<ProjectAgreement>),
}

/// Apply an engine command
///
/// Every command runs in a span carrying a fresh request id, and errors
/// leave with that id attached.
pub fn apply_engine_command(
    cmd: EngineCommand,
    repo: &AnnotationRepository,
) -> Result<EngineCommandResult> {
    let request_id = RequestId::new();
    let span = tracing::info_span!("engine_command", request_id = %request_id);
    let _entered = span.enter();

    let attach = |e: ExError| e.with_request_id(request_id.clone());

    match cmd {
        EngineCommand::Diff {
            document_id,
            options,
        } => diff_document(repo, &document_id, &options)
            .map(|d| EngineCommandResult::Diff(Box::new(d)))
            .map_err(attach),
        EngineCommand::Curate {
            document_id,
            diff,
            curation,
        } => curate_document(repo, &document_id, &diff, &curation)
            .map(|r| EngineCommandResult::Curate(Box::new(r)))
            .map_err(attach),
        EngineCommand::Agreement {
            project_id,
            diff,
            agreement,
        } => project_agreement(repo, &project_id, &diff, &agreement)
            .map(|r| EngineCommandResult::Agreement(Box::new(r)))
            .map_err(attach),
    }
}
