//! Concord Engine - Orchestration layer
//!
//! Coordinates the pure diff/agreement/merge core with the store: selects
//! eligible sources, reads them under the project barrier, and writes
//! curated sets back.

pub mod commands;

pub use commands::agreement::{
    project_agreement, AgreementOptions, ProjectAgreement, SkippedDocument,
};
pub use commands::curation::{curate_document, CurationOptions, CurationResult};
pub use commands::document_diff::{diff_document, DiffOptions, DocumentDiff};
pub use commands::engine_command::{apply_engine_command, EngineCommand, EngineCommandResult};
pub use commands::sources::{
    load_eligible_stores, ExcludedSource, ExclusionReport, LoadedSources,
};
