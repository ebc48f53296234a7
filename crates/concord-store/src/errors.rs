//! Error handling for concord-store
//!
//! Wraps concord-core ExError with store-specific helpers

use concord_core::errors::{ExError, ExErrorKind};
use concord_core::model::SourceLabel;
use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Why a stored annotation set could not be turned back into a store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorruptReason {
    #[error("blob {digest} is missing from the content store")]
    BlobMissing { digest: String },

    #[error("blob {digest} is not a valid annotation set: {message}")]
    Undecodable { digest: String, message: String },

    #[error("annotation set fails validation: {message}")]
    Invalid { message: String },

    #[error("blob belongs to source {found}")]
    SourceMismatch { found: String },
}

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error for an already applied migration
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Corrupt)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, expected, actual
        ))
}

/// Create a CAS collision error
pub fn cas_collision(digest: &str) -> ExError {
    ExError::new(ExErrorKind::Corrupt)
        .with_op("cas_write")
        .with_message(format!("CAS collision for digest {}", digest))
}

/// Create a CAS missing blob error
pub fn cas_missing(digest: &str) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_op("cas_read")
        .with_message(format!("CAS blob not found for digest {}", digest))
}

/// Annotation set of `source` for `document_id` exists but cannot be used
pub fn corrupt_store(document_id: &str, source: &SourceLabel, reason: CorruptReason) -> ExError {
    ExError::new(ExErrorKind::Corrupt)
        .with_op("read_store")
        .with_document_id(document_id)
        .with_source_label(source.as_str())
        .with_message(reason.to_string())
}

/// No annotation set of `source` for `document_id`
pub fn store_not_found(document_id: &str, source: &SourceLabel) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_op("read_store")
        .with_document_id(document_id)
        .with_source_label(source.as_str())
        .with_message(format!(
            "No annotation set of {} for document {}",
            source, document_id
        ))
}

/// Document is not registered
pub fn document_not_found(op: &str, document_id: &str) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_op(op.to_string())
        .with_document_id(document_id)
        .with_message(format!("Document {} is not registered", document_id))
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Create a serialization error
pub fn serialization_error(operation: &str, err: serde_json::Error) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Create an error for a poisoned project barrier or cache
pub fn poisoned(what: &str, project_id: &str) -> ExError {
    ExError::new(ExErrorKind::Concurrency)
        .with_op(what.to_string())
        .with_message(format!("{} for project {} is poisoned", what, project_id))
}
