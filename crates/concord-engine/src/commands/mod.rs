//! Command orchestration layer.
//!
//! Each command reads what it needs from an
//! [`AnnotationRepository`](concord_store::AnnotationRepository), runs the
//! core computation and, for curation, persists the result.

pub mod agreement;
pub mod curation;
pub mod document_diff;
pub mod engine_command;
pub mod sources;
