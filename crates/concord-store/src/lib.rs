//! Concord Store - persistence collaborator of the diff engine
//!
//! Provides:
//! - SQLite schema with a checksummed migrations framework
//! - Content-addressable storage (CAS) for serialized annotation sets
//! - [`repo::AnnotationRepository`]: documents, per-source annotation sets
//!   with status, codebook ordinals
//! - [`cache::DocumentCache`] and the project-scoped [`barrier::ProjectBarrier`]
//!   that keeps diff reads consistent with bulk rewrites

pub mod barrier;
pub mod cache;
pub mod cas;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;
pub mod status;

// Re-export key types
pub use errors::Result;
pub use repo::{AnnotationRepository, AnnotationSetInfo, Codebook, DocumentInfo};
pub use status::SetStatus;
