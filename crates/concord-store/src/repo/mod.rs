//! Repository over documents, annotation sets and codebooks
//!
//! SQLite holds the metadata rows; annotation set content is stored as JSON
//! blobs in the CAS and referenced by digest.

mod annotation_repo;
mod codebooks;

pub use annotation_repo::{AnnotationRepository, AnnotationSetInfo, DocumentInfo};
pub use codebooks::{Codebook, CodebookOrdinals};
