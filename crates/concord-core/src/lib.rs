//! Concord Core - cross-source annotation diff, agreement and curation merge
//!
//! Pure, synchronous computations over in-memory annotation stores:
//! - Annotation model (spans, relations, chain links, slot features)
//! - Position-based alignment of several sources into configuration sets
//! - Unanimous / differing / incomplete classification
//! - Pairwise inter-annotator agreement with pluggable measures
//! - Deterministic curation merge with unresolved-set reporting
//! - Per-project ordinal swaps
//!
//! Nothing here performs I/O; reading and writing stores is the job of
//! `concord-store`.

pub mod agreement;
pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod merge;
pub mod model;
pub mod ordering;

// Re-export commonly used types
pub use agreement::{pairwise_agreement, AgreementMeasure, FeatureId, PairwiseAgreementResult};
pub use diff::{diff, DiffResult, Position, SetClassification};
pub use errors::{ConcordError, ExError, ExErrorKind, Result};
pub use merge::{merge, MergeOutcome, UnresolvedReason};
pub use model::{
    AnnotationId, AnnotationInstance, AnnotationStore, FeatureValue, LayerSet, LayerSpec,
    LinkCompareBehavior, SourceLabel,
};
