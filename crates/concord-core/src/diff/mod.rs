//! Cross-source annotation diff.
//!
//! Aligns the annotations of several sources over one document by position
//! and classifies every resulting set.
//!
//! ## Entry point
//!
//! ```ignore
//! use concord_core::diff::{diff, render_human_summary};
//!
//! let result = diff(stores, layers, LinkCompareBehavior::IncludeRole)?;
//! println!("{}", render_human_summary(&result));
//! ```
//!
//! ## Guarantees
//!
//! - **Completeness**: every annotation on a requested layer is in exactly one
//!   base set; every link of a compared slot feature is in exactly one slot set.
//! - **Determinism**: sets are sorted by position, configurations by
//!   (source, store order).
//! - **Stacking is visible**: several annotations of one source at one position
//!   stay separate and make the set `Differing`.

pub mod aligner;
pub mod classifier;
pub mod engine;
pub mod human_summary;
pub mod model;
pub mod position;

pub use aligner::align;
pub use classifier::classify;
pub use engine::diff;
pub use human_summary::render_human_summary;
pub use model::{
    ClassificationCounts, Configuration, ConfigurationSet, DiffResult, SetClassification, SlotRef,
};
pub use position::{position_of, slot_positions_of, Position, SpanKey, StoreIndex};
