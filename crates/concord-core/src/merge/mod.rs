//! Curation merge.
//!
//! Turns a [`DiffResult`](crate::diff::DiffResult) into a curated store that
//! holds every annotation all sources agree on, and lists everything else for
//! manual resolution.
//!
//! ## Guarantees
//!
//! - no two curated annotations share a position
//! - every rejected set appears exactly once in `unresolved`
//! - on unanimous input the curated store equals the reference store
//!   restricted to the diffed layers

pub mod engine;
pub mod model;

pub use engine::merge;
pub use model::{MergeOutcome, MergeStats, UnresolvedReason, UnresolvedSet};
