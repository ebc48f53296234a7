//! Annotation model: the closed set of annotation kinds, their feature
//! values, per-source stores, and layer comparison settings.

pub mod annotation;
pub mod layer;
pub mod store;

pub use annotation::{
    Annotation, AnnotationId, AnnotationInstance, AnnotationKind, FeatureMap, FeatureValue, Link,
    LinkRef, SpanRef,
};
pub use layer::{LayerSet, LayerSpec, LinkCompareBehavior};
pub use store::{AnnotationStore, SourceLabel, CURATION_SOURCE};
