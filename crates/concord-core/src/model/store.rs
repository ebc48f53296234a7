use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use super::annotation::{Annotation, AnnotationId, AnnotationInstance, AnnotationKind};
use super::layer::LayerSet;
use crate::errors::{ConcordError, Result};

/// Label of the source reserved for curated (merged) annotation sets
pub const CURATION_SOURCE: &str = "curation";

/// Name of one annotation source (an annotator, an automatic labeler, or curation)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceLabel(String);

impl SourceLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The curation pseudo-source
    pub fn curation() -> Self {
        Self(CURATION_SOURCE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceLabel {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SourceLabel {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One source's annotations over one document
///
/// Annotations keep their insertion order ("store order"); it is only used
/// for stable diagnostic output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationStore {
    source: SourceLabel,
    annotations: Vec<Annotation>,
}

impl AnnotationStore {
    /// Create an empty store for `source`
    pub fn new(source: impl Into<SourceLabel>) -> Self {
        Self {
            source: source.into(),
            annotations: Vec::new(),
        }
    }

    /// Create a store from existing annotations (ids are kept as given)
    pub fn with_annotations(source: impl Into<SourceLabel>, annotations: Vec<Annotation>) -> Self {
        Self {
            source: source.into(),
            annotations,
        }
    }

    pub fn source(&self) -> &SourceLabel {
        &self.source
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Next free id (one past the largest id in use)
    pub fn next_id(&self) -> AnnotationId {
        AnnotationId(
            self.annotations
                .iter()
                .map(|a| a.id.0 + 1)
                .max()
                .unwrap_or(1),
        )
    }

    /// Append an instance under a fresh id and return that id
    pub fn push(&mut self, instance: AnnotationInstance) -> AnnotationId {
        let id = self.next_id();
        self.annotations.push(Annotation::new(id, instance));
        id
    }

    /// Append an annotation keeping its id
    ///
    /// Id uniqueness is checked by [`AnnotationStore::validate`], not here.
    pub fn insert(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.annotations.iter().any(|a| a.id == id)
    }

    /// Remove and return the annotation with `id`
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let idx = self.annotations.iter().position(|a| a.id == id)?;
        Some(self.annotations.remove(idx))
    }

    /// Annotations on `layer`, in store order
    pub fn on_layer<'a>(&'a self, layer: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations
            .iter()
            .filter(move |a| a.instance.layer() == layer)
    }

    /// Copy of this store keeping only annotations on the given layers
    pub fn restricted_to(&self, layers: &LayerSet) -> Self {
        Self {
            source: self.source.clone(),
            annotations: self
                .annotations
                .iter()
                .filter(|a| layers.contains(a.instance.layer()))
                .cloned()
                .collect(),
        }
    }

    /// Same annotations under a different source label
    pub fn relabeled(mut self, source: impl Into<SourceLabel>) -> Self {
        self.source = source.into();
        self
    }

    /// Check structural well-formedness
    ///
    /// # Errors
    ///
    /// - `InvalidOffsets` when `begin > end`
    /// - `DuplicateAnnotationId` when two annotations share an id
    /// - `DanglingReference` when a relation endpoint or slot target is not a
    ///   span, or a chain successor is not a chain link on the same layer
    /// - `CyclicChain` when following `next` pointers revisits a link
    pub fn validate(&self) -> Result<()> {
        let label = self.source.as_str().to_string();
        let mut by_id: HashMap<AnnotationId, &Annotation> = HashMap::new();

        for annotation in &self.annotations {
            if let Some((begin, end)) = annotation.instance.offsets() {
                if begin > end {
                    return Err(ConcordError::InvalidOffsets {
                        label,
                        id: annotation.id.0,
                        begin,
                        end,
                    });
                }
            }
            if by_id.insert(annotation.id, annotation).is_some() {
                return Err(ConcordError::DuplicateAnnotationId {
                    label,
                    id: annotation.id.0,
                });
            }
        }

        let dangling = |id: AnnotationId, target: AnnotationId, expected: &str| {
            ConcordError::DanglingReference {
                label: label.clone(),
                id: id.0,
                target: target.0,
                expected: expected.to_string(),
            }
        };
        let is_span = |target: &AnnotationId| {
            by_id
                .get(target)
                .map(|a| a.instance.kind() == AnnotationKind::Span)
                .unwrap_or(false)
        };

        for annotation in &self.annotations {
            match &annotation.instance {
                AnnotationInstance::Relation {
                    governor,
                    dependent,
                    ..
                } => {
                    for endpoint in [governor, dependent] {
                        if !is_span(endpoint) {
                            return Err(dangling(annotation.id, *endpoint, "span"));
                        }
                    }
                }
                AnnotationInstance::ChainLink {
                    layer,
                    next: Some(next),
                    ..
                } => {
                    let ok = by_id
                        .get(next)
                        .map(|a| {
                            a.instance.kind() == AnnotationKind::ChainLink
                                && a.instance.layer() == layer
                        })
                        .unwrap_or(false);
                    if !ok {
                        return Err(dangling(annotation.id, *next, "chain link on the same layer"));
                    }
                }
                _ => {}
            }
            for value in annotation.instance.features().values() {
                if let Some(links) = value.as_links() {
                    if let Some(bad) = links.iter().find(|l| !is_span(&l.target)) {
                        return Err(dangling(annotation.id, bad.target, "span"));
                    }
                }
            }
        }

        self.check_chains_acyclic(&by_id)
    }

    fn check_chains_acyclic(&self, by_id: &HashMap<AnnotationId, &Annotation>) -> Result<()> {
        let mut cleared: HashSet<AnnotationId> = HashSet::new();
        for annotation in &self.annotations {
            if annotation.instance.kind() != AnnotationKind::ChainLink
                || cleared.contains(&annotation.id)
            {
                continue;
            }
            let mut path: BTreeSet<AnnotationId> = BTreeSet::new();
            let mut current = Some(annotation.id);
            while let Some(id) = current {
                if cleared.contains(&id) {
                    break;
                }
                if !path.insert(id) {
                    return Err(ConcordError::CyclicChain {
                        label: self.source.as_str().to_string(),
                        id: id.0,
                    });
                }
                current = match by_id.get(&id).map(|a| &a.instance) {
                    Some(AnnotationInstance::ChainLink { next, .. }) => *next,
                    _ => None,
                };
            }
            cleared.extend(path);
        }
        Ok(())
    }
}
