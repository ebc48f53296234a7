use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Identity of an annotation inside one store
///
/// Ids are only meaningful within the store that issued them; cross-source
/// comparison always goes through positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub u64);

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference from a relation or slot to a span in the same store
pub type SpanRef = AnnotationId;

/// Reference from a chain link to the next link of its chain
pub type LinkRef = AnnotationId;

/// Feature values keyed by feature name
pub type FeatureMap = BTreeMap<String, FeatureValue>;

/// One filler of a slot feature
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    pub role: String,
    pub target: SpanRef,
}

impl Link {
    pub fn new(role: impl Into<String>, target: SpanRef) -> Self {
        Self {
            role: role.into(),
            target,
        }
    }
}

/// Value of a single annotation feature
///
/// Floats are ordered and compared with `f64::total_cmp`, which makes the
/// whole type `Eq + Ord` and usable as a contingency-table category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FeatureValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Links(Vec<Link>),
}

impl FeatureValue {
    fn rank(&self) -> u8 {
        match self {
            FeatureValue::Null => 0,
            FeatureValue::Bool(_) => 1,
            FeatureValue::Int(_) => 2,
            FeatureValue::Float(_) => 3,
            FeatureValue::Str(_) => 4,
            FeatureValue::Links(_) => 5,
        }
    }

    /// True for the `Null` primitive
    pub fn is_null(&self) -> bool {
        matches!(self, FeatureValue::Null)
    }

    /// True for slot (link list) values
    pub fn is_links(&self) -> bool {
        matches!(self, FeatureValue::Links(_))
    }

    /// The link list of a slot value
    pub fn as_links(&self) -> Option<&[Link]> {
        match self {
            FeatureValue::Links(links) => Some(links),
            _ => None,
        }
    }

    /// The string payload of a `Str` value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for FeatureValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FeatureValue {}

impl PartialOrd for FeatureValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FeatureValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FeatureValue::Null, FeatureValue::Null) => Ordering::Equal,
            (FeatureValue::Bool(a), FeatureValue::Bool(b)) => a.cmp(b),
            (FeatureValue::Int(a), FeatureValue::Int(b)) => a.cmp(b),
            (FeatureValue::Float(a), FeatureValue::Float(b)) => a.total_cmp(b),
            (FeatureValue::Str(a), FeatureValue::Str(b)) => a.cmp(b),
            (FeatureValue::Links(a), FeatureValue::Links(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for FeatureValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            FeatureValue::Null => {}
            FeatureValue::Bool(b) => b.hash(state),
            FeatureValue::Int(i) => i.hash(state),
            FeatureValue::Float(f) => f.to_bits().hash(state),
            FeatureValue::Str(s) => s.hash(state),
            FeatureValue::Links(links) => links.hash(state),
        }
    }
}

impl std::fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureValue::Null => write!(f, "null"),
            FeatureValue::Bool(b) => write!(f, "{}", b),
            FeatureValue::Int(i) => write!(f, "{}", i),
            FeatureValue::Float(x) => write!(f, "{}", x),
            FeatureValue::Str(s) => write!(f, "{}", s),
            FeatureValue::Links(links) => {
                let parts: Vec<String> = links
                    .iter()
                    .map(|l| format!("{}->{}", l.role, l.target))
                    .collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<&str> for FeatureValue {
    fn from(s: &str) -> Self {
        FeatureValue::Str(s.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(s: String) -> Self {
        FeatureValue::Str(s)
    }
}

impl From<i64> for FeatureValue {
    fn from(i: i64) -> Self {
        FeatureValue::Int(i)
    }
}

impl From<bool> for FeatureValue {
    fn from(b: bool) -> Self {
        FeatureValue::Bool(b)
    }
}

impl From<f64> for FeatureValue {
    fn from(x: f64) -> Self {
        FeatureValue::Float(x)
    }
}

/// Discriminant of [`AnnotationInstance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Span,
    Relation,
    ChainLink,
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AnnotationKind::Span => "span",
            AnnotationKind::Relation => "relation",
            AnnotationKind::ChainLink => "chain link",
        };
        write!(f, "{}", name)
    }
}

/// One annotation as produced by one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnnotationInstance {
    Span {
        layer: String,
        begin: usize,
        end: usize,
        #[serde(default)]
        features: FeatureMap,
    },
    Relation {
        layer: String,
        governor: SpanRef,
        dependent: SpanRef,
        #[serde(default)]
        features: FeatureMap,
    },
    ChainLink {
        layer: String,
        begin: usize,
        end: usize,
        #[serde(default)]
        next: Option<LinkRef>,
        #[serde(default)]
        features: FeatureMap,
    },
}

impl AnnotationInstance {
    /// Span on `layer` covering `begin..end` with no features
    pub fn span(layer: impl Into<String>, begin: usize, end: usize) -> Self {
        AnnotationInstance::Span {
            layer: layer.into(),
            begin,
            end,
            features: FeatureMap::new(),
        }
    }

    /// Relation on `layer` between two spans of the same store
    pub fn relation(layer: impl Into<String>, governor: SpanRef, dependent: SpanRef) -> Self {
        AnnotationInstance::Relation {
            layer: layer.into(),
            governor,
            dependent,
            features: FeatureMap::new(),
        }
    }

    /// Chain link on `layer`
    pub fn chain_link(
        layer: impl Into<String>,
        begin: usize,
        end: usize,
        next: Option<LinkRef>,
    ) -> Self {
        AnnotationInstance::ChainLink {
            layer: layer.into(),
            begin,
            end,
            next,
            features: FeatureMap::new(),
        }
    }

    /// Builder-style feature assignment
    pub fn with_feature(mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.features_mut().insert(name.into(), value.into());
        self
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            AnnotationInstance::Span { .. } => AnnotationKind::Span,
            AnnotationInstance::Relation { .. } => AnnotationKind::Relation,
            AnnotationInstance::ChainLink { .. } => AnnotationKind::ChainLink,
        }
    }

    pub fn layer(&self) -> &str {
        match self {
            AnnotationInstance::Span { layer, .. }
            | AnnotationInstance::Relation { layer, .. }
            | AnnotationInstance::ChainLink { layer, .. } => layer,
        }
    }

    pub fn features(&self) -> &FeatureMap {
        match self {
            AnnotationInstance::Span { features, .. }
            | AnnotationInstance::Relation { features, .. }
            | AnnotationInstance::ChainLink { features, .. } => features,
        }
    }

    pub fn features_mut(&mut self) -> &mut FeatureMap {
        match self {
            AnnotationInstance::Span { features, .. }
            | AnnotationInstance::Relation { features, .. }
            | AnnotationInstance::ChainLink { features, .. } => features,
        }
    }

    /// Text offsets for spans and chain links; relations have none
    pub fn offsets(&self) -> Option<(usize, usize)> {
        match self {
            AnnotationInstance::Span { begin, end, .. }
            | AnnotationInstance::ChainLink { begin, end, .. } => Some((*begin, *end)),
            AnnotationInstance::Relation { .. } => None,
        }
    }

    /// Value of `feature`, if set
    pub fn feature(&self, name: &str) -> Option<&FeatureValue> {
        self.features().get(name)
    }

    /// Mutable link list of a slot feature
    pub fn links_mut(&mut self, feature: &str) -> Option<&mut Vec<Link>> {
        match self.features_mut().get_mut(feature) {
            Some(FeatureValue::Links(links)) => Some(links),
            _ => None,
        }
    }

    /// Every id this instance points at (relation endpoints, chain successor, slot targets)
    pub fn referenced_ids(&self) -> Vec<AnnotationId> {
        let mut ids = Vec::new();
        match self {
            AnnotationInstance::Relation {
                governor,
                dependent,
                ..
            } => {
                ids.push(*governor);
                ids.push(*dependent);
            }
            AnnotationInstance::ChainLink { next: Some(n), .. } => ids.push(*n),
            _ => {}
        }
        for value in self.features().values() {
            if let FeatureValue::Links(links) = value {
                ids.extend(links.iter().map(|l| l.target));
            }
        }
        ids
    }
}

/// An annotation together with its store-local identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub instance: AnnotationInstance,
}

impl Annotation {
    pub fn new(id: AnnotationId, instance: AnnotationInstance) -> Self {
        Self { id, instance }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_values_are_totally_ordered() {
        let a = FeatureValue::Float(0.5);
        let b = FeatureValue::Float(0.5);
        let nan = FeatureValue::Float(f64::NAN);
        assert_eq!(a, b);
        assert_eq!(nan.clone(), nan);
        assert!(FeatureValue::Float(0.1) < FeatureValue::Float(0.2));
    }

    #[test]
    fn test_values_of_different_types_never_equal() {
        assert_ne!(FeatureValue::Int(1), FeatureValue::Float(1.0));
        assert_ne!(FeatureValue::Str("1".into()), FeatureValue::Int(1));
        assert!(FeatureValue::Null < FeatureValue::Bool(false));
    }

    #[test]
    fn test_referenced_ids_cover_slots_and_endpoints() {
        let rel = AnnotationInstance::relation("Dep", AnnotationId(1), AnnotationId(2)).with_feature(
            "args",
            FeatureValue::Links(vec![Link::new("arg0", AnnotationId(7))]),
        );
        assert_eq!(
            rel.referenced_ids(),
            vec![AnnotationId(1), AnnotationId(2), AnnotationId(7)]
        );
        assert_eq!(rel.offsets(), None);
    }

    #[test]
    fn test_instance_json_shape() {
        let span = AnnotationInstance::span("Entity", 0, 5).with_feature("value", "ORG");
        let json = serde_json::to_value(&span).unwrap();
        assert_eq!(json["kind"], "span");
        assert_eq!(json["features"]["value"]["type"], "str");
        let back: AnnotationInstance = serde_json::from_value(json).unwrap();
        assert_eq!(back, span);
    }
}
