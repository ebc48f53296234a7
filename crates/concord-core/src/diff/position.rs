//! Comparison keys for annotations.
//!
//! A [`Position`] says where an annotation sits in the text, independent of
//! the in-memory identity it has in its source store. Relations and slots are
//! keyed by the positions of the spans they point at.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::model::{
    Annotation, AnnotationId, AnnotationInstance, AnnotationKind, AnnotationStore,
    LinkCompareBehavior,
};

/// Position of a span: `(layer, begin, end)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpanKey {
    pub layer: String,
    pub begin: usize,
    pub end: usize,
}

impl SpanKey {
    pub fn new(layer: impl Into<String>, begin: usize, end: usize) -> Self {
        Self {
            layer: layer.into(),
            begin,
            end,
        }
    }
}

impl std::fmt::Display for SpanKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{},{}]", self.layer, self.begin, self.end)
    }
}

/// Equivalence key under which annotations from different sources are compared
///
/// The derived order (variant first: spans, chain links, relations, slots)
/// is the stable iteration order of diff results, and guarantees that
/// anything an annotation can point at sorts before it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Position {
    Span {
        layer: String,
        begin: usize,
        end: usize,
    },
    ChainLink {
        layer: String,
        begin: usize,
        end: usize,
        ordinal: usize,
    },
    Relation {
        layer: String,
        governor: SpanKey,
        dependent: SpanKey,
    },
    Slot {
        host: Box<Position>,
        feature: String,
        /// `None` when roles are ignored ([`LinkCompareBehavior::TargetOnly`])
        role: Option<String>,
        target: SpanKey,
    },
}

impl Position {
    /// Layer of the annotation (for slots: of the host)
    pub fn layer(&self) -> &str {
        match self {
            Position::Span { layer, .. }
            | Position::ChainLink { layer, .. }
            | Position::Relation { layer, .. } => layer,
            Position::Slot { host, .. } => host.layer(),
        }
    }

    pub fn is_slot(&self) -> bool {
        matches!(self, Position::Slot { .. })
    }

    /// Host position of a slot
    pub fn host(&self) -> Option<&Position> {
        match self {
            Position::Slot { host, .. } => Some(host),
            _ => None,
        }
    }

    /// Position a span with this key would have
    pub fn of_span(key: &SpanKey) -> Self {
        Position::Span {
            layer: key.layer.clone(),
            begin: key.begin,
            end: key.end,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Position::Span { layer, begin, end } => write!(f, "{}[{},{}]", layer, begin, end),
            Position::ChainLink {
                layer,
                begin,
                end,
                ordinal,
            } => write!(f, "{}[{},{}]#{}", layer, begin, end, ordinal),
            Position::Relation {
                layer,
                governor,
                dependent,
            } => write!(f, "{}({} -> {})", layer, governor, dependent),
            Position::Slot {
                host,
                feature,
                role,
                target,
            } => match role {
                Some(role) => write!(f, "{}.{}[{}={}]", host, feature, role, target),
                None => write!(f, "{}.{}[{}]", host, feature, target),
            },
        }
    }
}

/// Lookup structure over one store: id index and chain ordinals
pub struct StoreIndex<'a> {
    store: &'a AnnotationStore,
    by_id: HashMap<AnnotationId, &'a Annotation>,
    chain_ordinals: HashMap<AnnotationId, usize>,
}

impl<'a> StoreIndex<'a> {
    pub fn new(store: &'a AnnotationStore) -> Self {
        let by_id: HashMap<AnnotationId, &'a Annotation> =
            store.annotations().iter().map(|a| (a.id, a)).collect();
        let chain_ordinals = compute_chain_ordinals(store, &by_id);
        Self {
            store,
            by_id,
            chain_ordinals,
        }
    }

    pub fn store(&self) -> &'a AnnotationStore {
        self.store
    }

    pub fn get(&self, id: AnnotationId) -> Option<&'a Annotation> {
        self.by_id.get(&id).copied()
    }

    /// Position key of a referenced span
    pub fn span_key(&self, id: AnnotationId) -> Option<SpanKey> {
        match &self.get(id)?.instance {
            AnnotationInstance::Span {
                layer, begin, end, ..
            } => Some(SpanKey::new(layer.clone(), *begin, *end)),
            _ => None,
        }
    }

    /// 0-based index of a chain link from its chain head
    pub fn chain_ordinal(&self, id: AnnotationId) -> Option<usize> {
        self.chain_ordinals.get(&id).copied()
    }
}

fn compute_chain_ordinals(
    store: &AnnotationStore,
    by_id: &HashMap<AnnotationId, &Annotation>,
) -> HashMap<AnnotationId, usize> {
    let mut pointed_at: HashSet<AnnotationId> = HashSet::new();
    for annotation in store.annotations() {
        if let AnnotationInstance::ChainLink { next: Some(n), .. } = &annotation.instance {
            pointed_at.insert(*n);
        }
    }

    let mut ordinals = HashMap::new();
    let links = store
        .annotations()
        .iter()
        .filter(|a| a.instance.kind() == AnnotationKind::ChainLink);

    // Heads first, in store order; links left over afterwards sit on a cycle
    // (only possible in unvalidated stores) and are numbered from themselves.
    let (heads, rest): (Vec<&Annotation>, Vec<&Annotation>) =
        links.partition(|a| !pointed_at.contains(&a.id));
    for start in heads.into_iter().chain(rest) {
        if ordinals.contains_key(&start.id) {
            continue;
        }
        let mut ordinal = 0;
        let mut current = Some(start.id);
        while let Some(id) = current {
            if ordinals.contains_key(&id) {
                break;
            }
            ordinals.insert(id, ordinal);
            ordinal += 1;
            current = match by_id.get(&id).map(|a| &a.instance) {
                Some(AnnotationInstance::ChainLink { next, .. }) => *next,
                _ => None,
            };
        }
    }
    ordinals
}

/// Base position of an annotation
///
/// Total for validated stores. Returns `None` only when a relation endpoint
/// does not resolve to a span in `index`.
pub fn position_of(annotation: &Annotation, index: &StoreIndex<'_>) -> Option<Position> {
    match &annotation.instance {
        AnnotationInstance::Span {
            layer, begin, end, ..
        } => Some(Position::Span {
            layer: layer.clone(),
            begin: *begin,
            end: *end,
        }),
        AnnotationInstance::ChainLink {
            layer, begin, end, ..
        } => Some(Position::ChainLink {
            layer: layer.clone(),
            begin: *begin,
            end: *end,
            ordinal: index.chain_ordinal(annotation.id).unwrap_or(0),
        }),
        AnnotationInstance::Relation {
            layer,
            governor,
            dependent,
            ..
        } => Some(Position::Relation {
            layer: layer.clone(),
            governor: index.span_key(*governor)?,
            dependent: index.span_key(*dependent)?,
        }),
    }
}

/// One slot position produced by a host annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPosition {
    pub position: Position,
    pub feature: String,
    pub link_index: usize,
}

/// Slot positions of every link of every slot feature accepted by `compares`
///
/// The role only becomes part of the key under
/// [`LinkCompareBehavior::IncludeRole`].
pub fn slot_positions_of(
    annotation: &Annotation,
    host: &Position,
    index: &StoreIndex<'_>,
    behavior: LinkCompareBehavior,
    compares: impl Fn(&str) -> bool,
) -> Vec<SlotPosition> {
    let mut out = Vec::new();
    for (feature, value) in annotation.instance.features() {
        let Some(links) = value.as_links() else {
            continue;
        };
        if !compares(feature) {
            continue;
        }
        for (link_index, link) in links.iter().enumerate() {
            let Some(target) = index.span_key(link.target) else {
                continue;
            };
            let role = match behavior {
                LinkCompareBehavior::IncludeRole => Some(link.role.clone()),
                LinkCompareBehavior::TargetOnly => None,
            };
            out.push(SlotPosition {
                position: Position::Slot {
                    host: Box::new(host.clone()),
                    feature: feature.clone(),
                    role,
                    target,
                },
                feature: feature.clone(),
                link_index,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeatureValue, Link};

    #[test]
    fn test_relation_position_uses_endpoint_offsets() {
        let mut a = AnnotationStore::new("a");
        let g = a.push(AnnotationInstance::span("Token", 0, 3));
        let d = a.push(AnnotationInstance::span("Token", 4, 8));
        let r = a.push(AnnotationInstance::relation("Dep", g, d));

        // Same text offsets, different ids
        let mut b = AnnotationStore::new("b");
        b.push(AnnotationInstance::span("Token", 100, 101));
        let d2 = b.push(AnnotationInstance::span("Token", 4, 8));
        let g2 = b.push(AnnotationInstance::span("Token", 0, 3));
        let r2 = b.push(AnnotationInstance::relation("Dep", g2, d2));

        let ia = StoreIndex::new(&a);
        let ib = StoreIndex::new(&b);
        let pa = position_of(a.get(r).unwrap(), &ia).unwrap();
        let pb = position_of(b.get(r2).unwrap(), &ib).unwrap();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_zero_length_span_distinct_from_overlapping_span() {
        let mut a = AnnotationStore::new("a");
        let z = a.push(AnnotationInstance::span("Entity", 2, 2));
        let s = a.push(AnnotationInstance::span("Entity", 2, 6));
        let idx = StoreIndex::new(&a);
        assert_ne!(
            position_of(a.get(z).unwrap(), &idx),
            position_of(a.get(s).unwrap(), &idx)
        );
    }

    #[test]
    fn test_chain_ordinals_follow_next_pointers() {
        let mut a = AnnotationStore::new("a");
        // stored out of chain order on purpose
        a.insert(Annotation::new(
            AnnotationId(3),
            AnnotationInstance::chain_link("Coref", 20, 22, None),
        ));
        a.insert(Annotation::new(
            AnnotationId(1),
            AnnotationInstance::chain_link("Coref", 0, 4, Some(AnnotationId(2))),
        ));
        a.insert(Annotation::new(
            AnnotationId(2),
            AnnotationInstance::chain_link("Coref", 10, 12, Some(AnnotationId(3))),
        ));
        let idx = StoreIndex::new(&a);
        assert_eq!(idx.chain_ordinal(AnnotationId(1)), Some(0));
        assert_eq!(idx.chain_ordinal(AnnotationId(2)), Some(1));
        assert_eq!(idx.chain_ordinal(AnnotationId(3)), Some(2));
    }

    #[test]
    fn test_slot_key_depends_on_link_compare_behavior() {
        let mut a = AnnotationStore::new("a");
        let t = a.push(AnnotationInstance::span("Entity", 0, 4));
        let ev = a.push(
            AnnotationInstance::span("Event", 5, 9)
                .with_feature("args", FeatureValue::Links(vec![Link::new("agent", t)])),
        );
        let idx = StoreIndex::new(&a);
        let host_ann = a.get(ev).unwrap();
        let host = position_of(host_ann, &idx).unwrap();

        let with_role =
            slot_positions_of(host_ann, &host, &idx, LinkCompareBehavior::IncludeRole, |_| true);
        let target_only =
            slot_positions_of(host_ann, &host, &idx, LinkCompareBehavior::TargetOnly, |_| true);

        assert_eq!(with_role.len(), 1);
        assert!(matches!(
            &with_role[0].position,
            Position::Slot { role: Some(r), .. } if r == "agent"
        ));
        assert!(matches!(
            &target_only[0].position,
            Position::Slot { role: None, .. }
        ));
        assert!(slot_positions_of(host_ann, &host, &idx, LinkCompareBehavior::TargetOnly, |_| false)
            .is_empty());
    }

    #[test]
    fn test_document_level_annotations_share_one_position() {
        let mut a = AnnotationStore::new("a");
        let x = a.push(AnnotationInstance::span("Codebook", 0, 0).with_feature("code", "yes"));
        let idx = StoreIndex::new(&a);
        assert_eq!(
            position_of(a.get(x).unwrap(), &idx),
            Some(Position::Span {
                layer: "Codebook".to_string(),
                begin: 0,
                end: 0
            })
        );
    }
}
