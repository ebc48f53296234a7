//! Curated store construction.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::diff::{
    position_of, ConfigurationSet, DiffResult, Position, SetClassification, SpanKey, StoreIndex,
};
use crate::errors::{ConcordError, Result};
use crate::merge::model::{MergeOutcome, MergeStats, UnresolvedReason, UnresolvedSet};
use crate::model::{
    Annotation, AnnotationId, AnnotationInstance, AnnotationStore, FeatureValue, LayerSet, Link,
    SourceLabel,
};
use crate::{log_op_end, log_op_error, log_op_start};

/// Build the curated store from a diff
///
/// Starts from the reference source's annotations on the diffed layers (plus
/// the spans on other layers they point at) and walks the sets in position order, so spans are settled before the
/// relations and slots that point at them:
///
/// - unanimous sets keep the reference annotation
/// - incomplete sets keep (or, without a reference annotation, adopt from the
///   first present source) when `merge_incomplete`, otherwise are removed
/// - differing sets are removed
///
/// Removed and dangling sets are returned as unresolved, as are chain links
/// that would shift to another ordinal because a predecessor was not merged.
///
/// # Errors
///
/// `ReferenceSourceNotFound` if `reference` is not one of the diffed sources.
pub fn merge(
    diff: &DiffResult,
    reference: &SourceLabel,
    merge_incomplete: bool,
) -> Result<MergeOutcome> {
    let start = Instant::now();
    log_op_start!(
        "merge",
        reference = reference.as_str(),
        merge_incomplete = merge_incomplete
    );

    let Some(reference_store) = diff.store(reference) else {
        let err = ConcordError::ReferenceSourceNotFound {
            reference: reference.as_str().to_string(),
            available: diff.sources.iter().map(|s| s.to_string()).collect(),
        };
        log_op_error!(
            "merge",
            err.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        return Err(err);
    };

    let mut merger = Merger::new(diff, reference, reference_store, merge_incomplete);
    for (set, class) in diff.classified() {
        if set.is_slot() {
            merger.slot_set(set, class);
        } else {
            merger.base_set(set, class);
        }
    }
    let outcome = merger.finish();

    log_op_end!(
        "merge",
        duration_ms = start.elapsed().as_millis() as u64,
        unresolved_count = outcome.unresolved.len(),
        kept = outcome.stats.kept_from_reference,
        added = outcome.stats.added_from_other_sources,
        removed = outcome.stats.removed
    );
    Ok(outcome)
}

/// A link accepted into the curated store, checked once removals are known
struct AcceptedLink<'d> {
    set: &'d ConfigurationSet,
    class: SetClassification,
    host: AnnotationId,
    target: AnnotationId,
}

struct Merger<'d> {
    diff: &'d DiffResult,
    reference: &'d SourceLabel,
    reference_store: &'d AnnotationStore,
    merge_incomplete: bool,
    indexes: BTreeMap<&'d SourceLabel, StoreIndex<'d>>,

    curated: AnnotationStore,
    /// Curated annotation at each merged base position
    placed: BTreeMap<Position, AnnotationId>,
    removed: BTreeSet<AnnotationId>,
    /// (host, feature, link index) of reference links to drop
    link_removals: Vec<(AnnotationId, String, usize)>,
    accepted_relations: Vec<(&'d ConfigurationSet, SetClassification, AnnotationId)>,
    accepted_links: Vec<AcceptedLink<'d>>,
    /// Chain links adopted from another source: (curated id, source, source id)
    adopted_chain_links: Vec<(AnnotationId, &'d SourceLabel, AnnotationId)>,
    /// Every merged chain link with the set it was merged from
    placed_chain_links: Vec<(AnnotationId, &'d ConfigurationSet, SetClassification)>,
    /// Curated spans on layers outside the diff, by position
    carried: BTreeMap<SpanKey, AnnotationId>,
    carried_ids: BTreeSet<AnnotationId>,

    unresolved: Vec<UnresolvedSet>,
    reported: BTreeSet<Position>,
    stats: MergeStats,
}

impl<'d> Merger<'d> {
    fn new(
        diff: &'d DiffResult,
        reference: &'d SourceLabel,
        reference_store: &'d AnnotationStore,
        merge_incomplete: bool,
    ) -> Self {
        let indexes = diff
            .stores
            .iter()
            .map(|(label, store)| (label, StoreIndex::new(store)))
            .collect();
        let mut curated = reference_store
            .restricted_to(&diff.layers)
            .relabeled(SourceLabel::curation());
        let carried_ids = carry_referenced_spans(reference_store, &diff.layers, &mut curated);
        let carried = carried_ids
            .iter()
            .filter_map(|id| Some((span_key(curated.get(*id)?)?, *id)))
            .collect();

        Self {
            diff,
            reference,
            reference_store,
            merge_incomplete,
            indexes,
            curated,
            placed: BTreeMap::new(),
            removed: BTreeSet::new(),
            link_removals: Vec::new(),
            accepted_relations: Vec::new(),
            accepted_links: Vec::new(),
            adopted_chain_links: Vec::new(),
            placed_chain_links: Vec::new(),
            carried,
            carried_ids,
            unresolved: Vec::new(),
            reported: BTreeSet::new(),
            stats: MergeStats::default(),
        }
    }

    fn report(&mut self, set: &ConfigurationSet, class: SetClassification, reason: UnresolvedReason) {
        if self.reported.insert(set.position.clone()) {
            self.unresolved.push(UnresolvedSet {
                set: set.clone(),
                classification: class,
                reason,
            });
        }
    }

    fn accepts(&self, class: SetClassification) -> bool {
        match class {
            SetClassification::Unanimous => true,
            SetClassification::Incomplete => self.merge_incomplete,
            SetClassification::Differing => false,
        }
    }

    fn rejection_reason(class: SetClassification) -> UnresolvedReason {
        match class {
            SetClassification::Incomplete => UnresolvedReason::IncompleteNotMerged,
            _ => UnresolvedReason::Differing,
        }
    }

    fn base_set(&mut self, set: &'d ConfigurationSet, class: SetClassification) {
        let reference_ids: Vec<AnnotationId> = set
            .configurations_for(self.reference)
            .map(|c| c.annotation_id)
            .collect();

        if !self.accepts(class) {
            for id in reference_ids {
                self.removed.insert(id);
                self.stats.removed += 1;
            }
            self.report(set, class, Self::rejection_reason(class));
            return;
        }

        // Accepted sets are never stacked
        if let Some(id) = set
            .sole_configuration_for(self.reference)
            .map(|c| c.annotation_id)
        {
            self.place(set, class, id);
            self.stats.kept_from_reference += 1;
            return;
        }

        let Some(donor) = set.configurations.first() else {
            return;
        };
        let Some(annotation) = self.diff.annotation(donor) else {
            return;
        };
        match self.adopt(&donor.source, annotation) {
            Some(instance) => {
                let is_chain_link = matches!(instance, AnnotationInstance::ChainLink { .. });
                let id = self.curated.push(instance);
                self.place(set, class, id);
                self.stats.added_from_other_sources += 1;
                if is_chain_link {
                    self.adopted_chain_links
                        .push((id, &donor.source, annotation.id));
                }
            }
            None => self.report(set, class, UnresolvedReason::DanglingReference),
        }
    }

    fn place(&mut self, set: &'d ConfigurationSet, class: SetClassification, id: AnnotationId) {
        self.placed.insert(set.position.clone(), id);
        match set.position {
            Position::Relation { .. } => self.accepted_relations.push((set, class, id)),
            Position::ChainLink { .. } => self.placed_chain_links.push((id, set, class)),
            _ => {}
        }
    }

    /// Copy an instance from another source with its references rewritten
    /// onto curated annotations; `None` if a relation endpoint is not merged
    fn adopt(
        &mut self,
        source: &'d SourceLabel,
        annotation: &'d Annotation,
    ) -> Option<AnnotationInstance> {
        // Links come back one by one from their own slot sets
        let mut copy = without_links(&annotation.instance);

        match &mut copy {
            AnnotationInstance::Relation {
                governor,
                dependent,
                ..
            } => {
                *governor = self.curated_span(source, *governor)?;
                *dependent = self.curated_span(source, *dependent)?;
            }
            AnnotationInstance::ChainLink { next, .. } => *next = None,
            AnnotationInstance::Span { .. } => {}
        }
        Some(copy)
    }

    /// Curated id of the span that `id` denotes in `source`
    ///
    /// Spans on diffed layers must have been merged. Spans on other layers
    /// are reused when already carried, otherwise copied in.
    fn curated_span(&mut self, source: &'d SourceLabel, id: AnnotationId) -> Option<AnnotationId> {
        let span = self.indexes.get(source)?.get(id)?;
        let key = span_key(span)?;
        if self.diff.layers.contains(&key.layer) {
            return self.placed.get(&Position::of_span(&key)).copied();
        }
        if let Some(id) = self.carried.get(&key) {
            return Some(*id);
        }
        let id = self.curated.push(without_links(&span.instance));
        self.carried.insert(key, id);
        self.carried_ids.insert(id);
        Some(id)
    }

    fn slot_set(&mut self, set: &'d ConfigurationSet, class: SetClassification) {
        let Position::Slot { host, .. } = &set.position else {
            return;
        };

        let reference_links: Vec<(AnnotationId, String, usize)> = set
            .configurations_for(self.reference)
            .filter_map(|c| {
                c.slot
                    .as_ref()
                    .map(|s| (c.annotation_id, s.feature.clone(), s.link_index))
            })
            .collect();

        if !self.accepts(class) {
            self.link_removals.extend(reference_links);
            self.report(set, class, Self::rejection_reason(class));
            return;
        }

        if let Some((host_id, feature, link_index)) = reference_links.into_iter().next() {
            let target_id = self
                .reference_store
                .get(host_id)
                .and_then(|a| a.instance.feature(&feature))
                .and_then(|v| v.as_links())
                .and_then(|links| links.get(link_index))
                .map(|l| l.target);
            match target_id {
                Some(target_id) => self.accepted_links.push(AcceptedLink {
                    set,
                    class,
                    host: host_id,
                    target: target_id,
                }),
                None => self.report(set, class, UnresolvedReason::DanglingReference),
            }
            return;
        }

        // Adopt the link from the first present source
        let donated = set.configurations.first().and_then(|donor| {
            let slot = donor.slot.as_ref()?;
            let link = self
                .diff
                .annotation(donor)?
                .instance
                .feature(&slot.feature)?
                .as_links()?
                .get(slot.link_index)?;
            Some((&donor.source, slot.feature.clone(), link.clone()))
        });
        let adopted = donated.and_then(|(source, feature, link)| {
            let host_id = self.placed.get(&**host).copied()?;
            let target_id = self.curated_span(source, link.target)?;
            Some((host_id, feature, link.role, target_id))
        });

        let Some((host_id, feature, role, target_id)) = adopted else {
            self.report(set, class, UnresolvedReason::DanglingReference);
            return;
        };
        if self.removed.contains(&host_id) {
            self.report(set, class, UnresolvedReason::DanglingReference);
            return;
        }
        if let Some(annotation) = self.curated.get_mut(host_id) {
            let features = annotation.instance.features_mut();
            let entry = features
                .entry(feature)
                .or_insert_with(|| FeatureValue::Links(Vec::new()));
            if let FeatureValue::Links(links) = entry {
                links.push(Link::new(role, target_id));
                self.stats.added_links += 1;
                self.accepted_links.push(AcceptedLink {
                    set,
                    class,
                    host: host_id,
                    target: target_id,
                });
            } else {
                self.report(set, class, UnresolvedReason::DanglingReference);
            }
        }
    }

    fn finish(mut self) -> MergeOutcome {
        self.retain_outside_diff();
        self.apply_link_removals();

        for id in std::mem::take(&mut self.removed) {
            self.curated.remove(id);
        }

        self.repair_chains();
        self.settle_chain_positions();
        self.repair_relations();
        self.check_links();
        self.prune_links();
        self.drop_unreferenced_carried_spans();

        self.unresolved
            .sort_by(|a, b| a.set.position.cmp(&b.set.position));
        MergeOutcome {
            curated: self.curated,
            unresolved: self.unresolved,
            stats: self.stats,
        }
    }

    /// Reference annotations the diff has no set for stay as they are
    fn retain_outside_diff(&mut self) {
        let Some(index) = self.indexes.get(self.reference) else {
            return;
        };
        for annotation in self.reference_store.annotations() {
            if !self.diff.layers.contains(annotation.instance.layer()) {
                continue;
            }
            let known = position_of(annotation, index)
                .map(|p| self.diff.set_at(&p).is_some())
                .unwrap_or(false);
            if !known {
                tracing::warn!(
                    annotation = %annotation.id,
                    layer = annotation.instance.layer(),
                    "reference annotation has no position in the diff; retained"
                );
                self.stats.retained_outside_diff += 1;
            }
        }
    }

    fn apply_link_removals(&mut self) {
        let mut removals = std::mem::take(&mut self.link_removals);
        // Descending index per (host, feature) keeps earlier indices valid
        removals.sort();
        removals.dedup();
        for (host, feature, index) in removals.into_iter().rev() {
            if let Some(links) = self
                .curated
                .get_mut(host)
                .and_then(|a| a.instance.links_mut(&feature))
            {
                if index < links.len() {
                    links.remove(index);
                }
            }
        }
    }

    /// Relations whose endpoints did not survive are taken out
    fn repair_relations(&mut self) {
        for (set, class, id) in std::mem::take(&mut self.accepted_relations) {
            let endpoints_ok = match self.curated.get(id).map(|a| &a.instance) {
                Some(AnnotationInstance::Relation {
                    governor,
                    dependent,
                    ..
                }) => self.curated.contains(*governor) && self.curated.contains(*dependent),
                _ => continue,
            };
            if !endpoints_ok {
                self.curated.remove(id);
                self.stats.removed += 1;
                self.report(set, class, UnresolvedReason::DanglingReference);
            }
        }
    }

    /// Accepted links whose host or target did not survive are reported
    fn check_links(&mut self) {
        for link in std::mem::take(&mut self.accepted_links) {
            if !self.curated.contains(link.host) || !self.curated.contains(link.target) {
                self.report(link.set, link.class, UnresolvedReason::DanglingReference);
            }
        }
    }

    fn prune_links(&mut self) {
        let present: BTreeSet<AnnotationId> =
            self.curated.annotations().iter().map(|a| a.id).collect();
        let ids: Vec<AnnotationId> = present.iter().copied().collect();
        for id in ids {
            let Some(annotation) = self.curated.get_mut(id) else {
                continue;
            };
            for value in annotation.instance.features_mut().values_mut() {
                if let FeatureValue::Links(links) = value {
                    let before = links.len();
                    links.retain(|l| present.contains(&l.target));
                    self.stats.pruned_links += before - links.len();
                }
            }
        }
    }

    fn repair_chains(&mut self) {
        let mut has_predecessor: BTreeSet<AnnotationId> = self
            .curated
            .annotations()
            .iter()
            .filter_map(|a| match &a.instance {
                AnnotationInstance::ChainLink { next, .. } => *next,
                _ => None,
            })
            .collect();

        // Adopted links point at the curated link at their successor's position,
        // unless another link already does
        for (id, source, source_id) in std::mem::take(&mut self.adopted_chain_links) {
            let successor = self.indexes.get(source).and_then(|index| {
                let next = match &index.get(source_id)?.instance {
                    AnnotationInstance::ChainLink { next, .. } => (*next)?,
                    _ => return None,
                };
                let position = position_of(index.get(next)?, index)?;
                self.placed.get(&position).copied()
            });
            let Some(successor) = successor.filter(|s| self.curated.contains(*s)) else {
                continue;
            };
            if !has_predecessor.insert(successor) {
                self.stats.truncated_chains += 1;
                continue;
            }
            if let Some(AnnotationInstance::ChainLink { next, .. }) =
                self.curated.get_mut(id).map(|a| &mut a.instance)
            {
                *next = Some(successor);
            }
        }

        self.truncate_dangling_chains();
    }

    fn truncate_dangling_chains(&mut self) {
        let present: BTreeSet<AnnotationId> =
            self.curated.annotations().iter().map(|a| a.id).collect();
        let ids: Vec<AnnotationId> = present.iter().copied().collect();
        for id in ids {
            if let Some(AnnotationInstance::ChainLink { next, .. }) =
                self.curated.get_mut(id).map(|a| &mut a.instance)
            {
                if matches!(next, Some(n) if !present.contains(n)) {
                    *next = None;
                    self.stats.truncated_chains += 1;
                }
            }
        }
    }

    /// Chain links whose ordinal changed once their predecessors were dropped
    /// are taken out, until every merged link sits at its set's position
    fn settle_chain_positions(&mut self) {
        let mut placed = std::mem::take(&mut self.placed_chain_links);
        loop {
            let moved: BTreeSet<AnnotationId> = {
                let index = StoreIndex::new(&self.curated);
                placed
                    .iter()
                    .filter(|(id, set, _)| {
                        self.curated.get(*id).is_some_and(|annotation| {
                            position_of(annotation, &index).as_ref() != Some(&set.position)
                        })
                    })
                    .map(|(id, _, _)| *id)
                    .collect()
            };
            if moved.is_empty() {
                break;
            }
            for (id, set, class) in placed.iter().filter(|(id, _, _)| moved.contains(id)) {
                self.curated.remove(*id);
                self.stats.removed += 1;
                self.report(set, *class, UnresolvedReason::BrokenChain);
            }
            placed.retain(|(id, _, _)| !moved.contains(id));
            self.truncate_dangling_chains();
        }
    }

    /// Carried spans are support for relations and links only
    fn drop_unreferenced_carried_spans(&mut self) {
        let referenced = referenced_ids(&self.curated);
        for id in std::mem::take(&mut self.carried_ids) {
            if referenced.contains(&id) {
                self.stats.carried_spans += 1;
            } else {
                self.curated.remove(id);
            }
        }
    }
}

fn span_key(annotation: &Annotation) -> Option<SpanKey> {
    match &annotation.instance {
        AnnotationInstance::Span {
            layer, begin, end, ..
        } => Some(SpanKey::new(layer.clone(), *begin, *end)),
        _ => None,
    }
}

/// Copy of an instance with every link feature emptied
fn without_links(instance: &AnnotationInstance) -> AnnotationInstance {
    let mut copy = instance.clone();
    for value in copy.features_mut().values_mut() {
        if let FeatureValue::Links(links) = value {
            links.clear();
        }
    }
    copy
}

/// Relation endpoints and link targets of every annotation in `store`
fn referenced_ids(store: &AnnotationStore) -> BTreeSet<AnnotationId> {
    let mut ids = BTreeSet::new();
    for annotation in store.annotations() {
        if let AnnotationInstance::Relation {
            governor,
            dependent,
            ..
        } = &annotation.instance
        {
            ids.insert(*governor);
            ids.insert(*dependent);
        }
        for value in annotation.instance.features().values() {
            if let Some(links) = value.as_links() {
                ids.extend(links.iter().map(|l| l.target));
            }
        }
    }
    ids
}

/// Copy into `curated` the reference spans on non-diffed layers that its
/// relations and links point at, keeping their ids
fn carry_referenced_spans(
    reference: &AnnotationStore,
    layers: &LayerSet,
    curated: &mut AnnotationStore,
) -> BTreeSet<AnnotationId> {
    let mut carried = BTreeSet::new();
    for id in referenced_ids(curated) {
        let Some(annotation) = reference.get(id) else {
            continue;
        };
        if layers.contains(annotation.instance.layer()) || span_key(annotation).is_none() {
            continue;
        }
        curated.insert(Annotation::new(id, without_links(&annotation.instance)));
        carried.insert(id);
    }
    carried
}
