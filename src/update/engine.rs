//! Logic graph → adjacency record translation

use super::TaxonomyDelta;
use crate::coordinate::{IdentifierService, StampService};
use crate::error::TaxonomyResult;
use crate::logic::{
    isomorphic_diff, ConceptChronicle, LogicError, LogicGraphChronicle, LogicNode, LogicalExpression, NodeIndex,
};
use crate::record::{AdjacencyRecord, RecordError, Sequence, StampSequence, TaxonomyFlags};
use crate::storage::{DestinationOriginRecord, OriginStore, ReverseIndex};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Writes taxonomy edges derived from committed chronicles
///
/// Callers serialize commits through the service's write lock; the
/// compare-and-put loop in [`TaxonomyUpdater::apply`] only guards against
/// writers that bypass it.
pub struct TaxonomyUpdater {
    store: Arc<dyn OriginStore>,
    reverse: Arc<ReverseIndex>,
    stamps: Arc<dyn StampService>,
    ids: Arc<dyn IdentifierService>,
    is_a: Sequence,
    role_group: Sequence,
}

/// Where a relationship root is written from
struct Walk<'a> {
    expression: &'a LogicalExpression,
    origin: Sequence,
    stamp: StampSequence,
    flags: TaxonomyFlags,
}

impl TaxonomyUpdater {
    pub fn new(
        store: Arc<dyn OriginStore>,
        reverse: Arc<ReverseIndex>,
        stamps: Arc<dyn StampService>,
        ids: Arc<dyn IdentifierService>,
        is_a: Sequence,
        role_group: Sequence,
    ) -> Self {
        Self {
            store,
            reverse,
            stamps,
            ids,
            is_a,
            role_group,
        }
    }

    pub fn is_a(&self) -> Sequence {
        self.is_a
    }

    /// Resolve a nid or sequence to a sequence
    pub fn resolve(&self, concept: i32) -> TaxonomyResult<Sequence> {
        Ok(self
            .ids
            .resolve_to_sequence(concept)
            .ok_or(RecordError::UnresolvedIdentifier(concept))?)
    }

    /// Self-records for every status stamp of the concept
    pub fn concept_status_delta(&self, chronicle: &ConceptChronicle) -> TaxonomyResult<TaxonomyDelta> {
        let origin = self.resolve(chronicle.concept)?;
        let mut delta = TaxonomyDelta::new(origin);
        for stamp in &chronicle.stamps {
            delta.record.add_concept_status(origin, *stamp)?;
        }
        Ok(delta)
    }

    /// Edges asserted or retracted across every version of a logic graph
    ///
    /// Versions without a predecessor contribute all of their relationships;
    /// later versions contribute only what differs from their predecessor.
    pub fn logic_graph_delta(&self, chronicle: &LogicGraphChronicle) -> TaxonomyResult<TaxonomyDelta> {
        let origin = self.resolve(chronicle.concept)?;
        let flags = chronicle.premise.taxonomy_flags();
        let mut delta = TaxonomyDelta::new(origin);

        for (index, version) in chronicle.versions.iter().enumerate() {
            let walk = Walk {
                expression: &version.expression,
                origin,
                stamp: version.stamp,
                flags,
            };
            match version.predecessor {
                None => {
                    for root in version.expression.relationship_roots()? {
                        self.write_root(&mut delta, &walk, root)?;
                    }
                }
                Some(previous) if previous < index => {
                    let before = &chronicle.versions[previous];
                    let diff = isomorphic_diff(&before.expression, &version.expression)?;
                    debug!(
                        concept = origin,
                        stamp = version.stamp,
                        added = diff.added.len(),
                        deleted = diff.deleted.len(),
                        "Logic graph changed"
                    );
                    for root in &diff.added {
                        self.write_root(&mut delta, &walk, *root)?;
                    }
                    if !diff.deleted.is_empty() {
                        let retired = Walk {
                            expression: &before.expression,
                            stamp: self.stamps.retired(version.stamp)?,
                            ..walk
                        };
                        self.write_retractions(&mut delta, &walk, &retired, &diff.deleted)?;
                    }
                }
                Some(previous) => {
                    return Err(LogicError::Malformed(format!(
                        "version {} of concept {} names later version {} as its predecessor",
                        index, origin, previous
                    ))
                    .into())
                }
            }
        }
        Ok(delta)
    }

    /// Retire the edges of deleted roots that the new version no longer asserts
    ///
    /// A deleted root can cover an edge the new version still carries, for
    /// example a role moved into a group or one copy of a duplicated parent.
    /// The retired stamp shares the version's time, so writing it would hide
    /// that edge.
    fn write_retractions(
        &self,
        delta: &mut TaxonomyDelta,
        current: &Walk<'_>,
        retired: &Walk<'_>,
        deleted: &[NodeIndex],
    ) -> TaxonomyResult<()> {
        let asserted = self.asserted_edges(current)?;
        let mut retractions = TaxonomyDelta::new(retired.origin);
        for root in deleted {
            self.write_root(&mut retractions, retired, *root)?;
        }
        for (destination, ts) in retractions.record.edges() {
            if asserted.contains(&(destination, ts.type_sequence)) {
                continue;
            }
            delta.record.add(destination, ts.type_sequence, ts.stamp, ts.flags)?;
            delta
                .pairs
                .insert(DestinationOriginRecord::new(destination, retired.origin));
        }
        Ok(())
    }

    /// (destination, type) of every edge the walked expression asserts
    fn asserted_edges(&self, walk: &Walk<'_>) -> TaxonomyResult<HashSet<(Sequence, Sequence)>> {
        let mut scratch = TaxonomyDelta::new(walk.origin);
        for root in walk.expression.relationship_roots()? {
            self.write_root(&mut scratch, walk, root)?;
        }
        let edges = scratch
            .record
            .edges()
            .map(|(destination, ts)| (destination, ts.type_sequence))
            .collect();
        Ok(edges)
    }

    fn write_root(&self, delta: &mut TaxonomyDelta, walk: &Walk<'_>, root: NodeIndex) -> TaxonomyResult<()> {
        match walk.expression.kind(root)? {
            LogicNode::Concept { concept } => self.write_edge(delta, walk, *concept, self.is_a),
            LogicNode::RoleSome { role_type } if *role_type == self.role_group => {
                let restriction = walk.expression.only_child(root)?;
                let group = walk.expression.node(restriction)?;
                if group.kind != LogicNode::And {
                    warn!(
                        concept = walk.origin,
                        kind = group.kind.name(),
                        "Role group without an AND restriction, skipped"
                    );
                    return Ok(());
                }
                for member in &group.children {
                    self.write_group_member(delta, walk, *member)?;
                }
                Ok(())
            }
            LogicNode::RoleSome { role_type } => self.write_role(delta, walk, root, *role_type),
            LogicNode::Feature { .. } => Ok(()),
            other => Err(LogicError::UnsupportedNode {
                kind: other.name(),
                concept: walk.origin,
            }
            .into()),
        }
    }

    fn write_group_member(&self, delta: &mut TaxonomyDelta, walk: &Walk<'_>, member: NodeIndex) -> TaxonomyResult<()> {
        match walk.expression.kind(member)? {
            LogicNode::RoleSome { role_type } if *role_type == self.role_group => {
                warn!(concept = walk.origin, "Nested role group, skipped");
                Ok(())
            }
            LogicNode::RoleSome { role_type } => self.write_role(delta, walk, member, *role_type),
            LogicNode::Feature { .. } => Ok(()),
            other => Err(LogicError::UnsupportedNode {
                kind: other.name(),
                concept: walk.origin,
            }
            .into()),
        }
    }

    fn write_role(
        &self,
        delta: &mut TaxonomyDelta,
        walk: &Walk<'_>,
        role: NodeIndex,
        role_type: Sequence,
    ) -> TaxonomyResult<()> {
        let restriction = walk.expression.only_child(role)?;
        match walk.expression.kind(restriction)? {
            LogicNode::Concept { concept } => self.write_edge(delta, walk, *concept, role_type),
            other => {
                warn!(
                    concept = walk.origin,
                    role_type,
                    kind = other.name(),
                    "Role restriction is not a concept, skipped"
                );
                Ok(())
            }
        }
    }

    fn write_edge(
        &self,
        delta: &mut TaxonomyDelta,
        walk: &Walk<'_>,
        destination: Sequence,
        type_sequence: Sequence,
    ) -> TaxonomyResult<()> {
        delta.record.add(destination, type_sequence, walk.stamp, walk.flags)?;
        delta
            .pairs
            .insert(DestinationOriginRecord::new(destination, walk.origin));
        Ok(())
    }

    /// Merge a delta into the stored record, then mirror its pairs
    ///
    /// The forward store is written before the reverse index so a failure in
    /// between leaves drift that a reverse index rebuild repairs.
    pub fn apply(&self, delta: &TaxonomyDelta) -> TaxonomyResult<()> {
        if delta.is_empty() {
            return Ok(());
        }
        loop {
            let (expected, merged) = match self.store.get_versioned(delta.origin) {
                Some((write_sequence, packed)) => {
                    let current = AdjacencyRecord::unpack(&packed)?;
                    (write_sequence, current.merged(&delta.record))
                }
                None => (0, delta.record.clone()),
            };
            if self
                .store
                .put_if_unchanged(delta.origin, expected, merged.pack())
                .is_some()
            {
                break;
            }
            debug!(origin = delta.origin, "Concurrent record write, retrying merge");
        }
        self.reverse.extend(delta.pairs.iter().copied());
        debug!(
            origin = delta.origin,
            destinations = delta.record.len(),
            pairs = delta.pairs.len(),
            "Applied taxonomy delta"
        );
        Ok(())
    }
}
