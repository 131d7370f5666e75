//! Immutable parent/child tree materialized for one view

use crate::coordinate::ViewCoordinate;
use crate::record::Sequence;
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Compressed adjacency: the neighbours of `members[i]` are
/// `targets[offsets[i]..offsets[i + 1]]`, sorted.
#[derive(Debug, Clone, Default)]
struct Adjacency {
    offsets: Vec<usize>,
    targets: Vec<Sequence>,
}

impl Adjacency {
    /// `edges` must be sorted by (from, to) and contain no duplicates
    fn from_sorted(members: &[Sequence], edges: &[(Sequence, Sequence)]) -> Self {
        let mut offsets = Vec::with_capacity(members.len() + 1);
        let mut targets = Vec::with_capacity(edges.len());
        let mut next = 0;
        offsets.push(0);
        for member in members {
            while next < edges.len() && edges[next].0 == *member {
                targets.push(edges[next].1);
                next += 1;
            }
            offsets.push(targets.len());
        }
        Self { offsets, targets }
    }

    fn neighbours(&self, index: usize) -> &[Sequence] {
        &self.targets[self.offsets[index]..self.offsets[index + 1]]
    }
}

/// Visible is-a structure of the taxonomy under a single view
#[derive(Debug, Clone)]
pub struct Tree {
    view: ViewCoordinate,
    members: Vec<Sequence>,
    parents: Adjacency,
    children: Adjacency,
}

impl Tree {
    /// Assemble from member concepts and (child, parent) edges
    ///
    /// Edge ends that are not members are added as members.
    pub fn from_edges(
        view: ViewCoordinate,
        members: impl IntoIterator<Item = Sequence>,
        edges: impl IntoIterator<Item = (Sequence, Sequence)>,
    ) -> Self {
        let mut edges: Vec<(Sequence, Sequence)> = edges.into_iter().collect();
        edges.sort_unstable();
        edges.dedup();

        let mut members: BTreeSet<Sequence> = members.into_iter().collect();
        members.extend(edges.iter().flat_map(|(c, p)| [*c, *p]));
        let members: Vec<Sequence> = members.into_iter().collect();

        let parents = Adjacency::from_sorted(&members, &edges);
        let mut reversed: Vec<(Sequence, Sequence)> = edges.iter().map(|(c, p)| (*p, *c)).collect();
        reversed.sort_unstable();
        let children = Adjacency::from_sorted(&members, &reversed);

        Self {
            view,
            members,
            parents,
            children,
        }
    }

    pub fn view(&self) -> &ViewCoordinate {
        &self.view
    }

    fn index_of(&self, concept: Sequence) -> Option<usize> {
        self.members.binary_search(&concept).ok()
    }

    pub fn contains(&self, concept: Sequence) -> bool {
        self.index_of(concept).is_some()
    }

    /// Number of member concepts
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.parents.targets.len()
    }

    pub fn members(&self) -> &[Sequence] {
        &self.members
    }

    pub fn parent_sequences(&self, child: Sequence) -> &[Sequence] {
        match self.index_of(child) {
            Some(i) => self.parents.neighbours(i),
            None => &[],
        }
    }

    pub fn child_sequences(&self, parent: Sequence) -> &[Sequence] {
        match self.index_of(parent) {
            Some(i) => self.children.neighbours(i),
            None => &[],
        }
    }

    pub fn is_child_of(&self, child: Sequence, parent: Sequence) -> bool {
        self.parent_sequences(child).binary_search(&parent).is_ok()
    }

    /// Transitive, strict: a concept is not its own descendant unless the
    /// data holds a cycle through it
    pub fn is_descendant_of(&self, child: Sequence, ancestor: Sequence) -> bool {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<Sequence> = self.parent_sequences(child).iter().copied().collect();
        while let Some(next) = queue.pop_front() {
            if next == ancestor {
                return true;
            }
            if visited.insert(next) {
                queue.extend(self.parent_sequences(next));
            }
        }
        false
    }

    /// Members with no visible parent
    pub fn root_sequences(&self) -> Vec<Sequence> {
        self.members
            .iter()
            .enumerate()
            .filter(|(i, _)| self.parents.neighbours(*i).is_empty())
            .map(|(_, m)| *m)
            .collect()
    }

    /// Every concept below `root`, excluding `root` itself
    pub fn descendant_set(&self, root: Sequence) -> BTreeSet<Sequence> {
        let mut found = BTreeSet::new();
        let mut queue: VecDeque<Sequence> = self.child_sequences(root).iter().copied().collect();
        while let Some(next) = queue.pop_front() {
            if found.insert(next) {
                queue.extend(self.child_sequences(next));
            }
        }
        found.remove(&root);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::StampCoordinate;

    fn view() -> ViewCoordinate {
        ViewCoordinate::stated(StampCoordinate::latest(1))
    }

    //      1
    //     / \
    //    2   3
    //     \ / \
    //      4   5
    fn diamond() -> Tree {
        Tree::from_edges(view(), [6], [(2, 1), (3, 1), (4, 2), (4, 3), (5, 3)])
    }

    #[test]
    fn parents_and_children_are_sorted_and_mirrored() {
        let tree = diamond();
        assert_eq!(tree.parent_sequences(4), &[2, 3]);
        assert_eq!(tree.child_sequences(3), &[4, 5]);
        assert_eq!(tree.child_sequences(1), &[2, 3]);
        assert!(tree.parent_sequences(1).is_empty());
        assert!(tree.child_sequences(99).is_empty());
        assert_eq!(tree.edge_count(), 5);
    }

    #[test]
    fn isolated_members_are_roots() {
        let tree = diamond();
        assert_eq!(tree.root_sequences(), vec![1, 6]);
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn descendant_queries_are_transitive() {
        let tree = diamond();
        assert!(tree.is_child_of(4, 2));
        assert!(!tree.is_child_of(4, 1));
        assert!(tree.is_descendant_of(4, 1));
        assert!(!tree.is_descendant_of(1, 4));
        assert!(!tree.is_descendant_of(1, 1));
        assert_eq!(tree.descendant_set(1), BTreeSet::from([2, 3, 4, 5]));
        assert_eq!(tree.descendant_set(3), BTreeSet::from([4, 5]));
        assert!(tree.descendant_set(6).is_empty());
    }

    #[test]
    fn cycles_terminate() {
        let tree = Tree::from_edges(view(), [], [(1, 2), (2, 3), (3, 1)]);
        assert!(tree.is_descendant_of(1, 3));
        assert!(!tree.is_descendant_of(1, 7));
        assert_eq!(tree.descendant_set(1), BTreeSet::from([2, 3]));
        assert!(tree.root_sequences().is_empty());
    }

    #[test]
    fn duplicate_edges_collapse() {
        let tree = Tree::from_edges(view(), [], [(2, 1), (2, 1)]);
        assert_eq!(tree.parent_sequences(2), &[1]);
        assert_eq!(tree.edge_count(), 1);
    }
}
