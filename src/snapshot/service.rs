//! Query surface over one built tree

use super::tree::Tree;
use crate::coordinate::ViewCoordinate;
use crate::record::Sequence;
use std::collections::BTreeSet;
use std::sync::Arc;

/// View-filtered taxonomy queries answered from a materialized [`Tree`]
///
/// Cheap to clone; clones share the tree.
#[derive(Debug, Clone)]
pub struct TaxonomySnapshot {
    tree: Arc<Tree>,
}

impl TaxonomySnapshot {
    pub fn new(tree: Arc<Tree>) -> Self {
        Self { tree }
    }

    pub fn view(&self) -> &ViewCoordinate {
        self.tree.view()
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn is_child_of(&self, child: Sequence, parent: Sequence) -> bool {
        self.tree.is_child_of(child, parent)
    }

    /// True when `child` is `parent` or one of its descendants
    pub fn is_kind_of(&self, child: Sequence, parent: Sequence) -> bool {
        (child == parent && self.tree.contains(child)) || self.tree.is_descendant_of(child, parent)
    }

    /// `root` and every concept below it
    pub fn kind_of_sequence_set(&self, root: Sequence) -> BTreeSet<Sequence> {
        let mut set = self.tree.descendant_set(root);
        if self.tree.contains(root) {
            set.insert(root);
        }
        set
    }

    pub fn roots(&self) -> Vec<Sequence> {
        self.tree.root_sequences()
    }

    pub fn taxonomy_child_sequences(&self, parent: Sequence) -> Vec<Sequence> {
        self.tree.child_sequences(parent).to_vec()
    }

    pub fn taxonomy_parent_sequences(&self, child: Sequence) -> Vec<Sequence> {
        self.tree.parent_sequences(child).to_vec()
    }
}
