//! Isomorphism-based diff between two versions of a logical expression
//!
//! Every node is assigned an isomorphism class bottom-up: two subtrees share
//! a class exactly when they have the same kind and the same multiset of
//! child classes. Relationship roots of the two versions are then matched
//! class by class; unmatched roots in the new version were added, unmatched
//! roots in the old version were deleted.

use super::expression::{LogicNode, LogicalExpression, NodeIndex};
use super::LogicResult;
use std::collections::HashMap;

/// Relationship roots that differ between two expression versions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpressionDiff {
    /// Roots present only in the new expression, as indexes into it
    pub added: Vec<NodeIndex>,
    /// Roots present only in the old expression, as indexes into it
    pub deleted: Vec<NodeIndex>,
}

impl ExpressionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }
}

type ClassId = u32;

/// Shared class table so both expressions are classified consistently
#[derive(Default)]
struct Classifier {
    classes: HashMap<(LogicNode, Vec<ClassId>), ClassId>,
}

impl Classifier {
    /// Class of every node, by index
    fn classify(&mut self, expression: &LogicalExpression) -> Vec<ClassId> {
        let mut out: Vec<ClassId> = Vec::with_capacity(expression.len());
        // Children precede parents, so `out` already holds every child class.
        for node in expression.nodes() {
            let mut children: Vec<ClassId> = node.children.iter().map(|c| out[*c]).collect();
            children.sort_unstable();
            let next = self.classes.len() as ClassId;
            let class = *self
                .classes
                .entry((node.kind.clone(), children))
                .or_insert(next);
            out.push(class);
        }
        out
    }
}

/// Compare relationship roots of `old` and `new` up to isomorphism
pub fn isomorphic_diff(old: &LogicalExpression, new: &LogicalExpression) -> LogicResult<ExpressionDiff> {
    let mut classifier = Classifier::default();
    let old_classes = classifier.classify(old);
    let new_classes = classifier.classify(new);

    let mut unmatched_old: HashMap<ClassId, Vec<NodeIndex>> = HashMap::new();
    for root in old.relationship_roots()? {
        unmatched_old.entry(old_classes[root]).or_default().push(root);
    }

    let mut diff = ExpressionDiff::default();
    for root in new.relationship_roots()? {
        let matched = unmatched_old
            .get_mut(&new_classes[root])
            .and_then(|candidates| candidates.pop())
            .is_some();
        if !matched {
            diff.added.push(root);
        }
    }

    diff.deleted = unmatched_old.into_values().flatten().collect();
    diff.deleted.sort_unstable();
    Ok(diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::expression::ExpressionBuilder;

    fn kinds(expr: &LogicalExpression, roots: &[NodeIndex]) -> Vec<LogicNode> {
        roots.iter().map(|r| expr.kind(*r).unwrap().clone()).collect()
    }

    #[test]
    fn identical_expressions_have_empty_diff() {
        let a = LogicalExpression::is_a(&[1, 2]);
        let b = LogicalExpression::is_a(&[1, 2]);
        assert!(isomorphic_diff(&a, &b).unwrap().is_empty());
    }

    #[test]
    fn member_order_does_not_matter() {
        let a = LogicalExpression::is_a(&[1, 2]);
        let b = LogicalExpression::is_a(&[2, 1]);
        assert!(isomorphic_diff(&a, &b).unwrap().is_empty());
    }

    #[test]
    fn replaced_parent_is_one_add_one_delete() {
        let old = LogicalExpression::is_a(&[1]);
        let new = LogicalExpression::is_a(&[2]);
        let diff = isomorphic_diff(&old, &new).unwrap();
        assert_eq!(kinds(&new, &diff.added), vec![LogicNode::Concept { concept: 2 }]);
        assert_eq!(kinds(&old, &diff.deleted), vec![LogicNode::Concept { concept: 1 }]);
    }

    #[test]
    fn moving_between_sets_is_not_a_change() {
        let old = LogicalExpression::is_a(&[1]);
        let mut b = ExpressionBuilder::new();
        let c = b.concept(1);
        let and = b.and(vec![c]);
        let set = b.sufficient_set(vec![and]);
        let new = b.build(vec![set]).unwrap();
        assert!(isomorphic_diff(&old, &new).unwrap().is_empty());
    }

    #[test]
    fn changed_role_restriction_replaces_the_role() {
        let build = |restriction| {
            let mut b = ExpressionBuilder::new();
            let parent = b.concept(1);
            let target = b.concept(restriction);
            let role = b.role_some(50, target);
            let and = b.and(vec![parent, role]);
            let set = b.necessary_set(vec![and]);
            b.build(vec![set]).unwrap()
        };
        let old = build(7);
        let new = build(8);
        let diff = isomorphic_diff(&old, &new).unwrap();
        assert_eq!(kinds(&new, &diff.added), vec![LogicNode::RoleSome { role_type: 50 }]);
        assert_eq!(kinds(&old, &diff.deleted), vec![LogicNode::RoleSome { role_type: 50 }]);
    }

    #[test]
    fn duplicate_roots_are_matched_as_a_multiset() {
        let old = LogicalExpression::is_a(&[1, 1]);
        let new = LogicalExpression::is_a(&[1]);
        let diff = isomorphic_diff(&old, &new).unwrap();
        assert!(diff.added.is_empty());
        assert_eq!(diff.deleted.len(), 1);
    }

    #[test]
    fn role_group_member_change_replaces_whole_group() {
        let build = |site| {
            let mut b = ExpressionBuilder::new();
            let target = b.concept(site);
            let role = b.role_some(60, target);
            let group = b.role_group(99, vec![role]);
            let and = b.and(vec![group]);
            let set = b.necessary_set(vec![and]);
            b.build(vec![set]).unwrap()
        };
        let diff = isomorphic_diff(&build(3), &build(4)).unwrap();
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.deleted.len(), 1);
    }
}
