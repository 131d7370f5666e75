//! Logical expressions: an arena of typed nodes rooted at a definition
//!
//! Children always precede their parent in the arena, so every walk in
//! index order is bottom-up and an expression can never contain a cycle.

use super::{LogicError, LogicResult};
use crate::record::Sequence;
use serde::{Deserialize, Serialize};

/// Index of a node inside its [`LogicalExpression`]
pub type NodeIndex = usize;

/// Literal values carried by feature nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Literal {
    Boolean(bool),
    Integer(i64),
    Instant(i64),
    Text(String),
}

/// The closed set of node kinds an expression can hold
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogicNode {
    /// Expression root; children are necessary or sufficient sets
    Definition,
    NecessarySet,
    SufficientSet,
    And,
    Or,
    /// Is-a assertion on the referenced concept
    Concept { concept: Sequence },
    /// Existential restriction; the single child is the restriction
    RoleSome { role_type: Sequence },
    /// Universal restriction; the single child is the restriction
    RoleAll { role_type: Sequence },
    /// Concrete domain feature; the single child is a literal
    Feature { feature_type: Sequence },
    Literal { value: Literal },
    DisjointWith { concept: Sequence },
}

impl LogicNode {
    /// Short name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Definition => "definition",
            Self::NecessarySet => "necessary_set",
            Self::SufficientSet => "sufficient_set",
            Self::And => "and",
            Self::Or => "or",
            Self::Concept { .. } => "concept",
            Self::RoleSome { .. } => "role_some",
            Self::RoleAll { .. } => "role_all",
            Self::Feature { .. } => "feature",
            Self::Literal { .. } => "literal",
            Self::DisjointWith { .. } => "disjoint_with",
        }
    }

    fn is_set(&self) -> bool {
        matches!(self, Self::NecessarySet | Self::SufficientSet)
    }

    fn is_connective(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionNode {
    pub kind: LogicNode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeIndex>,
}

/// A logic graph version's expression tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawExpression")]
pub struct LogicalExpression {
    nodes: Vec<ExpressionNode>,
    root: NodeIndex,
}

#[derive(Deserialize)]
struct RawExpression {
    nodes: Vec<ExpressionNode>,
    root: NodeIndex,
}

impl TryFrom<RawExpression> for LogicalExpression {
    type Error = LogicError;

    fn try_from(raw: RawExpression) -> LogicResult<Self> {
        Self::from_nodes(raw.nodes, raw.root)
    }
}

impl LogicalExpression {
    /// Validate and adopt a raw node arena
    pub fn from_nodes(nodes: Vec<ExpressionNode>, root: NodeIndex) -> LogicResult<Self> {
        for (index, node) in nodes.iter().enumerate() {
            if let Some(child) = node.children.iter().find(|c| **c >= index) {
                return Err(LogicError::Malformed(format!(
                    "node {} ({}) references child {} that does not precede it",
                    index,
                    node.kind.name(),
                    child
                )));
            }
        }
        match nodes.get(root) {
            Some(node) if node.kind == LogicNode::Definition => Ok(Self { nodes, root }),
            Some(node) => Err(LogicError::Malformed(format!(
                "root {} is a {}, not a definition",
                root,
                node.kind.name()
            ))),
            None => Err(LogicError::Malformed(format!("root {} is out of range", root))),
        }
    }

    /// Expression asserting only the given parents in one necessary set
    pub fn is_a(parents: &[Sequence]) -> Self {
        let mut builder = ExpressionBuilder::new();
        let concepts: Vec<_> = parents.iter().map(|p| builder.concept(*p)).collect();
        let and = builder.and(concepts);
        let set = builder.necessary_set(vec![and]);
        builder.finish(vec![set])
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[ExpressionNode] {
        &self.nodes
    }

    pub fn node(&self, index: NodeIndex) -> LogicResult<&ExpressionNode> {
        self.nodes.get(index).ok_or(LogicError::DanglingNode(index))
    }

    pub fn kind(&self, index: NodeIndex) -> LogicResult<&LogicNode> {
        self.node(index).map(|n| &n.kind)
    }

    /// The single child of a restriction-style node
    pub fn only_child(&self, index: NodeIndex) -> LogicResult<NodeIndex> {
        let node = self.node(index)?;
        match node.children.as_slice() {
            [child] => Ok(*child),
            other => Err(LogicError::Malformed(format!(
                "{} node {} has {} children, expected 1",
                node.kind.name(),
                index,
                other.len()
            ))),
        }
    }

    /// Relationship roots: the members of every AND/OR grouping under the
    /// root's necessary and sufficient sets, or set members that are not
    /// groupings themselves
    pub fn relationship_roots(&self) -> LogicResult<Vec<NodeIndex>> {
        let mut roots = Vec::new();
        for set in &self.node(self.root)?.children {
            let set_node = self.node(*set)?;
            if !set_node.kind.is_set() {
                return Err(LogicError::Malformed(format!(
                    "definition child {} is a {}, expected a set",
                    set,
                    set_node.kind.name()
                )));
            }
            for member in &set_node.children {
                let member_node = self.node(*member)?;
                if member_node.kind.is_connective() {
                    roots.extend(member_node.children.iter().copied());
                } else {
                    roots.push(*member);
                }
            }
        }
        Ok(roots)
    }
}

/// Appends nodes bottom-up and closes them under a definition root
#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    nodes: Vec<ExpressionNode>,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&mut self, kind: LogicNode, children: Vec<NodeIndex>) -> NodeIndex {
        self.nodes.push(ExpressionNode { kind, children });
        self.nodes.len() - 1
    }

    pub fn concept(&mut self, concept: Sequence) -> NodeIndex {
        self.node(LogicNode::Concept { concept }, Vec::new())
    }

    pub fn role_some(&mut self, role_type: Sequence, restriction: NodeIndex) -> NodeIndex {
        self.node(LogicNode::RoleSome { role_type }, vec![restriction])
    }

    pub fn role_all(&mut self, role_type: Sequence, restriction: NodeIndex) -> NodeIndex {
        self.node(LogicNode::RoleAll { role_type }, vec![restriction])
    }

    /// A role group: a role-some of the group type over an AND of members
    pub fn role_group(&mut self, group_type: Sequence, members: Vec<NodeIndex>) -> NodeIndex {
        let and = self.and(members);
        self.role_some(group_type, and)
    }

    pub fn feature(&mut self, feature_type: Sequence, value: Literal) -> NodeIndex {
        let literal = self.node(LogicNode::Literal { value }, Vec::new());
        self.node(LogicNode::Feature { feature_type }, vec![literal])
    }

    pub fn disjoint_with(&mut self, concept: Sequence) -> NodeIndex {
        self.node(LogicNode::DisjointWith { concept }, Vec::new())
    }

    pub fn and(&mut self, children: Vec<NodeIndex>) -> NodeIndex {
        self.node(LogicNode::And, children)
    }

    pub fn or(&mut self, children: Vec<NodeIndex>) -> NodeIndex {
        self.node(LogicNode::Or, children)
    }

    pub fn necessary_set(&mut self, children: Vec<NodeIndex>) -> NodeIndex {
        self.node(LogicNode::NecessarySet, children)
    }

    pub fn sufficient_set(&mut self, children: Vec<NodeIndex>) -> NodeIndex {
        self.node(LogicNode::SufficientSet, children)
    }

    /// Add the definition root over `sets` and validate the arena
    ///
    /// Fails when any node names a child that was not added before it.
    pub fn build(mut self, sets: Vec<NodeIndex>) -> LogicResult<LogicalExpression> {
        let root = self.node(LogicNode::Definition, sets);
        LogicalExpression::from_nodes(self.nodes, root)
    }

    /// Close an arena whose child links all came from this builder
    fn finish(mut self, sets: Vec<NodeIndex>) -> LogicalExpression {
        let root = self.node(LogicNode::Definition, sets);
        LogicalExpression {
            nodes: self.nodes,
            root,
        }
    }
}
