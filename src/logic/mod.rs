//! Logic graphs: the axiom trees the taxonomy is derived from
//!
//! A [`LogicalExpression`] is one version of a concept's definition. Versions
//! form a small DAG inside a [`LogicGraphChronicle`]; consecutive versions are
//! compared with [`isomorphic_diff`] to find added and deleted relationships.

mod chronicle;
mod diff;
mod expression;

pub use chronicle::{CommitRecord, ConceptChronicle, LogicGraphChronicle, LogicGraphVersion};
pub use diff::{isomorphic_diff, ExpressionDiff};
pub use expression::{ExpressionBuilder, ExpressionNode, Literal, LogicNode, LogicalExpression, NodeIndex};

use crate::record::Sequence;
use thiserror::Error;

/// Errors raised while interpreting logic graphs
#[derive(Debug, Error)]
pub enum LogicError {
    #[error("Unsupported {kind} node in the logic graph of concept {concept}")]
    UnsupportedNode { kind: &'static str, concept: Sequence },

    #[error("Malformed logic graph: {0}")]
    Malformed(String),

    #[error("Dangling node index: {0}")]
    DanglingNode(NodeIndex),
}

pub type LogicResult<T> = Result<T, LogicError>;
