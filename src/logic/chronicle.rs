//! Version histories of concepts and logic graphs, and the commits carrying them

use super::expression::LogicalExpression;
use crate::coordinate::Premise;
use crate::record::StampSequence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One version of a logic graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicGraphVersion {
    pub stamp: StampSequence,
    pub expression: LogicalExpression,
    /// Index of the version this one was derived from
    #[serde(default)]
    pub predecessor: Option<usize>,
}

/// All versions of one concept's stated or inferred logic graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicGraphChronicle {
    /// Referenced concept, as a nid or a sequence
    pub concept: i32,
    pub premise: Premise,
    #[serde(default)]
    pub versions: Vec<LogicGraphVersion>,
}

impl LogicGraphChronicle {
    pub fn new(concept: i32, premise: Premise) -> Self {
        Self {
            concept,
            premise,
            versions: Vec::new(),
        }
    }

    /// Append a version derived from the latest one
    pub fn add_version(&mut self, stamp: StampSequence, expression: LogicalExpression) -> usize {
        let predecessor = self.versions.len().checked_sub(1);
        self.push(stamp, expression, predecessor)
    }

    /// Append a version derived from an arbitrary earlier version
    pub fn add_branch_version(
        &mut self,
        stamp: StampSequence,
        expression: LogicalExpression,
        predecessor: usize,
    ) -> usize {
        self.push(stamp, expression, Some(predecessor))
    }

    fn push(&mut self, stamp: StampSequence, expression: LogicalExpression, predecessor: Option<usize>) -> usize {
        self.versions.push(LogicGraphVersion {
            stamp,
            expression,
            predecessor,
        });
        self.versions.len() - 1
    }
}

/// Status history of one concept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptChronicle {
    pub concept: i32,
    pub stamps: Vec<StampSequence>,
}

impl ConceptChronicle {
    pub fn new(concept: i32, stamps: impl IntoIterator<Item = StampSequence>) -> Self {
        Self {
            concept,
            stamps: stamps.into_iter().collect(),
        }
    }
}

/// Changed chronicles delivered together by one commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: Uuid,
    pub committed_at: DateTime<Utc>,
    #[serde(default)]
    pub concepts: Vec<ConceptChronicle>,
    #[serde(default)]
    pub logic_graphs: Vec<LogicGraphChronicle>,
}

impl CommitRecord {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            committed_at: Utc::now(),
            concepts: Vec::new(),
            logic_graphs: Vec::new(),
        }
    }

    pub fn with_concept(mut self, chronicle: ConceptChronicle) -> Self {
        self.concepts.push(chronicle);
        self
    }

    pub fn with_logic_graph(mut self, chronicle: LogicGraphChronicle) -> Self {
        self.logic_graphs.push(chronicle);
        self
    }

    /// Concepts touched by this commit, deduplicated
    pub fn touched(&self) -> Vec<i32> {
        let mut out: Vec<i32> = self
            .concepts
            .iter()
            .map(|c| c.concept)
            .chain(self.logic_graphs.iter().map(|g| g.concept))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() && self.logic_graphs.is_empty()
    }
}

impl Default for CommitRecord {
    fn default() -> Self {
        Self::new()
    }
}
