//! Snapshots: immutable trees built per view for bulk traversal
//!
//! A [`TreeBuilder`] walks the forward store once and keeps the is-a edges
//! visible under a view. Built trees are shared through the
//! [`SnapshotCache`] and queried through [`TaxonomySnapshot`]. Builds run on
//! the blocking pool behind a cancellable [`SnapshotTask`].

mod builder;
mod cache;
mod service;
mod tree;

pub use builder::{SnapshotTask, TreeBuilder};
pub use cache::SnapshotCache;
pub use service::TaxonomySnapshot;
pub use tree::Tree;
