//! Streaming multi-way join.
//!
//! Sources are pulled in the order of their common identifiers and merged
//! with a cursor per side; inner, outer and left behaviour is a strategy.

pub mod key;
pub mod mapping;
pub mod merge;
pub mod merger;
pub mod operation;
pub mod strategy;

pub use key::KeyExtractor;
pub use mapping::ComponentMapping;
pub use merge::SortMergeJoin;
pub use merger::{Merger, StructureMerger};
pub use operation::JoinOperation;
pub use strategy::{InnerJoin, JoinKind, JoinStrategy, LeftJoin, OuterJoin};
