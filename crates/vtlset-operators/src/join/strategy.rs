//! Join modes as strategy objects.

use serde::{Deserialize, Serialize};

/// Decides what happens to a row whose key has no match on the other side.
pub trait JoinStrategy: Sync {
    fn name(&self) -> &'static str;

    fn keep_unmatched_left(&self) -> bool;

    fn keep_unmatched_right(&self) -> bool;
}

/// Matched keys only.
#[derive(Debug, Clone, Copy, Default)]
pub struct InnerJoin;

/// Every key from either side.
#[derive(Debug, Clone, Copy, Default)]
pub struct OuterJoin;

/// Every key of the left side.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeftJoin;

impl JoinStrategy for InnerJoin {
    fn name(&self) -> &'static str {
        "inner"
    }
    fn keep_unmatched_left(&self) -> bool {
        false
    }
    fn keep_unmatched_right(&self) -> bool {
        false
    }
}

impl JoinStrategy for OuterJoin {
    fn name(&self) -> &'static str {
        "outer"
    }
    fn keep_unmatched_left(&self) -> bool {
        true
    }
    fn keep_unmatched_right(&self) -> bool {
        true
    }
}

impl JoinStrategy for LeftJoin {
    fn name(&self) -> &'static str {
        "left"
    }
    fn keep_unmatched_left(&self) -> bool {
        true
    }
    fn keep_unmatched_right(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Inner,
    Outer,
    Left,
}

impl JoinKind {
    pub fn strategy(self) -> &'static dyn JoinStrategy {
        match self {
            JoinKind::Inner => &InnerJoin,
            JoinKind::Outer => &OuterJoin,
            JoinKind::Left => &LeftJoin,
        }
    }
}
