//! Streaming sort-merge join of two ordered row sequences.
//!
//! Precondition: both inputs arrive ordered by the same key ordering.
//! Equal-key runs produce their cross product. The right side of the
//! current run is buffered so that following left rows with the same key
//! can replay it; nothing else is held in memory.

use std::cmp::Ordering as CmpOrdering;
use std::collections::VecDeque;

use vtlset_core::prelude::{DataPoint, Ordering, Result, Value};

use crate::join::key::KeyExtractor;
use crate::join::merger::Merger;
use crate::join::strategy::JoinStrategy;
use crate::stream::Rows;

struct Cursor {
    rows: Rows,
    keys: KeyExtractor,
    head: Option<(Vec<Value>, DataPoint)>,
    exhausted: bool,
}

impl Cursor {
    fn new(rows: Rows, keys: KeyExtractor) -> Self {
        Self {
            rows,
            keys,
            head: None,
            exhausted: false,
        }
    }

    /// Pull the next row into `head` unless one is already there.
    fn fill(&mut self) -> Result<()> {
        if self.head.is_some() || self.exhausted {
            return Ok(());
        }
        match self.rows.next() {
            None => self.exhausted = true,
            Some(item) => {
                let point = item?;
                let key = self.keys.extract(&point)?;
                self.head = Some((key, point));
            }
        }
        Ok(())
    }

    fn head_key(&self) -> Option<&[Value]> {
        self.head.as_ref().map(|(key, _)| key.as_slice())
    }

    fn take(&mut self) -> Option<(Vec<Value>, DataPoint)> {
        self.head.take()
    }
}

enum Step {
    Done,
    Replay,
    EndRun,
    AdvanceLeft,
    AdvanceRight,
    Match,
}

pub struct SortMergeJoin {
    left: Cursor,
    right: Cursor,
    ordering: Ordering,
    merger: Box<dyn Merger>,
    strategy: &'static dyn JoinStrategy,
    /// Right rows sharing the key of the last match.
    run: Option<(Vec<Value>, Vec<DataPoint>)>,
    pending: VecDeque<DataPoint>,
    done: bool,
}

impl SortMergeJoin {
    /// `ordering` gives the key directions; both extractors must yield keys
    /// in its column order.
    pub fn new(
        left: (Rows, KeyExtractor),
        right: (Rows, KeyExtractor),
        ordering: Ordering,
        merger: Box<dyn Merger>,
        strategy: &'static dyn JoinStrategy,
    ) -> Self {
        Self {
            left: Cursor::new(left.0, left.1),
            right: Cursor::new(right.0, right.1),
            ordering,
            merger,
            strategy,
            run: None,
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn same_key(&self, a: &[Value], b: &[Value]) -> bool {
        self.ordering.compare_keys(a, b) == CmpOrdering::Equal
    }

    fn next_step(&mut self) -> Result<Step> {
        self.left.fill()?;
        if let Some((run_key, _)) = &self.run {
            return Ok(match self.left.head_key() {
                Some(key) if self.same_key(key, run_key) => Step::Replay,
                _ => Step::EndRun,
            });
        }
        self.right.fill()?;
        Ok(match (self.left.head_key(), self.right.head_key()) {
            (None, None) => Step::Done,
            (Some(_), None) if self.strategy.keep_unmatched_left() => Step::AdvanceLeft,
            (None, Some(_)) if self.strategy.keep_unmatched_right() => Step::AdvanceRight,
            (Some(_), None) | (None, Some(_)) => Step::Done,
            (Some(l), Some(r)) => match self.ordering.compare_keys(l, r) {
                CmpOrdering::Less => Step::AdvanceLeft,
                CmpOrdering::Greater => Step::AdvanceRight,
                CmpOrdering::Equal => Step::Match,
            },
        })
    }

    /// Perform one step of the merge, queueing any rows it produces.
    fn step(&mut self) -> Result<()> {
        match self.next_step()? {
            Step::Done => self.done = true,
            Step::EndRun => self.run = None,
            Step::Replay => {
                if let (Some((_, left)), Some((_, rows))) = (self.left.take(), &self.run) {
                    for right in rows {
                        self.pending.push_back(self.merger.merge(Some(&left), Some(right)));
                    }
                }
            }
            Step::AdvanceLeft => {
                if let Some((_, left)) = self.left.take() {
                    if self.strategy.keep_unmatched_left() {
                        self.pending.push_back(self.merger.merge(Some(&left), None));
                    }
                }
            }
            Step::AdvanceRight => {
                if let Some((_, right)) = self.right.take() {
                    if self.strategy.keep_unmatched_right() {
                        self.pending.push_back(self.merger.merge(None, Some(&right)));
                    }
                }
            }
            Step::Match => {
                if let Some((key, left)) = self.left.take() {
                    let mut rows = Vec::new();
                    loop {
                        self.right.fill()?;
                        match self.right.head_key() {
                            Some(r) if self.same_key(r, &key) => {
                                if let Some((_, right)) = self.right.take() {
                                    rows.push(right);
                                }
                            }
                            _ => break,
                        }
                    }
                    for right in &rows {
                        self.pending.push_back(self.merger.merge(Some(&left), Some(right)));
                    }
                    self.run = Some((key, rows));
                }
            }
        }
        Ok(())
    }
}

impl Iterator for SortMergeJoin {
    type Item = Result<DataPoint>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(point) = self.pending.pop_front() {
                return Some(Ok(point));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.step() {
                self.done = true;
                self.pending.clear();
                return Some(Err(e));
            }
        }
    }
}
