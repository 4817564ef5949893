//! Bounded in-memory run for the sort fallback.
//!
//! Accumulates rows up to a hard cap, then sorts them once.

use vtlset_core::prelude::{DataPoint, Error, Ordering, Result};

/// Rows collected for one in-memory sort.
pub struct SortRun {
    ordering: Ordering,
    rows: Vec<DataPoint>,
    max_rows: usize,
}

impl SortRun {
    pub fn new(ordering: Ordering, max_rows: usize) -> Self {
        Self {
            ordering,
            rows: Vec::new(),
            max_rows,
        }
    }

    /// Add one row. Fails once the cap would be exceeded.
    pub fn push(&mut self, point: DataPoint) -> Result<()> {
        if self.rows.len() >= self.max_rows {
            return Err(Error::Unsupported(format!(
                "cannot sort by {}: source exceeds the {} row sort buffer",
                self.ordering, self.max_rows
            )));
        }
        self.rows.push(point);
        Ok(())
    }

    /// Drain `rows` into the run, stopping at the first failure.
    pub fn fill(&mut self, rows: impl Iterator<Item = Result<DataPoint>>) -> Result<()> {
        for point in rows {
            self.push(point?)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted rows. The sort is stable.
    pub fn finish(mut self) -> Vec<DataPoint> {
        self.ordering.sort(&mut self.rows);
        self.rows
    }
}
