//! Streaming filter applied on top of a source that rejected a filtering.
//!
//! Rows are evaluated one at a time; nothing is buffered. A row whose
//! predicate is unknown (null comparison) is dropped.

use vtlset_core::prelude::{DataPoint, Filtering, Result};

use crate::stream::{DataStream, Rows};

pub struct Filter {
    input: Rows,
    predicate: Filtering,
}

impl Filter {
    pub fn new(input: Rows, predicate: Filtering) -> Self {
        Self { input, predicate }
    }
}

impl Iterator for Filter {
    type Item = Result<DataPoint>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let point = match self.input.next()? {
                Ok(point) => point,
                Err(e) => return Some(Err(e)),
            };
            match self.predicate.evaluate(&point) {
                Ok(true) => return Some(Ok(point)),
                Ok(false) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Apply `predicate` to the stream's rows and record it as applied.
pub fn apply(stream: DataStream, predicate: Filtering) -> DataStream {
    if predicate.is_all() {
        return stream;
    }
    let ordering = stream.ordering().clone();
    // Rows passing the requested predicate satisfy the request whatever the
    // source already applied.
    let applied = if predicate == *stream.requested_filtering() {
        predicate.clone()
    } else {
        stream.filtering().clone().and(predicate.clone())
    };
    stream
        .map_rows(move |rows| Box::new(Filter::new(rows, predicate)))
        .applied(ordering, applied)
}
