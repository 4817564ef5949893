//! Lazy row streams with a close hook and ordering/filtering bookkeeping.
//!
//! A `DataStream` is single pass. Running out of rows closes it; a failure
//! while closing surfaces as one last `Err` item. `close()` may be called any
//! number of times and releases the underlying source once. Dropping an
//! unclosed stream closes it too, but a failure there can only be logged.

use std::fmt;
use std::sync::Arc;

use vtlset_core::prelude::{DataPoint, DataStructure, Filtering, Ordering, Result};

/// Boxed row iterator.
pub type Rows = Box<dyn Iterator<Item = Result<DataPoint>>>;

/// Releases whatever a stream holds open upstream.
pub type CloseHook = Box<dyn FnOnce() -> Result<()>>;

pub struct DataStream {
    structure: Arc<DataStructure>,
    rows: Rows,
    on_close: Option<CloseHook>,
    requested_ordering: Ordering,
    requested_filtering: Filtering,
    ordering: Ordering,
    filtering: Filtering,
    finished: bool,
}

impl DataStream {
    /// A stream in producer order, with nothing requested and nothing applied.
    pub fn new(
        structure: Arc<DataStructure>,
        rows: impl Iterator<Item = Result<DataPoint>> + 'static,
    ) -> Self {
        Self {
            structure,
            rows: Box::new(rows),
            on_close: None,
            requested_ordering: Ordering::any(),
            requested_filtering: Filtering::all(),
            ordering: Ordering::any(),
            filtering: Filtering::all(),
            finished: false,
        }
    }

    pub fn from_points(structure: Arc<DataStructure>, points: Vec<DataPoint>) -> Self {
        Self::new(structure, points.into_iter().map(Ok))
    }

    /// Record what the consumer asked for.
    pub fn requested(mut self, ordering: Ordering, filtering: Filtering) -> Self {
        self.requested_ordering = ordering;
        self.requested_filtering = filtering;
        self
    }

    /// Record what the producer actually applied.
    pub fn applied(mut self, ordering: Ordering, filtering: Filtering) -> Self {
        self.ordering = ordering;
        self.filtering = filtering;
        self
    }

    /// Add a hook run on close. Hooks added later run first.
    pub fn on_close(mut self, hook: impl FnOnce() -> Result<()> + 'static) -> Self {
        self.on_close = Some(match self.on_close.take() {
            None => Box::new(hook),
            Some(previous) => Box::new(move || {
                let first = hook();
                let second = previous();
                match (first, second) {
                    (Ok(()), Ok(())) => Ok(()),
                    (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
                    (Err(e), Err(other)) => Err(e.suppress(other)),
                }
            }),
        });
        self
    }

    pub fn structure(&self) -> &Arc<DataStructure> {
        &self.structure
    }

    /// Ordering the rows actually follow.
    pub fn ordering(&self) -> &Ordering {
        &self.ordering
    }

    /// Filtering the rows actually went through.
    pub fn filtering(&self) -> &Filtering {
        &self.filtering
    }

    pub fn requested_ordering(&self) -> &Ordering {
        &self.requested_ordering
    }

    pub fn requested_filtering(&self) -> &Filtering {
        &self.requested_filtering
    }

    /// What the consumer still has to sort by. Empty when the request is met.
    pub fn residual_ordering(&self) -> Ordering {
        if self.requested_ordering.is_satisfied_by(&self.ordering) {
            Ordering::any()
        } else {
            self.requested_ordering.clone()
        }
    }

    /// What the consumer still has to filter by. `All` when the request is met.
    pub fn residual_filtering(&self) -> Filtering {
        if self.requested_filtering.is_all() || self.requested_filtering == self.filtering {
            Filtering::all()
        } else {
            self.requested_filtering.clone()
        }
    }

    pub fn is_closed(&self) -> bool {
        self.finished && self.on_close.is_none()
    }

    /// Release the upstream source. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        self.finished = true;
        self.rows = Box::new(std::iter::empty());
        match self.on_close.take() {
            Some(hook) => hook(),
            None => Ok(()),
        }
    }

    /// Replace the row iterator, keeping the close hook and bookkeeping.
    pub fn map_rows(mut self, f: impl FnOnce(Rows) -> Rows) -> Self {
        let rows = std::mem::replace(&mut self.rows, Box::new(std::iter::empty()));
        self.rows = f(rows);
        self
    }

    /// Split into rows and close hook. The caller becomes responsible for
    /// running the hook.
    pub fn into_parts(mut self) -> (Rows, Option<CloseHook>) {
        let rows = std::mem::replace(&mut self.rows, Box::new(std::iter::empty()));
        let hook = self.on_close.take();
        self.finished = true;
        (rows, hook)
    }
}

impl Iterator for DataStream {
    type Item = Result<DataPoint>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.rows.next() {
            Some(item) => Some(item),
            None => match self.close() {
                Ok(()) => None,
                Err(e) => Some(Err(e)),
            },
        }
    }
}

impl Drop for DataStream {
    fn drop(&mut self) {
        if let Some(hook) = self.on_close.take() {
            if let Err(_e) = hook() {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_e, "failed to release source of a dropped stream");
            }
        }
    }
}

impl fmt::Debug for DataStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStream")
            .field("structure", &self.structure.to_string())
            .field("ordering", &self.ordering.to_string())
            .field("requested_ordering", &self.requested_ordering.to_string())
            .field("filtering", &self.filtering)
            .field("requested_filtering", &self.requested_filtering)
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use vtlset_core::prelude::{Direction, Error, Role, Value, ValueType};

    fn structure() -> Arc<DataStructure> {
        Arc::new(
            DataStructure::try_new([
                ("id", Role::Identifier, ValueType::Integer),
                ("m1", Role::Measure, ValueType::Integer),
            ])
            .unwrap(),
        )
    }

    fn points(s: &Arc<DataStructure>, n: i64) -> Vec<DataPoint> {
        (0..n)
            .map(|i| s.wrap([("id", Value::from(i)), ("m1", Value::from(i * 10))]).unwrap())
            .collect()
    }

    #[test]
    fn exhaustion_closes_once() {
        let s = structure();
        let closes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&closes);
        let mut stream = DataStream::from_points(Arc::clone(&s), points(&s, 3)).on_close(move || {
            counter.set(counter.get() + 1);
            Ok(())
        });

        let rows: Vec<DataPoint> = stream.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 3);
        assert!(stream.is_closed());
        stream.close().unwrap();
        drop(stream);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn close_failure_is_last_item() {
        let s = structure();
        let stream = DataStream::from_points(Arc::clone(&s), points(&s, 1)).on_close(|| {
            Err(Error::Close {
                source_name: "test".into(),
                message: "boom".into(),
            })
        });
        let items: Vec<Result<DataPoint>> = stream.collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(Error::Close { .. })));
    }

    #[test]
    fn drop_closes_unfinished_stream() {
        let s = structure();
        let closes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&closes);
        let mut stream = DataStream::from_points(Arc::clone(&s), points(&s, 5)).on_close(move || {
            counter.set(counter.get() + 1);
            Ok(())
        });
        assert!(stream.next().is_some());
        drop(stream);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn hooks_compose_and_aggregate_failures() {
        let s = structure();
        let mut stream = DataStream::from_points(Arc::clone(&s), vec![])
            .on_close(|| {
                Err(Error::Close {
                    source_name: "first".into(),
                    message: "a".into(),
                })
            })
            .on_close(|| {
                Err(Error::Close {
                    source_name: "second".into(),
                    message: "b".into(),
                })
            });
        let err = stream.close().unwrap_err();
        assert!(matches!(err.primary(), Error::Close { source_name, .. } if source_name == "second"));
        assert_eq!(err.suppressed().len(), 1);
    }

    #[test]
    fn residuals_reflect_what_was_not_applied() {
        let s = structure();
        let id = Arc::clone(s.get("id").unwrap());
        let by_id = Ordering::any().then(id, Direction::Asc);
        let keep = Filtering::eq("id", 1_i64);

        let stream = DataStream::from_points(Arc::clone(&s), vec![])
            .requested(by_id.clone(), keep.clone())
            .applied(Ordering::any(), keep.clone());
        assert_eq!(stream.residual_ordering(), by_id);
        assert!(stream.residual_filtering().is_all());

        let stream = DataStream::from_points(Arc::clone(&s), vec![])
            .requested(by_id.clone(), keep.clone())
            .applied(by_id, Filtering::all());
        assert!(stream.residual_ordering().is_empty());
        assert_eq!(stream.residual_filtering(), keep);
    }
}
