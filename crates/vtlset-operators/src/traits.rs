//! Dataset trait + common interfaces.
//!
//! A dataset is a structure plus a way to produce a `DataStream` of its rows.
//! Consumers pass the ordering and filtering they want; a dataset may apply
//! both, either, or neither, and records on the returned stream what it did.

use std::collections::HashMap;
use std::sync::Arc;

use vtlset_core::prelude::{DataStructure, Filtering, Ordering, Result};

use crate::stream::DataStream;

/// Anything that can produce rows for a fixed structure.
///
/// Invariants:
/// - Every row of every stream is bound to `structure()`.
/// - A stream's applied ordering must be one the rows really follow.
/// - `unsupported_*` must be side-effect free.
pub trait Dataset {
    fn structure(&self) -> &Arc<DataStructure>;

    /// Rows in producer order, unfiltered.
    fn data(&self) -> Result<DataStream> {
        self.compute_data(&Ordering::any(), &Filtering::all(), &[])
    }

    /// Rows with `ordering` and `filtering` pushed down where possible.
    ///
    /// `columns` is a hint naming the components the consumer reads. Rows
    /// still carry the full structure.
    fn compute_data(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        columns: &[String],
    ) -> Result<DataStream>;

    /// The part of `ordering` this dataset would not apply. Empty when it
    /// would apply all of it.
    fn unsupported_ordering(&self, ordering: &Ordering) -> Ordering {
        ordering.clone()
    }

    /// The part of `filtering` this dataset would not apply.
    fn unsupported_filtering(&self, filtering: &Filtering) -> Filtering {
        filtering.clone()
    }

    /// Row count, when known without reading.
    fn size(&self) -> Option<u64> {
        None
    }

    /// Distinct value count per component, when known without reading.
    fn distinct_value_counts(&self) -> Option<HashMap<String, u64>> {
        None
    }
}
