//! In-memory dataset for tests and small lookups.
//!
//! Holds its rows in a shared `Vec` so every `compute_data` call streams the
//! same snapshot without copying it. Ordering and filtering push-down are
//! accepted by default; either can be switched off to model a source that
//! cannot sort or filter.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use vtlset_core::prelude::{DataPoint, DataStructure, Filtering, Ordering, Result, Value};

use crate::stream::DataStream;
use crate::traits::Dataset;

type SharedHook = Arc<dyn Fn() -> Result<()>>;

#[derive(Clone)]
pub struct MemoryDataset {
    structure: Arc<DataStructure>,
    rows: Arc<Vec<DataPoint>>,
    accepts_ordering: bool,
    accepts_filtering: bool,
    on_close: Option<SharedHook>,
}

impl MemoryDataset {
    /// Rows bound to an equal structure declared in another order are
    /// rebound to `structure`. Fails if a row is bound to another structure.
    pub fn new(structure: Arc<DataStructure>, rows: Vec<DataPoint>) -> Result<Self> {
        let rows = rows
            .into_iter()
            .map(|p| p.rebind(&structure))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            structure,
            rows: Arc::new(rows),
            accepts_ordering: true,
            accepts_filtering: true,
            on_close: None,
        })
    }

    /// Build rows from `(name, value)` pairs, nulls filling the gaps.
    pub fn from_pairs<N, V, R>(structure: Arc<DataStructure>, rows: R) -> Result<Self>
    where
        N: AsRef<str>,
        V: Into<Value>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = (N, V)>,
    {
        let points = rows
            .into_iter()
            .map(|row| structure.wrap(row))
            .collect::<Result<Vec<_>>>()?;
        Self::new(structure, points)
    }

    /// Report every ordering as unsupported and stream rows in insertion order.
    pub fn rejecting_ordering(mut self) -> Self {
        self.accepts_ordering = false;
        self
    }

    /// Report every filtering as unsupported and stream all rows.
    pub fn rejecting_filtering(mut self) -> Self {
        self.accepts_filtering = false;
        self
    }

    /// Run `hook` each time a stream produced by this dataset is closed.
    pub fn with_close_hook(mut self, hook: impl Fn() -> Result<()> + 'static) -> Self {
        self.on_close = Some(Arc::new(hook));
        self
    }

    pub fn rows(&self) -> &[DataPoint] {
        &self.rows
    }
}

impl Dataset for MemoryDataset {
    fn structure(&self) -> &Arc<DataStructure> {
        &self.structure
    }

    fn compute_data(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        _columns: &[String],
    ) -> Result<DataStream> {
        let applied_filtering = if self.accepts_filtering {
            filtering.clone()
        } else {
            Filtering::all()
        };
        let applied_ordering = if self.accepts_ordering {
            ordering.project_onto(&self.structure)?
        } else {
            Ordering::any()
        };

        let mut stream = if applied_filtering.is_all() && applied_ordering.is_empty() {
            let rows = Arc::clone(&self.rows);
            let len = rows.len();
            DataStream::new(
                Arc::clone(&self.structure),
                (0..len).map(move |i| Ok(rows[i].clone())),
            )
        } else {
            let mut kept = Vec::with_capacity(self.rows.len());
            for point in self.rows.iter() {
                if applied_filtering.evaluate(point)? {
                    kept.push(point.clone());
                }
            }
            applied_ordering.sort(&mut kept);
            DataStream::from_points(Arc::clone(&self.structure), kept)
        };

        stream = stream
            .requested(ordering.clone(), filtering.clone())
            .applied(applied_ordering, applied_filtering);
        if let Some(hook) = &self.on_close {
            let hook = Arc::clone(hook);
            stream = stream.on_close(move || hook());
        }
        Ok(stream)
    }

    fn unsupported_ordering(&self, ordering: &Ordering) -> Ordering {
        if self.accepts_ordering {
            Ordering::any()
        } else {
            ordering.clone()
        }
    }

    fn unsupported_filtering(&self, filtering: &Filtering) -> Filtering {
        if self.accepts_filtering {
            Filtering::all()
        } else {
            filtering.clone()
        }
    }

    fn size(&self) -> Option<u64> {
        Some(self.rows.len() as u64)
    }

    fn distinct_value_counts(&self) -> Option<HashMap<String, u64>> {
        let counts = self
            .structure
            .components()
            .iter()
            .enumerate()
            .map(|(pos, component)| {
                let distinct: HashSet<_> = self.rows.iter().filter_map(|p| p.get_at(pos)).collect();
                (component.name().to_string(), distinct.len() as u64)
            })
            .collect();
        Some(counts)
    }
}

impl fmt::Debug for MemoryDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDataset")
            .field("structure", &self.structure.to_string())
            .field("rows", &self.rows.len())
            .field("accepts_ordering", &self.accepts_ordering)
            .field("accepts_filtering", &self.accepts_filtering)
            .finish()
    }
}
