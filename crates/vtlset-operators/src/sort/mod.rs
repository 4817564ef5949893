//! Ordering negotiation between an operation and its sources.
//!
//! `compatible_order` turns a caller's ordering into one an operation keyed
//! on a set of columns can produce. `get_or_sort` asks a source for rows in
//! that order and deals with whatever the source could not do.

pub mod run;

use std::sync::Arc;

use vtlset_core::prelude::{
    Component, Direction, EngineConfig, Error, Filtering, OrderKey, Ordering, Result,
};

use crate::filter;
use crate::stream::DataStream;
use crate::traits::Dataset;

pub use run::SortRun;

/// Extend `requested` into an ordering over all of `candidates`.
///
/// Every requested key must name a candidate, each at most once. Candidates
/// not mentioned are appended ascending in their given order. Returns `None`
/// when the request names anything else.
pub fn compatible_order(candidates: &[Arc<Component>], requested: &Ordering) -> Option<Ordering> {
    let mut keys: Vec<OrderKey> = Vec::with_capacity(candidates.len());
    for key in requested.keys() {
        let name = key.component.name();
        let candidate = candidates.iter().find(|c| c.name() == name)?;
        if keys.iter().any(|k| k.component.name() == name) {
            return None;
        }
        keys.push(OrderKey {
            component: Arc::clone(candidate),
            direction: key.direction,
        });
    }
    for candidate in candidates {
        if !keys.iter().any(|k| k.component.name() == candidate.name()) {
            keys.push(OrderKey {
                component: Arc::clone(candidate),
                direction: Direction::Asc,
            });
        }
    }
    Some(Ordering::new(keys))
}

/// Rows of `dataset` ordered by `ordering` and filtered by `filtering`.
///
/// Whatever the dataset leaves undone is finished here when `config`
/// allows it, and is `Unsupported` otherwise. On failure the opened stream
/// is closed before returning, with close failures suppressed onto the
/// primary error.
pub fn get_or_sort(
    dataset: &dyn Dataset,
    ordering: &Ordering,
    filtering: &Filtering,
    columns: &[String],
    config: &EngineConfig,
) -> Result<DataStream> {
    let mut stream = dataset.compute_data(ordering, filtering, columns)?;

    let residual_filtering = stream.residual_filtering();
    if !residual_filtering.is_all() {
        if !config.filter_fallback {
            return Err(abort(
                stream,
                Error::Unsupported(format!(
                    "source {} cannot filter by {:?}",
                    dataset.structure(),
                    residual_filtering
                )),
            ));
        }
        stream = filter::apply(stream, residual_filtering);
    }

    let residual_ordering = stream.residual_ordering();
    if residual_ordering.is_empty() {
        return Ok(stream);
    }
    if !config.sort_fallback {
        return Err(abort(
            stream,
            Error::Unsupported(format!(
                "source {} cannot produce rows ordered by {}",
                dataset.structure(),
                residual_ordering
            )),
        ));
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(ordering = %residual_ordering, "sorting source rows in memory");

    let residual_ordering = residual_ordering.project_onto(stream.structure())?;
    let mut run = SortRun::new(residual_ordering.clone(), config.sort_buffer_rows);
    if let Err(e) = run.fill(stream.by_ref()) {
        return Err(abort(stream, e));
    }
    stream.close()?;

    let requested_filtering = stream.requested_filtering().clone();
    let applied_filtering = stream.filtering().clone();
    Ok(
        DataStream::from_points(Arc::clone(stream.structure()), run.finish())
            .requested(ordering.clone(), requested_filtering)
            .applied(residual_ordering, applied_filtering),
    )
}

fn abort(mut stream: DataStream, primary: Error) -> Error {
    match stream.close() {
        Ok(()) => primary,
        Err(e) => primary.suppress_all(e),
    }
}
