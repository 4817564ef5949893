//! vtlset: dataset algebra over lazily produced rows.
//!
//! Re-exports the value/schema model and the operators so integration tests
//! and benches depend on one crate.

pub use vtlset_core;
pub use vtlset_operators;

pub mod prelude {
    pub use vtlset_core::prelude::*;
    pub use vtlset_operators::{
        AggregationOperation, Closer, DataStream, Dataset, JoinKind, JoinOperation, MemoryDataset,
        Reducer,
    };
}
