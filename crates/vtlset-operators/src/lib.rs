#![forbid(unsafe_code)]
//! vtlset-operators: lazy datasets and the operations over them.
//!
//! Design intent:
//! - Pull driven and single threaded; a row is produced when a consumer asks.
//! - Every operation negotiates ordering/filtering with its sources and
//!   reports what it could not apply.
//! - Sources opened by an operation are released through a `Closer`,
//!   exactly once, on success and on failure.

pub mod closer;
pub mod stream;
pub mod traits;

pub mod aggregate;
pub mod filter;
pub mod memory;

pub mod join;
pub mod sort;

pub use aggregate::{AggregationOperation, Reducer};
pub use closer::Closer;
pub use join::{JoinKind, JoinOperation};
pub use memory::MemoryDataset;
pub use sort::{compatible_order, get_or_sort};
pub use stream::{CloseHook, DataStream, Rows};
pub use traits::Dataset;
