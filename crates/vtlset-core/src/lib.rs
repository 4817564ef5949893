#![forbid(unsafe_code)]
//! vtlset-core: the value and schema model of the vtlset dataset algebra.
//!
//! Values are null-aware variants, structures are immutable sets of
//! role-tagged components, and data points are rows bound to one structure.
//! Orderings and filterings describe what a consumer wants from a producer.
//! No streams live here; see `vtlset-operators`.

pub mod config;
pub mod datapoint;
pub mod error;
pub mod filtering;
pub mod hash;
pub mod ordering;
pub mod prelude;
pub mod schema;
pub mod value;
