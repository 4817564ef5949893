//! Convenient re-exports for downstream crates.

pub use crate::config::EngineConfig;
pub use crate::datapoint::DataPoint;
pub use crate::error::{Error, Result};
pub use crate::filtering::{CompareOp, Filtering};
pub use crate::hash::Hash256;
pub use crate::ordering::{Direction, OrderKey, Ordering};
pub use crate::schema::{Component, DataStructure, Role};
pub use crate::value::{Value, ValueType};
