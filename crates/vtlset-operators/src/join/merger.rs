//! Combining a left and a right row into one output row.

use std::sync::Arc;

use vtlset_core::prelude::{DataPoint, DataStructure, Error, Result, Value};

/// Builds an output row from an optional left and an optional right row.
/// An absent side contributes nulls.
pub trait Merger {
    fn structure(&self) -> &Arc<DataStructure>;

    fn merge(&self, left: Option<&DataPoint>, right: Option<&DataPoint>) -> DataPoint;
}

/// Copies components into the output by name: left first, then right.
///
/// A right-side value overwrites a left one of the same name. Identifiers
/// agree on matched rows; for a measure present on both sides the right
/// value wins.
#[derive(Debug, Clone)]
pub struct StructureMerger {
    output: Arc<DataStructure>,
    left: Vec<(usize, usize)>,
    right: Vec<(usize, usize)>,
}

impl StructureMerger {
    pub fn new(
        left: &DataStructure,
        right: &DataStructure,
        output: Arc<DataStructure>,
    ) -> Result<Self> {
        let left = positions(left, &output)?;
        let right = positions(right, &output)?;
        Ok(Self {
            output,
            left,
            right,
        })
    }

    /// Maps a single source onto `output`.
    pub fn single(source: &DataStructure, output: Arc<DataStructure>) -> Result<Self> {
        let left = positions(source, &output)?;
        Ok(Self {
            output,
            left,
            right: Vec::new(),
        })
    }
}

fn positions(source: &DataStructure, output: &DataStructure) -> Result<Vec<(usize, usize)>> {
    source
        .components()
        .iter()
        .enumerate()
        .map(|(src, component)| {
            output
                .index_of(component.name())
                .map(|dst| (src, dst))
                .ok_or_else(|| Error::UnknownComponent(component.name().to_string()))
        })
        .collect()
}

fn copy(values: &mut [Value], point: &DataPoint, mapping: &[(usize, usize)]) {
    for &(src, dst) in mapping {
        if let Some(value) = point.get_at(src) {
            values[dst] = value.clone();
        }
    }
}

impl Merger for StructureMerger {
    fn structure(&self) -> &Arc<DataStructure> {
        &self.output
    }

    fn merge(&self, left: Option<&DataPoint>, right: Option<&DataPoint>) -> DataPoint {
        let mut values: Vec<Value> = self
            .output
            .components()
            .iter()
            .map(|c| Value::null(c.value_type()))
            .collect();
        if let Some(point) = left {
            copy(&mut values, point, &self.left);
        }
        if let Some(point) = right {
            copy(&mut values, point, &self.right);
        }
        DataPoint::from_trusted(Arc::clone(&self.output), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtlset_core::prelude::{Role, ValueType};

    #[test]
    fn absent_side_is_null_padded() {
        let a = Arc::new(
            DataStructure::try_new([
                ("time", Role::Identifier, ValueType::Integer),
                ("m1", Role::Measure, ValueType::Integer),
            ])
            .unwrap(),
        );
        let b = Arc::new(
            DataStructure::try_new([
                ("time", Role::Identifier, ValueType::Integer),
                ("m2", Role::Measure, ValueType::Integer),
            ])
            .unwrap(),
        );
        let out = Arc::new(a.merge(&b).unwrap());
        let merger = StructureMerger::new(&a, &b, Arc::clone(&out)).unwrap();

        let right = b.wrap([("time", Value::from(2011_i64)), ("m2", Value::from(5_i64))]).unwrap();
        let merged = merger.merge(None, Some(&right));
        assert_eq!(merged.get("time"), Some(&Value::from(2011_i64)));
        assert!(merged.get("m1").unwrap().is_null());
        assert_eq!(merged.get("m2"), Some(&Value::from(5_i64)));
    }
}
