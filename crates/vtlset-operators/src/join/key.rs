//! Join key extraction.

use vtlset_core::prelude::{DataPoint, DataStructure, Error, Ordering, Result, Value};

/// Reads the key columns of a row positionally, in ordering order.
#[derive(Debug, Clone)]
pub struct KeyExtractor {
    positions: Vec<usize>,
    names: Vec<String>,
}

impl KeyExtractor {
    /// `resolve` maps each logical key column to its local name in
    /// `structure`.
    pub fn new(
        structure: &DataStructure,
        ordering: &Ordering,
        resolve: impl Fn(&str) -> Result<String>,
    ) -> Result<Self> {
        let mut positions = Vec::with_capacity(ordering.len());
        let mut names = Vec::with_capacity(ordering.len());
        for logical in ordering.columns() {
            let local = resolve(logical)?;
            let pos = structure
                .index_of(&local)
                .ok_or_else(|| Error::UnknownComponent(local.clone()))?;
            positions.push(pos);
            names.push(local);
        }
        Ok(Self { positions, names })
    }

    /// Key columns of `structure` named as in `ordering`.
    pub fn by_name(structure: &DataStructure, ordering: &Ordering) -> Result<Self> {
        Self::new(structure, ordering, |name| Ok(name.to_string()))
    }

    /// Fails with `Error::Invariant` when the row's layout does not put the
    /// key columns where its source declared them.
    pub fn extract(&self, point: &DataPoint) -> Result<Vec<Value>> {
        self.positions
            .iter()
            .zip(self.names.iter())
            .map(|(&pos, name)| {
                let bound = point.structure().components().get(pos).map(|c| c.name());
                if bound != Some(name.as_str()) {
                    return Err(Error::Invariant(format!(
                        "row {point} does not hold key column '{name}' at position {pos}"
                    )));
                }
                point.get_at(pos).cloned().ok_or_else(|| {
                    Error::Structure(format!("row {point} has no key column at {pos}"))
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use vtlset_core::prelude::{Role, ValueType};

    fn structure(names: &[(&str, Role, ValueType)]) -> Arc<DataStructure> {
        Arc::new(DataStructure::try_new(names.iter().cloned()).unwrap())
    }

    #[test]
    fn extracts_in_ordering_order() {
        let s = structure(&[
            ("time", Role::Identifier, ValueType::Integer),
            ("geo", Role::Identifier, ValueType::String),
            ("m1", Role::Measure, ValueType::Integer),
        ]);
        let ordering = Ordering::ascending([s.get("geo").unwrap(), s.get("time").unwrap()]);
        let keys = KeyExtractor::by_name(&s, &ordering).unwrap();
        let point = s
            .wrap([("time", Value::from(2010_i64)), ("geo", Value::from("NO"))])
            .unwrap();
        assert_eq!(keys.extract(&point).unwrap(), vec![Value::from("NO"), Value::from(2010_i64)]);
    }

    #[test]
    fn row_of_another_layout_is_rejected() {
        let declared = structure(&[
            ("time", Role::Identifier, ValueType::Integer),
            ("m1", Role::Measure, ValueType::Integer),
        ]);
        let reordered = structure(&[
            ("m1", Role::Measure, ValueType::Integer),
            ("time", Role::Identifier, ValueType::Integer),
        ]);
        let keys = KeyExtractor::by_name(&declared, &Ordering::ascending([declared.get("time").unwrap()]))
            .unwrap();
        let point = reordered
            .wrap([("time", Value::from(2010_i64)), ("m1", Value::from(20_i64))])
            .unwrap();
        assert!(matches!(keys.extract(&point), Err(Error::Invariant(_))));
    }
}
