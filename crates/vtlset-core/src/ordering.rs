//! Declarative sort keys.
//!
//! An `Ordering` is what a caller asks a dataset for, or what a producer
//! reports it actually applied. Keys are bound to components; rebinding onto
//! another structure goes by component name.

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::datapoint::DataPoint;
use crate::error::{Error, Result};
use crate::schema::{Component, DataStructure};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn apply(self, ordering: CmpOrdering) -> CmpOrdering {
        match self {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub component: Arc<Component>,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ordering {
    keys: Vec<OrderKey>,
}

impl Ordering {
    /// No ordering requirement.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(keys: Vec<OrderKey>) -> Self {
        Self { keys }
    }

    /// Ascending on each component, in the given order.
    pub fn ascending<'a>(components: impl IntoIterator<Item = &'a Arc<Component>>) -> Self {
        components
            .into_iter()
            .fold(Self::any(), |o, c| o.then(Arc::clone(c), Direction::Asc))
    }

    pub fn then(mut self, component: Arc<Component>, direction: Direction) -> Self {
        self.keys.push(OrderKey {
            component,
            direction,
        });
        self
    }

    pub fn keys(&self) -> &[OrderKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.component.name())
    }

    /// Rows ordered by `provided` are also ordered by `self` when `self` is a
    /// prefix of `provided`.
    pub fn is_satisfied_by(&self, provided: &Ordering) -> bool {
        self.keys.len() <= provided.keys.len()
            && self.keys.iter().zip(provided.keys.iter()).all(|(want, have)| {
                want.component.name() == have.component.name() && want.direction == have.direction
            })
    }

    /// Rebind every key onto the same-named component of `structure`.
    pub fn project_onto(&self, structure: &DataStructure) -> Result<Ordering> {
        let keys = self
            .keys
            .iter()
            .map(|k| {
                structure
                    .get(k.component.name())
                    .map(|local| OrderKey {
                        component: Arc::clone(local),
                        direction: k.direction,
                    })
                    .ok_or_else(|| Error::UnknownComponent(k.component.name().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Ordering { keys })
    }

    /// Compare two rows. Keys a row's structure lacks compare equal.
    pub fn compare(&self, a: &DataPoint, b: &DataPoint) -> CmpOrdering {
        for key in &self.keys {
            let name = key.component.name();
            let ord = match (a.get(name), b.get(name)) {
                (Some(x), Some(y)) => x.collate(y),
                _ => CmpOrdering::Equal,
            };
            if ord != CmpOrdering::Equal {
                return key.direction.apply(ord);
            }
        }
        CmpOrdering::Equal
    }

    /// Compare two extracted key tuples positionally under this ordering's directions.
    pub fn compare_keys(&self, a: &[Value], b: &[Value]) -> CmpOrdering {
        for ((key, x), y) in self.keys.iter().zip(a.iter()).zip(b.iter()) {
            let ord = x.collate(y);
            if ord != CmpOrdering::Equal {
                return key.direction.apply(ord);
            }
        }
        CmpOrdering::Equal
    }

    /// Stable in-place sort.
    pub fn sort(&self, rows: &mut [DataPoint]) {
        rows.sort_by(|a, b| self.compare(a, b));
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.keys.is_empty() {
            return f.write_str("<any>");
        }
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let dir = match key.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            write!(f, "{} {}", key.component.name(), dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Role;
    use crate::value::ValueType;

    fn structure() -> Arc<DataStructure> {
        Arc::new(
            DataStructure::try_new([
                ("time", Role::Identifier, ValueType::String),
                ("geo", Role::Identifier, ValueType::String),
                ("m1", Role::Measure, ValueType::Integer),
            ])
            .unwrap(),
        )
    }

    fn component(s: &DataStructure, name: &str) -> Arc<Component> {
        Arc::clone(s.get(name).unwrap())
    }

    #[test]
    fn prefix_satisfies() {
        let s = structure();
        let time_geo = Ordering::any()
            .then(component(&s, "time"), Direction::Asc)
            .then(component(&s, "geo"), Direction::Asc);
        let time = Ordering::any().then(component(&s, "time"), Direction::Asc);
        let time_desc = Ordering::any().then(component(&s, "time"), Direction::Desc);

        assert!(time.is_satisfied_by(&time_geo));
        assert!(!time_geo.is_satisfied_by(&time));
        assert!(!time_desc.is_satisfied_by(&time_geo));
        assert!(Ordering::any().is_satisfied_by(&Ordering::any()));
    }

    #[test]
    fn sort_respects_direction() {
        let s = structure();
        let mut rows = vec![
            s.wrap([("time", "2010"), ("geo", "NO")]).unwrap(),
            s.wrap([("time", "2011"), ("geo", "SE")]).unwrap(),
            s.wrap([("time", "2010"), ("geo", "SE")]).unwrap(),
        ];
        let ordering = Ordering::any()
            .then(component(&s, "time"), Direction::Desc)
            .then(component(&s, "geo"), Direction::Asc);
        ordering.sort(&mut rows);

        let keys: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            keys,
            vec!["(2011, SE, null)", "(2010, NO, null)", "(2010, SE, null)"]
        );
    }

    #[test]
    fn project_onto_rebinds_by_name() {
        let s = structure();
        let other = DataStructure::try_new([
            ("geo", Role::Identifier, ValueType::String),
            ("m2", Role::Measure, ValueType::Float),
        ])
        .unwrap();
        let geo = Ordering::any().then(component(&s, "geo"), Direction::Asc);
        let projected = geo.project_onto(&other).unwrap();
        assert!(Arc::ptr_eq(
            &projected.keys()[0].component,
            other.get("geo").unwrap()
        ));

        let time = Ordering::any().then(component(&s, "time"), Direction::Asc);
        assert!(time.project_onto(&other).is_err());
    }
}
