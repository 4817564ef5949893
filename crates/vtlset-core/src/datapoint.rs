//! Rows bound positionally to one data structure.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::schema::DataStructure;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct DataPoint {
    structure: Arc<DataStructure>,
    values: Vec<Value>,
}

impl DataPoint {
    /// Bind `values` to `structure`, checking arity and per-position type.
    pub fn try_new(structure: Arc<DataStructure>, values: Vec<Value>) -> Result<Self> {
        if values.len() != structure.len() {
            return Err(Error::Structure(format!(
                "expected {} values, got {}",
                structure.len(),
                values.len()
            )));
        }
        for (component, value) in structure.components().iter().zip(values.iter()) {
            if component.value_type() != value.value_type() {
                return Err(Error::Structure(format!(
                    "component '{}' is {} but value is {}",
                    component.name(),
                    component.value_type(),
                    value.value_type()
                )));
            }
        }
        Ok(Self { structure, values })
    }

    /// Bind without checks. Operators use this for rows they assemble from
    /// already validated inputs.
    pub fn from_trusted(structure: Arc<DataStructure>, values: Vec<Value>) -> Self {
        debug_assert_eq!(structure.len(), values.len());
        Self { structure, values }
    }

    /// Rebind to `target`, an equal structure possibly declared in another
    /// order. Values are moved to `target`'s positions by name.
    pub fn rebind(self, target: &Arc<DataStructure>) -> Result<Self> {
        if Arc::ptr_eq(&self.structure, target) {
            return Ok(self);
        }
        if self.structure.has_layout_of(target) {
            return Ok(Self {
                structure: Arc::clone(target),
                values: self.values,
            });
        }
        if *self.structure != **target {
            return Err(Error::Structure(format!(
                "row {self} is bound to {}, cannot rebind to {target}",
                self.structure
            )));
        }
        let values = target
            .components()
            .iter()
            .map(|c| {
                self.get(c.name())
                    .cloned()
                    .ok_or_else(|| Error::UnknownComponent(c.name().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            structure: Arc::clone(target),
            values,
        })
    }

    pub fn structure(&self) -> &Arc<DataStructure> {
        &self.structure
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.structure.index_of(name).map(|pos| &self.values[pos])
    }

    pub fn get_at(&self, pos: usize) -> Option<&Value> {
        self.values.get(pos)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for DataPoint {
    fn eq(&self, other: &Self) -> bool {
        if self.structure.fingerprint() != other.structure.fingerprint() {
            return false;
        }
        // Same components, possibly declared in another order.
        self.structure
            .components()
            .iter()
            .zip(self.values.iter())
            .all(|(component, value)| other.get(component.name()) == Some(value))
    }
}

impl Eq for DataPoint {}

impl Hash for DataPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.structure.fingerprint().hash(state);
        // Name order keeps the hash stable across declaration orders.
        let mut pairs: Vec<(&str, &Value)> = self
            .structure
            .components()
            .iter()
            .map(|c| c.name())
            .zip(self.values.iter())
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs.hash(state);
    }
}

impl fmt::Display for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}
