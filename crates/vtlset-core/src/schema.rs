//! Logical schema types: role-tagged components and immutable data structures.
//!
//! Structures are built once per operation and shared behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::datapoint::DataPoint;
use crate::error::{Error, Result};
use crate::hash::{fingerprint, Hash256};
use crate::value::{Value, ValueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Identifier,
    Measure,
    Attribute,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Identifier => "identifier",
            Role::Measure => "measure",
            Role::Attribute => "attribute",
        };
        f.write_str(name)
    }
}

/// A named, typed, role-tagged column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Component {
    name: String,
    role: Role,
    value_type: ValueType,
}

impl Component {
    pub fn new(name: impl Into<String>, role: Role, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            role,
            value_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn is_identifier(&self) -> bool {
        self.role == Role::Identifier
    }

    pub fn is_measure(&self) -> bool {
        self.role == Role::Measure
    }

    pub fn is_attribute(&self) -> bool {
        self.role == Role::Attribute
    }

    /// Same role and type, regardless of name.
    pub fn is_compatible_with(&self, other: &Component) -> bool {
        self.role == other.role && self.value_type == other.value_type
    }
}

/// Immutable ordered set of uniquely named components.
#[derive(Debug, Clone)]
pub struct DataStructure {
    components: Vec<Arc<Component>>,
    index: HashMap<String, usize>,
    fingerprint: Hash256,
}

impl DataStructure {
    /// Build a structure from `(name, role, type)` triples. Fails on a repeated name.
    pub fn try_new<N: Into<String>>(
        triples: impl IntoIterator<Item = (N, Role, ValueType)>,
    ) -> Result<Self> {
        Self::from_components(
            triples
                .into_iter()
                .map(|(name, role, ty)| Arc::new(Component::new(name, role, ty))),
        )
    }

    pub fn from_components(components: impl IntoIterator<Item = Arc<Component>>) -> Result<Self> {
        let components: Vec<Arc<Component>> = components.into_iter().collect();
        let mut index = HashMap::with_capacity(components.len());
        for (pos, component) in components.iter().enumerate() {
            if index.insert(component.name().to_string(), pos).is_some() {
                return Err(Error::DuplicateComponent(component.name().to_string()));
            }
        }

        let fingerprint = fingerprint(components.iter().map(|c| c.as_ref()));

        Ok(Self {
            components,
            index,
            fingerprint,
        })
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Arc<Component>] {
        &self.components
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Component>> {
        self.index.get(name).map(|&pos| &self.components[pos])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn fingerprint(&self) -> Hash256 {
        self.fingerprint
    }

    /// Same components at the same positions. Stricter than `==`, which
    /// ignores declaration order.
    pub fn has_layout_of(&self, other: &DataStructure) -> bool {
        self.fingerprint == other.fingerprint
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a.name() == b.name())
    }

    fn with_role(&self, role: Role) -> impl Iterator<Item = &Arc<Component>> {
        self.components.iter().filter(move |c| c.role() == role)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &Arc<Component>> {
        self.with_role(Role::Identifier)
    }

    pub fn measures(&self) -> impl Iterator<Item = &Arc<Component>> {
        self.with_role(Role::Measure)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Arc<Component>> {
        self.with_role(Role::Attribute)
    }

    /// Keep only the named components, in this structure's order.
    pub fn project(&self, names: &[&str]) -> Result<DataStructure> {
        for name in names {
            if !self.contains(name) {
                return Err(Error::UnknownComponent(name.to_string()));
            }
        }
        Self::from_components(
            self.components
                .iter()
                .filter(|c| names.contains(&c.name()))
                .cloned(),
        )
    }

    /// Compose the structure of an operation over `self` and `other`.
    ///
    /// Same-named identifiers unify into one output identifier. Any other
    /// same-named pair must agree on role and type.
    pub fn merge(&self, other: &DataStructure) -> Result<DataStructure> {
        let mut merged: Vec<Arc<Component>> = self.components.clone();
        for component in &other.components {
            match self.get(component.name()) {
                None => merged.push(Arc::clone(component)),
                Some(existing) if existing.is_compatible_with(component) => {}
                Some(existing) => {
                    return Err(Error::SchemaConflict {
                        name: component.name().to_string(),
                        left_role: existing.role(),
                        left_type: existing.value_type(),
                        right_role: component.role(),
                        right_type: component.value_type(),
                    })
                }
            }
        }
        // Identifiers lead so that keys read naturally in output rows.
        merged.sort_by_key(|c| c.role() != Role::Identifier);
        Self::from_components(merged)
    }

    /// Build a data point from values by name. Absent components become typed nulls.
    pub fn wrap<N, V>(
        self: &Arc<Self>,
        values: impl IntoIterator<Item = (N, V)>,
    ) -> Result<DataPoint>
    where
        N: AsRef<str>,
        V: Into<Value>,
    {
        let mut row: Vec<Value> = self
            .components
            .iter()
            .map(|c| Value::null(c.value_type()))
            .collect();
        for (name, value) in values {
            let pos = self
                .index_of(name.as_ref())
                .ok_or_else(|| Error::UnknownComponent(name.as_ref().to_string()))?;
            row[pos] = value.into();
        }
        DataPoint::try_new(Arc::clone(self), row)
    }

    /// An all-null row of this structure.
    pub fn null_point(self: &Arc<Self>) -> DataPoint {
        DataPoint::from_trusted(
            Arc::clone(self),
            self.components
                .iter()
                .map(|c| Value::null(c.value_type()))
                .collect(),
        )
    }
}

impl PartialEq for DataStructure {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl Eq for DataStructure {}

impl fmt::Display for DataStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {} {}", c.name(), c.role(), c.value_type())?;
        }
        f.write_str("]")
    }
}
