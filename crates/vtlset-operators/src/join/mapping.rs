//! Resolution of a logical identifier to its component inside each source.

use std::collections::HashMap;
use std::sync::Arc;

use vtlset_core::prelude::{Component, DataStructure, Error, Result};

/// `(logical name, dataset name) -> local component`.
#[derive(Debug, Clone, Default)]
pub struct ComponentMapping {
    table: HashMap<(String, String), Arc<Component>>,
}

impl ComponentMapping {
    /// Map every identifier in `identifiers` into every source.
    ///
    /// Each source must carry a same-named component of identical role and
    /// type; a missing one is `UnknownComponent`, a mismatched one a
    /// `SchemaConflict`.
    pub fn build<'a>(
        identifiers: &[Arc<Component>],
        sources: impl IntoIterator<Item = (&'a str, &'a DataStructure)>,
    ) -> Result<Self> {
        let mut table = HashMap::new();
        for (dataset, structure) in sources {
            for identifier in identifiers {
                let local = structure.get(identifier.name()).ok_or_else(|| {
                    Error::UnknownComponent(format!("{} in dataset {}", identifier.name(), dataset))
                })?;
                if !local.is_compatible_with(identifier) {
                    return Err(Error::SchemaConflict {
                        name: identifier.name().to_string(),
                        left_role: identifier.role(),
                        left_type: identifier.value_type(),
                        right_role: local.role(),
                        right_type: local.value_type(),
                    });
                }
                table.insert(
                    (identifier.name().to_string(), dataset.to_string()),
                    Arc::clone(local),
                );
            }
        }
        Ok(Self { table })
    }

    pub fn get(&self, logical: &str, dataset: &str) -> Option<&Arc<Component>> {
        self.table.get(&(logical.to_string(), dataset.to_string()))
    }

    /// Like `get`, failing with `UnknownComponent` when unmapped.
    pub fn resolve(&self, logical: &str, dataset: &str) -> Result<&Arc<Component>> {
        self.get(logical, dataset)
            .ok_or_else(|| Error::UnknownComponent(format!("{logical} in dataset {dataset}")))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
