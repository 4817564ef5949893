//! Structure fingerprints.
//!
//! A fingerprint is a blake3 digest over a structure's components taken in
//! name order, so two structures declaring the same components in a
//! different order share it.

use std::fmt;

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use crate::schema::{Component, Role};
use crate::value::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn role_tag(role: Role) -> u8 {
    match role {
        Role::Identifier => 0,
        Role::Measure => 1,
        Role::Attribute => 2,
    }
}

fn type_tag(ty: ValueType) -> u8 {
    match ty {
        ValueType::Integer => 0,
        ValueType::Float => 1,
        ValueType::String => 2,
        ValueType::Boolean => 3,
        ValueType::Object => 4,
    }
}

/// Fingerprint of a set of components, independent of their order.
pub fn fingerprint<'a>(components: impl IntoIterator<Item = &'a Component>) -> Hash256 {
    let mut sorted: Vec<&Component> = components.into_iter().collect();
    sorted.sort_by(|a, b| a.name().cmp(b.name()));

    let mut hasher = Hasher::new();
    hasher.update(&(sorted.len() as u64).to_le_bytes());
    for c in sorted {
        // Length prefix keeps ("ab", "c") apart from ("a", "bc").
        hasher.update(&(c.name().len() as u64).to_le_bytes());
        hasher.update(c.name().as_bytes());
        hasher.update(&[role_tag(c.role()), type_tag(c.value_type())]);
    }
    Hash256(hasher.finalize().into())
}
