//! Row predicates passed down to data producers.
//!
//! Comparisons with a null operand are unknown; a row whose predicate is
//! unknown is not kept.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::datapoint::DataPoint;
use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn matches(self, ord: CmpOrdering) -> bool {
        match self {
            CompareOp::Eq => ord == CmpOrdering::Equal,
            CompareOp::Ne => ord != CmpOrdering::Equal,
            CompareOp::Lt => ord == CmpOrdering::Less,
            CompareOp::Le => ord != CmpOrdering::Greater,
            CompareOp::Gt => ord == CmpOrdering::Greater,
            CompareOp::Ge => ord != CmpOrdering::Less,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filtering {
    /// Keep every row.
    #[default]
    All,
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    IsNull {
        column: String,
    },
    And {
        terms: Vec<Filtering>,
    },
    Or {
        terms: Vec<Filtering>,
    },
    Not {
        term: Box<Filtering>,
    },
}

impl Filtering {
    pub fn all() -> Self {
        Filtering::All
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Filtering::All)
    }

    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Filtering::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Filtering::IsNull {
            column: column.into(),
        }
    }

    pub fn and(self, other: Filtering) -> Self {
        match (self, other) {
            (Filtering::All, f) | (f, Filtering::All) => f,
            (Filtering::And { mut terms }, f) => {
                terms.push(f);
                Filtering::And { terms }
            }
            (a, b) => Filtering::And { terms: vec![a, b] },
        }
    }

    pub fn or(self, other: Filtering) -> Self {
        Filtering::Or {
            terms: vec![self, other],
        }
    }

    pub fn negate(self) -> Self {
        Filtering::Not {
            term: Box::new(self),
        }
    }

    /// Names of every column the predicate reads.
    pub fn columns(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Filtering::All => {}
            Filtering::Compare { column, .. } | Filtering::IsNull { column } => {
                out.insert(column.as_str());
            }
            Filtering::And { terms } | Filtering::Or { terms } => {
                for t in terms {
                    t.collect_columns(out);
                }
            }
            Filtering::Not { term } => term.collect_columns(out),
        }
    }

    pub fn refers_only_to<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        let allowed: BTreeSet<&str> = names.into_iter().collect();
        self.columns().iter().all(|c| allowed.contains(c))
    }

    /// Whether `point` is kept.
    pub fn evaluate(&self, point: &DataPoint) -> Result<bool> {
        Ok(self.evaluate3(point)?.unwrap_or(false))
    }

    // Three-valued evaluation; `None` is unknown.
    fn evaluate3(&self, point: &DataPoint) -> Result<Option<bool>> {
        match self {
            Filtering::All => Ok(Some(true)),
            Filtering::Compare { column, op, value } => {
                let actual = point
                    .get(column)
                    .ok_or_else(|| Error::UnknownComponent(column.clone()))?;
                Ok(actual.compare(value)?.map(|ord| op.matches(ord)))
            }
            Filtering::IsNull { column } => point
                .get(column)
                .map(|v| Some(v.is_null()))
                .ok_or_else(|| Error::UnknownComponent(column.clone())),
            Filtering::And { terms } => {
                let mut result = Some(true);
                for t in terms {
                    match t.evaluate3(point)? {
                        Some(false) => return Ok(Some(false)),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                Ok(result)
            }
            Filtering::Or { terms } => {
                let mut result = Some(false);
                for t in terms {
                    match t.evaluate3(point)? {
                        Some(true) => return Ok(Some(true)),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                Ok(result)
            }
            Filtering::Not { term } => Ok(term.evaluate3(point)?.map(|b| !b)),
        }
    }
}
