//! Null-aware typed values.
//!
//! Every variant wraps either a present value or a typed null (`None`). A null
//! integer and a null string are different values. Operations never coerce
//! across variants: mixing them is a `Type` error.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Integer,
    Float,
    String,
    Boolean,
    Object,
}

impl ValueType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Float)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Object => "object",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Integer(Option<i64>),
    Float(Option<f64>),
    String(Option<String>),
    Boolean(Option<bool>),
    Object(Option<serde_json::Value>),
}

impl Value {
    /// The typed null of `ty`.
    pub fn null(ty: ValueType) -> Self {
        match ty {
            ValueType::Integer => Value::Integer(None),
            ValueType::Float => Value::Float(None),
            ValueType::String => Value::String(None),
            ValueType::Boolean => Value::Boolean(None),
            ValueType::Object => Value::Object(None),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Object(_) => ValueType::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Integer(v) => v.is_none(),
            Value::Float(v) => v.is_none(),
            Value::String(v) => v.is_none(),
            Value::Boolean(v) => v.is_none(),
            Value::Object(v) => v.is_none(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => *v,
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => *v,
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => v.as_deref(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => *v,
            _ => None,
        }
    }

    fn type_error(&self, operation: &'static str, other: &Value) -> Error {
        Error::Type {
            operation,
            left: self.value_type(),
            right: other.value_type(),
        }
    }

    fn expect_same_type(&self, operation: &'static str, other: &Value) -> Result<()> {
        if self.value_type() == other.value_type() {
            Ok(())
        } else {
            Err(self.type_error(operation, other))
        }
    }

    /// Total order used for sorting and merge keys.
    ///
    /// Nulls sort before present values of the same variant. Values of
    /// different variants order by variant rank; callers validate key types
    /// before relying on this.
    pub fn collate(&self, other: &Value) -> Ordering {
        fn nulls_first<T>(a: &Option<T>, b: &Option<T>, f: impl Fn(&T, &T) -> Ordering) -> Ordering {
            match (a, b) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => f(x, y),
            }
        }

        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => nulls_first(a, b, |x, y| x.cmp(y)),
            (Value::Float(a), Value::Float(b)) => {
                nulls_first(a, b, |x, y| canonical_float(*x).total_cmp(&canonical_float(*y)))
            }
            (Value::String(a), Value::String(b)) => nulls_first(a, b, |x, y| x.cmp(y)),
            (Value::Boolean(a), Value::Boolean(b)) => nulls_first(a, b, |x, y| x.cmp(y)),
            (Value::Object(a), Value::Object(b)) => {
                nulls_first(a, b, |x, y| x.to_string().cmp(&y.to_string()))
            }
            _ => self.value_type().cmp(&other.value_type()),
        }
    }

    /// Comparison with null propagation: `None` when either side is null.
    pub fn compare(&self, other: &Value) -> Result<Option<Ordering>> {
        self.expect_same_type("compare", other)?;
        if self.is_null() || other.is_null() {
            return Ok(None);
        }
        Ok(Some(self.collate(other)))
    }

    /// Equality as a boolean value; null when either side is null.
    pub fn equals(&self, other: &Value) -> Result<Value> {
        Ok(Value::Boolean(
            self.compare(other)?.map(|o| o == Ordering::Equal),
        ))
    }

    fn numeric(
        &self,
        other: &Value,
        operation: &'static str,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<Value> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => match (a, b) {
                (Some(a), Some(b)) => int_op(*a, *b)
                    .map(|v| Value::Integer(Some(v)))
                    .ok_or_else(|| {
                        Error::Arithmetic(format!("integer {operation} of {a} and {b} failed"))
                    }),
                _ => Ok(Value::Integer(None)),
            },
            (Value::Float(a), Value::Float(b)) => {
                Ok(Value::Float(a.zip(*b).map(|(a, b)| float_op(a, b))))
            }
            _ => Err(self.type_error(operation, other)),
        }
    }

    pub fn add(&self, other: &Value) -> Result<Value> {
        self.numeric(other, "addition", i64::checked_add, |a, b| a + b)
    }

    pub fn subtract(&self, other: &Value) -> Result<Value> {
        self.numeric(other, "subtraction", i64::checked_sub, |a, b| a - b)
    }

    pub fn multiply(&self, other: &Value) -> Result<Value> {
        self.numeric(other, "multiplication", i64::checked_mul, |a, b| a * b)
    }

    /// Integer division truncates; dividing an integer by zero is an error.
    pub fn divide(&self, other: &Value) -> Result<Value> {
        self.numeric(other, "division", i64::checked_div, |a, b| a / b)
    }

    pub fn negate(&self) -> Result<Value> {
        match self {
            Value::Integer(Some(v)) => v
                .checked_neg()
                .map(|v| Value::Integer(Some(v)))
                .ok_or_else(|| Error::Arithmetic(format!("integer negation of {v} failed"))),
            Value::Integer(None) => Ok(Value::Integer(None)),
            Value::Float(v) => Ok(Value::Float(v.map(|v| -v))),
            _ => Err(self.type_error("negation", self)),
        }
    }

    pub fn concat(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(
                a.as_ref().zip(b.as_ref()).map(|(a, b)| format!("{a}{b}")),
            )),
            _ => Err(self.type_error("concatenation", other)),
        }
    }

    pub fn and(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => {
                Ok(Value::Boolean(a.zip(*b).map(|(a, b)| a && b)))
            }
            _ => Err(self.type_error("and", other)),
        }
    }

    pub fn or(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => {
                Ok(Value::Boolean(a.zip(*b).map(|(a, b)| a || b)))
            }
            _ => Err(self.type_error("or", other)),
        }
    }

    pub fn not(&self) -> Result<Value> {
        match self {
            Value::Boolean(v) => Ok(Value::Boolean(v.map(|v| !v))),
            _ => Err(self.type_error("not", self)),
        }
    }
}

/// Folds `-0.0` onto `0.0` and every NaN onto one NaN so equality, hashing and
/// ordering agree.
fn canonical_float(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                a.map(|v| canonical_float(v).to_bits()) == b.map(|v| canonical_float(v).to_bits())
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value_type().hash(state);
        match self {
            Value::Integer(v) => v.hash(state),
            Value::Float(v) => v.map(|v| canonical_float(v).to_bits()).hash(state),
            Value::String(v) => v.hash(state),
            Value::Boolean(v) => v.hash(state),
            Value::Object(v) => v.as_ref().map(|v| v.to_string()).hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(Some(v)) => write!(f, "{v}"),
            Value::Float(Some(v)) => write!(f, "{v}"),
            Value::String(Some(v)) => write!(f, "{v}"),
            Value::Boolean(Some(v)) => write!(f, "{v}"),
            Value::Object(Some(v)) => write!(f, "{v}"),
            _ => f.write_str("null"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(Some(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(Some(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(Some(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Some(v.to_string()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Some(v))
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Object(Some(v))
    }
}
