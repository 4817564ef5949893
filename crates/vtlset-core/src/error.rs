use thiserror::Error;

use crate::schema::Role;
use crate::value::ValueType;

/// Canonical result for core and operators.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A requested ordering or filtering cannot be honoured by an operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("schema conflict on component '{name}': {left_role}/{left_type} vs {right_role}/{right_type}")]
    SchemaConflict {
        name: String,
        left_role: Role,
        left_type: ValueType,
        right_role: Role,
        right_type: ValueType,
    },

    #[error("duplicate component '{0}' in data structure")]
    DuplicateComponent(String),

    #[error("unknown component '{0}'")]
    UnknownComponent(String),

    #[error("illegal argument: {0}")]
    Argument(String),

    #[error("type error: cannot apply {operation} to {left} and {right}")]
    Type {
        operation: &'static str,
        left: ValueType,
        right: ValueType,
    },

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// A data point does not conform to the structure it is bound to.
    #[error("data point does not match structure: {0}")]
    Structure(String),

    /// Releasing an upstream source failed.
    #[error("failed to close source '{source_name}': {message}")]
    Close {
        source_name: String,
        message: String,
    },

    #[error("Internal invariant failed: {0}")]
    Invariant(String),

    #[error("{primary} ({} suppressed)", suppressed.len())]
    Suppressed {
        primary: Box<Error>,
        suppressed: Vec<Error>,
    },
}

impl Error {
    /// Attach `other` as a secondary failure. The receiver stays the primary error.
    pub fn suppress(self, other: Error) -> Error {
        match self {
            Error::Suppressed {
                primary,
                mut suppressed,
            } => {
                suppressed.push(other);
                Error::Suppressed {
                    primary,
                    suppressed,
                }
            }
            primary => Error::Suppressed {
                primary: Box::new(primary),
                suppressed: vec![other],
            },
        }
    }

    /// The error that caused the failure, ignoring anything suppressed onto it.
    pub fn primary(&self) -> &Error {
        match self {
            Error::Suppressed { primary, .. } => primary,
            other => other,
        }
    }

    pub fn suppressed(&self) -> &[Error] {
        match self {
            Error::Suppressed { suppressed, .. } => suppressed,
            _ => &[],
        }
    }

    /// Split into the primary error and everything suppressed onto it.
    pub fn into_parts(self) -> (Error, Vec<Error>) {
        match self {
            Error::Suppressed {
                primary,
                suppressed,
            } => (*primary, suppressed),
            other => (other, Vec::new()),
        }
    }

    /// Attach `other` and everything suppressed onto it as secondaries of `self`.
    pub fn suppress_all(self, other: Error) -> Error {
        let (first, rest) = other.into_parts();
        rest.into_iter()
            .fold(self.suppress(first), |acc, e| acc.suppress(e))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self.primary(), Error::Unsupported(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppress_keeps_primary_and_collects_secondaries() {
        let err = Error::Unsupported("outer join".into())
            .suppress(Error::Close {
                source_name: "a".into(),
                message: "boom".into(),
            })
            .suppress(Error::Close {
                source_name: "b".into(),
                message: "bang".into(),
            });

        assert!(err.is_unsupported());
        assert_eq!(err.suppressed().len(), 2);
        assert_eq!(
            err.to_string(),
            "unsupported operation: outer join (2 suppressed)"
        );
    }

    #[test]
    fn plain_error_has_no_suppressed() {
        let err = Error::Argument("no measure".into());
        assert!(err.suppressed().is_empty());
        assert!(matches!(err.primary(), Error::Argument(_)));
    }
}
