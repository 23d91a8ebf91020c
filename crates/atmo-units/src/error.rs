//! Error types for unit handling.

use thiserror::Error;

/// Result type alias using UnitsError.
pub type UnitsResult<T> = Result<T, UnitsError>;

/// Errors raised while attaching, parsing or converting units.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitsError {
    /// No unit is present on the value and none was supplied.
    #[error("missing units: {0}")]
    MissingUnits(String),

    /// The physical dimensions of two units do not match.
    #[error("cannot convert from '{from}' ({from_dimension}) to '{to}' ({to_dimension})")]
    Dimensionality {
        from: String,
        from_dimension: String,
        to: String,
        to_dimension: String,
    },

    /// A symbol in a unit expression is not known.
    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    /// A unit expression could not be parsed.
    #[error("invalid unit expression '{expr}': {reason}")]
    InvalidExpression { expr: String, reason: String },

    /// A quantity string could not be parsed.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),
}

impl UnitsError {
    /// Create an InvalidExpression error.
    pub fn invalid_expression(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidExpression {
            expr: expr.into(),
            reason: reason.into(),
        }
    }
}
