//! Error types for profile handling.

use atmo_units::UnitsError;
use thiserror::Error;

/// Errors that can occur while building or transforming a profile.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// Missing units or incompatible dimensionality.
    #[error(transparent)]
    Units(#[from] UnitsError),

    /// The dataset violates a structural or metadata invariant.
    #[error("schema error: {0}")]
    Schema(String),

    /// Interpolation altitudes outside the source altitude range.
    #[error("altitude(s) {requested} outside of profile altitude range [{min}, {max}] {units}")]
    OutOfBounds {
        requested: String,
        min: f64,
        max: f64,
        units: String,
    },

    /// No finite scaling factor exists, or applying it breaks the dataset.
    #[error("cannot rescale: {0}")]
    RescaleImpossible(String),

    /// An argument has an invalid or unsupported value.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// No profile is registered under this identifier.
    #[error("profile '{0}' does not exist in the registry")]
    UnknownProfile(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ProfileError {
    /// Create a Schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a RescaleImpossible error.
    pub fn rescale_impossible(msg: impl Into<String>) -> Self {
        Self::RescaleImpossible(msg.into())
    }

    /// Create an InvalidValue error.
    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    /// Create an OutOfBounds error.
    pub fn out_of_bounds(requested: &[f64], min: f64, max: f64, units: impl Into<String>) -> Self {
        Self::OutOfBounds {
            requested: format!("{:?}", requested),
            min,
            max,
            units: units.into(),
        }
    }
}

impl From<std::io::Error> for ProfileError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ProfileError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for ProfileError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for profile operations.
pub type Result<T> = std::result::Result<T, ProfileError>;
