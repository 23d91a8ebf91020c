//! Quantities: magnitude arrays paired with a unit.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dimension::Dimension;
use crate::error::{UnitsError, UnitsResult};
use crate::unit::Unit;

/// A one-dimensional array of magnitudes with a unit.
///
/// Scalars are quantities of length one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    magnitude: Vec<f64>,
    units: Unit,
}

impl Quantity {
    pub fn new(magnitude: Vec<f64>, units: Unit) -> Self {
        Self { magnitude, units }
    }

    /// Parse `units` and attach it to `magnitude`.
    pub fn with_units(magnitude: Vec<f64>, units: &str) -> UnitsResult<Self> {
        Ok(Self::new(magnitude, Unit::parse(units)?))
    }

    pub fn scalar(value: f64, units: &str) -> UnitsResult<Self> {
        Self::with_units(vec![value], units)
    }

    pub fn dimensionless(magnitude: Vec<f64>) -> Self {
        Self::new(magnitude, Unit::dimensionless())
    }

    pub fn magnitude(&self) -> &[f64] {
        &self.magnitude
    }

    pub fn into_magnitude(self) -> Vec<f64> {
        self.magnitude
    }

    pub fn units(&self) -> &Unit {
        &self.units
    }

    pub fn dimension(&self) -> Dimension {
        self.units.dimension()
    }

    pub fn len(&self) -> usize {
        self.magnitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitude.is_empty()
    }

    /// Convert to another unit.
    pub fn to(&self, units: &str) -> UnitsResult<Quantity> {
        self.to_unit(&Unit::parse(units)?)
    }

    pub fn to_unit(&self, units: &Unit) -> UnitsResult<Quantity> {
        Ok(Quantity::new(
            self.units.convert(&self.magnitude, units)?,
            units.clone(),
        ))
    }

    /// Convert to coherent SI units of the same dimension.
    pub fn to_base_units(&self) -> UnitsResult<Quantity> {
        self.to_unit(&Unit::base(self.dimension()))
    }

    /// Magnitudes expressed in `units`.
    pub fn m_as(&self, units: &str) -> UnitsResult<Vec<f64>> {
        self.units.convert(&self.magnitude, &Unit::parse(units)?)
    }

    /// First magnitude expressed in `units`.
    pub fn value_as(&self, units: &str) -> UnitsResult<f64> {
        self.m_as(units)?
            .first()
            .copied()
            .ok_or_else(|| UnitsError::InvalidQuantity("empty quantity".to_string()))
    }

    /// Check the dimensionality of this quantity.
    pub fn check(&self, dimension: Dimension) -> bool {
        self.dimension() == dimension
    }

    /// Check that this quantity can be converted to `units`.
    pub fn is_compatible_with(&self, units: &str) -> bool {
        Unit::parse(units)
            .map(|u| self.units.is_compatible(&u))
            .unwrap_or(false)
    }

    /// Multiply every magnitude by a dimensionless factor.
    pub fn scale(&self, factor: f64) -> Quantity {
        Quantity::new(
            self.magnitude.iter().map(|v| v * factor).collect(),
            self.units.clone(),
        )
    }

    /// Multiply by a dimensionless array of the same length.
    pub fn scale_by(&self, factors: &[f64]) -> Quantity {
        Quantity::new(
            self.magnitude
                .iter()
                .zip(factors)
                .map(|(v, f)| v * f)
                .collect(),
            self.units.clone(),
        )
    }
}

impl FromStr for Quantity {
    type Err = UnitsError;

    /// Parses `"<number> [unit expression]"`, e.g. `"350 dobson_unit"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (number, units) = match trimmed.split_once(char::is_whitespace) {
            Some((number, units)) => (number, units.trim()),
            None => (trimmed, ""),
        };
        let value = number
            .parse::<f64>()
            .map_err(|_| UnitsError::InvalidQuantity(s.to_string()))?;
        Quantity::scalar(value, units)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.magnitude.as_slice() {
            [value] => write!(f, "{} {}", value, self.units),
            values => write!(f, "{:?} {}", values, self.units),
        }
    }
}

/// An array carrying metadata attributes, one of which may be `units`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggedArray {
    pub values: Vec<f64>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl TaggedArray {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn units(&self) -> Option<&str> {
        self.attrs.get("units").map(String::as_str)
    }
}

/// Anything [`to_quantity`] accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantityLike {
    Quantity(Quantity),
    /// A `{value, units}` mapping.
    Mapping { value: Vec<f64>, units: String },
    /// A bare number, dimensionless unless units are supplied.
    Scalar(f64),
    /// A bare array, dimensionless unless units are supplied.
    Sequence(Vec<f64>),
    /// A tagged array; its `units` attribute is required unless units are supplied.
    Tagged(TaggedArray),
}

impl From<Quantity> for QuantityLike {
    fn from(q: Quantity) -> Self {
        QuantityLike::Quantity(q)
    }
}

impl From<&Quantity> for QuantityLike {
    fn from(q: &Quantity) -> Self {
        QuantityLike::Quantity(q.clone())
    }
}

impl From<f64> for QuantityLike {
    fn from(v: f64) -> Self {
        QuantityLike::Scalar(v)
    }
}

impl From<Vec<f64>> for QuantityLike {
    fn from(v: Vec<f64>) -> Self {
        QuantityLike::Sequence(v)
    }
}

impl From<&[f64]> for QuantityLike {
    fn from(v: &[f64]) -> Self {
        QuantityLike::Sequence(v.to_vec())
    }
}

impl From<TaggedArray> for QuantityLike {
    fn from(t: TaggedArray) -> Self {
        QuantityLike::Tagged(t)
    }
}

/// Convert a value into a [`Quantity`].
///
/// When `units` is given, quantities, mappings and tagged arrays with a
/// `units` attribute are converted to it; scalars, sequences and tagged
/// arrays without the attribute are taken in it. Without `units`, scalars
/// and sequences are dimensionless and a tagged array must carry its own
/// `units` attribute.
pub fn to_quantity(value: impl Into<QuantityLike>, units: Option<&str>) -> UnitsResult<Quantity> {
    let converted = |q: Quantity| match units {
        Some(units) => q.to(units),
        None => Ok(q),
    };

    match value.into() {
        QuantityLike::Quantity(q) => converted(q),
        QuantityLike::Mapping {
            value,
            units: own_units,
        } => converted(Quantity::with_units(value, &own_units)?),
        QuantityLike::Scalar(v) => from_magnitude(vec![v], units),
        QuantityLike::Sequence(values) => from_magnitude(values, units),
        QuantityLike::Tagged(tagged) => match tagged.units() {
            Some(own_units) => {
                let own_units = own_units.to_string();
                converted(Quantity::with_units(tagged.values, &own_units)?)
            }
            None => {
                let units = units.ok_or_else(|| {
                    UnitsError::MissingUnits("tagged array has no 'units' attribute".to_string())
                })?;
                Quantity::with_units(tagged.values, units)
            }
        },
    }
}

fn from_magnitude(magnitude: Vec<f64>, units: Option<&str>) -> UnitsResult<Quantity> {
    match units {
        Some(units) => Quantity::with_units(magnitude, units),
        None => Ok(Quantity::dimensionless(magnitude)),
    }
}
