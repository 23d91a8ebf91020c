//! Altitude interpolation engine.
//!
//! [`interp`] resamples every scalar field and mole fraction of a profile
//! onto a new altitude grid, one variable at a time, with a per-variable
//! [`InterpKind`]. Requests outside the source altitude range fail with
//! [`ProfileError::OutOfBounds`] unless [`FillPolicy::Extrapolate`] is
//! requested.

pub mod kind;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use atmo_units::Quantity;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::constants::MOLE_FRACTION_PREFIX;
use crate::derived::column_number_density_of;
use crate::error::{ProfileError, Result};
use crate::rescale::apply_factors;
use crate::schema::{Dataset, Variable};

pub use kind::InterpKind;

/// Key of the fallback kind in an interpolation method map.
pub const DEFAULT_KEY: &str = "default";

/// Key applying to every mole fraction variable.
pub const MOLE_FRACTION_KEY: &str = "x";

/// Interpolation kind per variable.
///
/// Lookup order for a variable: its exact name, then `x` for mole
/// fractions, then the default kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct InterpMethod {
    default: InterpKind,
    per_variable: BTreeMap<String, InterpKind>,
}

impl InterpMethod {
    /// The same kind for every variable.
    pub fn uniform(kind: InterpKind) -> Self {
        Self {
            default: kind,
            per_variable: BTreeMap::new(),
        }
    }

    /// A copy with `kind` set for `var` (`default` sets the fallback).
    pub fn with(mut self, var: &str, kind: InterpKind) -> Self {
        self.set(var, kind);
        self
    }

    pub fn set(&mut self, var: &str, kind: InterpKind) {
        if var == DEFAULT_KEY {
            self.default = kind;
        } else {
            self.per_variable.insert(var.to_string(), kind);
        }
    }

    pub fn default_kind(&self) -> InterpKind {
        self.default
    }

    /// Kind used for variable `var`.
    pub fn kind_for(&self, var: &str) -> InterpKind {
        if let Some(kind) = self.per_variable.get(var) {
            return *kind;
        }
        if var.starts_with(MOLE_FRACTION_PREFIX) {
            if let Some(kind) = self.per_variable.get(MOLE_FRACTION_KEY) {
                return *kind;
            }
        }
        self.default
    }
}

impl TryFrom<BTreeMap<String, String>> for InterpMethod {
    type Error = ProfileError;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self> {
        let mut method = Self::default();
        for (var, kind) in map {
            method.set(&var, kind.parse()?);
        }
        Ok(method)
    }
}

impl From<InterpMethod> for BTreeMap<String, String> {
    fn from(method: InterpMethod) -> Self {
        let mut map: BTreeMap<String, String> = method
            .per_variable
            .into_iter()
            .map(|(var, kind)| (var, kind.to_string()))
            .collect();
        map.insert(DEFAULT_KEY.to_string(), method.default.to_string());
        map
    }
}

impl FromStr for InterpMethod {
    type Err = ProfileError;

    /// Parses `"cubic"` or `"default=linear,p=cubic,x=nearest"`.
    fn from_str(s: &str) -> Result<Self> {
        let mut method = Self::default();
        for item in s.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            match item.split_once('=') {
                Some((var, kind)) => method.set(var.trim(), kind.parse()?),
                None => method.set(DEFAULT_KEY, item.parse()?),
            }
        }
        Ok(method)
    }
}

impl fmt::Display for InterpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", DEFAULT_KEY, self.default)?;
        for (var, kind) in &self.per_variable {
            write!(f, ",{}={}", var, kind)?;
        }
        Ok(())
    }
}

/// What happens to requested altitudes outside the source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Fail with an out-of-bounds error.
    #[default]
    BoundsError,
    /// Evaluate the interpolant beyond the end samples.
    Extrapolate,
}

/// Options of [`interp_with`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpOptions {
    pub method: InterpMethod,
    pub conserve_column: bool,
    pub fill: FillPolicy,
}

/// Interpolate `ds` onto the altitudes `z_new`, with bounds checking.
///
/// `z_new` is sorted ascending first. With `conserve_column`, mole
/// fractions are then rescaled so that every molecule keeps the column
/// number density of `ds`.
pub fn interp(
    ds: &Dataset,
    z_new: &Quantity,
    method: &InterpMethod,
    conserve_column: bool,
) -> Result<Dataset> {
    interp_with(
        ds,
        z_new,
        &InterpOptions {
            method: method.clone(),
            conserve_column,
            fill: FillPolicy::BoundsError,
        },
    )
}

/// Interpolate `ds` onto the altitudes `z_new` with explicit options.
pub fn interp_with(ds: &Dataset, z_new: &Quantity, options: &InterpOptions) -> Result<Dataset> {
    let message = if options.conserve_column {
        format!(
            "dataset interpolation on {} altitudes (column conserving)",
            z_new.len()
        )
    } else {
        format!("dataset interpolation on {} altitudes", z_new.len())
    };
    interp_recording(ds, z_new, options, &message)
}

/// Interpolation recording `message` as its single history entry.
pub(crate) fn interp_recording(
    ds: &Dataset,
    z_new: &Quantity,
    options: &InterpOptions,
    message: &str,
) -> Result<Dataset> {
    let z_units = ds.z().units.clone();
    let mut z_values = z_new.to_unit(&z_units)?.into_magnitude();
    if z_values.is_empty() {
        return Err(ProfileError::invalid_value("no altitude to interpolate at"));
    }
    if z_values.iter().any(|v| v.is_nan()) {
        return Err(ProfileError::invalid_value("altitudes must not be NaN"));
    }
    z_values.sort_by(f64::total_cmp);

    let z = &ds.z().values;
    let (z_min, z_max) = match (z.first(), z.last()) {
        (Some(lo), Some(hi)) => (*lo, *hi),
        _ => return Err(ProfileError::schema("profile has no altitude samples")),
    };

    if options.fill == FillPolicy::BoundsError {
        let outside: Vec<f64> = z_values
            .iter()
            .copied()
            .filter(|v| *v < z_min || *v > z_max)
            .collect();
        if !outside.is_empty() {
            return Err(ProfileError::out_of_bounds(
                &outside,
                z_min,
                z_max,
                z_units.symbol(),
            ));
        }
    }

    let mut data_vars = Vec::with_capacity(ds.data_vars().len());
    for var in ds.data_vars() {
        let kind = options.method.kind_for(&var.name);
        debug!(variable = %var.name, kind = %kind, "interpolating");
        let values = kind.evaluate(z, &var.values, &z_values)?;
        data_vars.push(var.with_values(values));
    }

    let z_var = Variable {
        values: z_values,
        ..ds.z().clone()
    };
    let interpolated = Dataset::from_parts(
        z_var,
        None,
        data_vars,
        ds.attrs().with_history(message),
    );

    if options.conserve_column {
        return rescale_to_column(ds, &interpolated);
    }
    Ok(interpolated)
}

/// Rescale the mole fractions of `ds` so that column number densities
/// match those of `reference`.
///
/// A molecule whose reference column is zero gets a factor of zero. A
/// molecule with zero column in `ds` but not in `reference` cannot be
/// rescaled.
pub fn rescale_to_column(reference: &Dataset, ds: &Dataset) -> Result<Dataset> {
    let mut factors = BTreeMap::new();
    for m in reference.molecules() {
        let desired = column_number_density_of(reference, &m)?;
        let actual = column_number_density_of(ds, &m)?;
        let factor = if desired == 0.0 {
            0.0
        } else if actual == 0.0 {
            let msg = format!(
                "actual column number density of {} is zero but the reference \
                 column number density is not ({:e} m^-2)",
                m, desired
            );
            error!("{}", msg);
            return Err(ProfileError::rescale_impossible(msg));
        } else {
            desired / actual
        };
        debug!(molecule = %m, factor, "column conserving factor");
        factors.insert(m, factor);
    }
    let rescaled = apply_factors(ds, &factors)?;
    info!(molecules = factors.len(), "conserved column number densities");
    Ok(rescaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use test_utils::{assert_approx_eq, assert_rel_eq};

    fn profile(z: Vec<f64>) -> Dataset {
        let len = z.len();
        let p: Vec<f64> = z.iter().map(|z| 101325.0 * (-z / 8.0).exp()).collect();
        let t: Vec<f64> = z.iter().map(|z| 288.0 - 6.5 * z).collect();
        let x: Vec<f64> = z.iter().map(|z| 1e-6 * (1.0 + z)).collect();
        let mut data_vars = BTreeMap::new();
        data_vars.insert("p".to_string(), Quantity::with_units(p, "Pa").unwrap());
        data_vars.insert("t".to_string(), Quantity::with_units(t, "K").unwrap());
        data_vars.insert("x_O3".to_string(), Quantity::dimensionless(x));
        data_vars.insert("x_CO2".to_string(), Quantity::dimensionless(vec![4e-4; len]));
        let mut coords = BTreeMap::new();
        coords.insert("z".to_string(), Quantity::with_units(z, "km").unwrap());
        Schema.convert(&data_vars, &coords, &BTreeMap::new()).unwrap()
    }

    #[test]
    fn test_method_lookup_order() {
        let method = InterpMethod::default()
            .with("p", InterpKind::Cubic)
            .with("x", InterpKind::Nearest)
            .with("x_O3", InterpKind::Previous);
        assert_eq!(method.kind_for("p"), InterpKind::Cubic);
        assert_eq!(method.kind_for("t"), InterpKind::Linear);
        assert_eq!(method.kind_for("x_H2O"), InterpKind::Nearest);
        assert_eq!(method.kind_for("x_O3"), InterpKind::Previous);
    }

    #[test]
    fn test_method_from_str() {
        let method: InterpMethod = "default=nearest, p=cubic".parse().unwrap();
        assert_eq!(method.default_kind(), InterpKind::Nearest);
        assert_eq!(method.kind_for("p"), InterpKind::Cubic);
        let bare: InterpMethod = "quadratic".parse().unwrap();
        assert_eq!(bare, InterpMethod::uniform(InterpKind::Quadratic));
        assert!("p=bogus".parse::<InterpMethod>().is_err());
    }

    #[test]
    fn test_method_serde_as_map() {
        let method = InterpMethod::default().with("t", InterpKind::Cubic);
        let json = serde_json::to_value(&method).unwrap();
        assert_eq!(json["default"], "linear");
        assert_eq!(json["t"], "cubic");
        let back: InterpMethod = serde_json::from_value(json).unwrap();
        assert_eq!(back, method);
    }

    #[test]
    fn test_interp_sorts_new_altitudes() {
        let ds = profile((0..=10).map(f64::from).collect());
        let z_new = Quantity::with_units(vec![5.0, 0.5, 2.0], "km").unwrap();
        let out = interp(&ds, &z_new, &InterpMethod::default(), false).unwrap();
        assert_eq!(out.z().values, vec![0.5, 2.0, 5.0]);
        assert_approx_eq!(out.require("t").unwrap().values[0], 288.0 - 3.25, 1e-9);
        assert!(Schema.is_valid(&out, false));
        assert_eq!(out.history().len(), ds.history().len() + 1);
    }

    #[test]
    fn test_interp_converts_altitude_units() {
        let ds = profile((0..=10).map(f64::from).collect());
        let z_new = Quantity::with_units(vec![500.0, 1500.0], "m").unwrap();
        let out = interp(&ds, &z_new, &InterpMethod::default(), false).unwrap();
        assert_eq!(out.z().values, vec![0.5, 1.5]);
        assert_eq!(out.z().units.symbol(), "km");
    }

    #[test]
    fn test_interp_out_of_bounds() {
        let ds = profile((0..=10).map(f64::from).collect());
        let z_new = Quantity::with_units(vec![0.0, 5.0, 12.0], "km").unwrap();
        let err = interp(&ds, &z_new, &InterpMethod::default(), false).unwrap_err();
        assert!(matches!(err, ProfileError::OutOfBounds { .. }));

        let options = InterpOptions {
            fill: FillPolicy::Extrapolate,
            ..InterpOptions::default()
        };
        let out = interp_with(&ds, &z_new, &options).unwrap();
        assert_eq!(out.len(), 3);
        assert!(Schema.is_valid(&out, false));
    }

    #[test]
    fn test_interp_does_not_mutate_input() {
        let ds = profile((0..=10).map(f64::from).collect());
        let before = ds.clone();
        let z_new = Quantity::with_units(vec![0.25, 9.75], "km").unwrap();
        let _ = interp(&ds, &z_new, &InterpMethod::default(), true).unwrap();
        assert_eq!(ds, before);
    }

    #[test]
    fn test_conserve_column() {
        let ds = profile((0..=10).map(f64::from).collect());
        let z_new = Quantity::with_units(vec![0.0, 0.7, 3.1, 3.3, 8.0, 10.0], "km").unwrap();
        let out = interp(&ds, &z_new, &InterpMethod::default(), true).unwrap();
        for m in ds.molecules() {
            assert_rel_eq!(
                column_number_density_of(&out, &m).unwrap(),
                column_number_density_of(&ds, &m).unwrap(),
                1e-9
            );
        }
        assert!(out.history().last_message().unwrap().contains("column conserving"));
    }

    #[test]
    fn test_rescale_to_column_zero_reference() {
        let ds = profile(vec![0.0, 1.0, 2.0]);
        let x = ds.mole_fraction("O3").unwrap().with_values(vec![0.0; 3]);
        let reference = ds.with_data_vars(vec![x]);
        let out = rescale_to_column(&reference, &ds).unwrap();
        assert_eq!(out.mole_fraction("O3").unwrap().values, vec![0.0; 3]);
    }

    #[test]
    fn test_rescale_to_column_impossible() {
        let reference = profile(vec![0.0, 1.0, 2.0]);
        let x = reference.mole_fraction("O3").unwrap().with_values(vec![0.0; 3]);
        let ds = reference.with_data_vars(vec![x]);
        let err = rescale_to_column(&reference, &ds).unwrap_err();
        assert!(matches!(err, ProfileError::RescaleImpossible(_)));
    }
}
