//! Canonical profile representation and its validation.
//!
//! A [`Dataset`] is indexed by a strictly increasing altitude coordinate `z`
//! and carries:
//!
//! | Variable | Storage unit | Standard name |
//! |---|---|---|
//! | `p` | Pa | `air_pressure` |
//! | `t` | K | `air_temperature` |
//! | `n` | m^-3 | `air_number_density` |
//! | `x_M` | dimensionless | `M_mole_fraction` |
//!
//! plus the provenance [`Attributes`]. [`Schema::convert`] builds a dataset
//! from raw quantities, [`Schema::validate`] checks the invariants.

use std::collections::BTreeMap;

use atmo_units::{Dimension, Quantity, Unit};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::attrs::{Attributes, History};
use crate::constants::{is_known_molecule, BOLTZMANN, MOLE_FRACTION_PREFIX};
use crate::error::{ProfileError, Result};

/// Altitude storage unit.
pub const Z_UNITS: &str = "km";

/// Names of the required scalar fields, in storage order.
pub const REQUIRED_DATA_VARS: [&str; 3] = ["p", "t", "n"];

/// Storage unit, dimension, standard name and long name of a variable.
fn variable_metadata(name: &str) -> Option<(&'static str, Dimension, String, String)> {
    match name {
        "z" => Some((
            Z_UNITS,
            Dimension::LENGTH,
            "altitude".to_string(),
            "altitude".to_string(),
        )),
        "p" => Some((
            "Pa",
            Dimension::PRESSURE,
            "air_pressure".to_string(),
            "air pressure".to_string(),
        )),
        "t" => Some((
            "K",
            Dimension::TEMPERATURE,
            "air_temperature".to_string(),
            "air temperature".to_string(),
        )),
        "n" => Some((
            "m^-3",
            Dimension::NUMBER_DENSITY,
            "air_number_density".to_string(),
            "air number density".to_string(),
        )),
        _ => name.strip_prefix(MOLE_FRACTION_PREFIX).map(|m| {
            (
                "dimensionless",
                Dimension::DIMENSIONLESS,
                format!("{}_mole_fraction", m),
                format!("{} mole fraction", m),
            )
        }),
    }
}

// ============================================================================
// Variable
// ============================================================================

/// A named, unit-tagged 1-D array along the altitude axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub values: Vec<f64>,
    pub units: Unit,
    pub standard_name: String,
    pub long_name: String,
}

impl Variable {
    /// Convert `quantity` to the storage unit of `name` and attach the
    /// standard metadata.
    pub fn from_quantity(name: &str, quantity: &Quantity) -> Result<Self> {
        let (units, _, standard_name, long_name) = variable_metadata(name)
            .ok_or_else(|| ProfileError::schema(format!("unexpected variable '{}'", name)))?;
        let units = Unit::parse(units)?;
        let values = quantity.to_unit(&units)?.into_magnitude();
        Ok(Self {
            name: name.to_string(),
            values,
            units,
            standard_name,
            long_name,
        })
    }

    /// The values as a quantity.
    pub fn quantity(&self) -> Quantity {
        Quantity::new(self.values.clone(), self.units.clone())
    }

    /// Same metadata, new values.
    pub fn with_values(&self, values: Vec<f64>) -> Self {
        Self {
            values,
            ..self.clone()
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// An atmospheric thermophysical profile.
///
/// Every transformation returns a new dataset; datasets are never mutated
/// in place by this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    z: Variable,
    z_bounds: Option<Vec<(f64, f64)>>,
    data_vars: Vec<Variable>,
    attrs: Attributes,
}

impl Dataset {
    /// Assemble a dataset from already-converted parts.
    ///
    /// No conversion or validation is performed.
    pub fn from_parts(
        z: Variable,
        z_bounds: Option<Vec<(f64, f64)>>,
        data_vars: Vec<Variable>,
        attrs: Attributes,
    ) -> Self {
        Self {
            z,
            z_bounds,
            data_vars,
            attrs,
        }
    }

    /// Altitude coordinate.
    pub fn z(&self) -> &Variable {
        &self.z
    }

    /// Altitude values in `units`.
    pub fn z_as(&self, units: &str) -> Result<Vec<f64>> {
        Ok(self.z.quantity().m_as(units)?)
    }

    /// Cell bounds, one `(lower, upper)` pair per sample, in `z` units.
    pub fn z_bounds(&self) -> Option<&[(f64, f64)]> {
        self.z_bounds.as_deref()
    }

    pub fn has_cell_bounds(&self) -> bool {
        self.z_bounds.is_some()
    }

    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    pub fn data_vars(&self) -> &[Variable] {
        &self.data_vars
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.data_vars.iter().find(|v| v.name == name)
    }

    /// Variable `name`, or a schema error naming it.
    pub fn require(&self, name: &str) -> Result<&Variable> {
        self.variable(name)
            .ok_or_else(|| ProfileError::schema(format!("missing data variable '{}'", name)))
    }

    /// Molecules with a mole fraction variable, in storage order.
    pub fn molecules(&self) -> Vec<String> {
        self.data_vars
            .iter()
            .filter_map(|v| v.name.strip_prefix(MOLE_FRACTION_PREFIX))
            .map(str::to_string)
            .collect()
    }

    pub fn mole_fraction(&self, molecule: &str) -> Option<&Variable> {
        self.variable(&format!("{}{}", MOLE_FRACTION_PREFIX, molecule))
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn history(&self) -> &History {
        &self.attrs.history
    }

    /// A copy with the given variables replacing those of the same name.
    pub fn with_data_vars(&self, replaced: Vec<Variable>) -> Self {
        let mut data_vars = self.data_vars.clone();
        for var in replaced {
            match data_vars.iter_mut().find(|v| v.name == var.name) {
                Some(slot) => *slot = var,
                None => data_vars.push(var),
            }
        }
        Self {
            data_vars,
            ..self.clone()
        }
    }

    /// A copy without the named variables.
    pub fn without_data_vars(&self, names: &[String]) -> Self {
        Self {
            data_vars: self
                .data_vars
                .iter()
                .filter(|v| !names.contains(&v.name))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// A copy with cell bounds set (or removed).
    pub fn with_bounds(&self, z_bounds: Option<Vec<(f64, f64)>>) -> Self {
        Self {
            z_bounds,
            ..self.clone()
        }
    }

    /// A copy with different attributes.
    pub fn with_attrs(&self, attrs: Attributes) -> Self {
        Self {
            attrs,
            ..self.clone()
        }
    }

    /// A copy with one more history entry.
    pub fn with_history(&self, message: impl Into<String>) -> Self {
        self.with_attrs(self.attrs.with_history(message))
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Dataset schema for atmosphere thermophysical profiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Schema;

impl Schema {
    /// Convert raw quantities into a canonical dataset.
    ///
    /// `coords` must hold `z`. `data_vars` must hold `p`, `t` and at least
    /// one `x_*` mole fraction. `n` is derived from `p` and `t` through the
    /// ideal gas law when absent. Missing attributes get default values.
    pub fn convert(
        &self,
        data_vars: &BTreeMap<String, Quantity>,
        coords: &BTreeMap<String, Quantity>,
        attrs: &BTreeMap<String, String>,
    ) -> Result<Dataset> {
        debug!("converting raw data to dataset");

        let z = coords
            .get("z")
            .ok_or_else(|| ProfileError::schema("missing coordinate 'z'"))?;
        if let Some(name) = coords.keys().find(|k| k.as_str() != "z") {
            return Err(ProfileError::schema(format!("unexpected coordinate '{}'", name)));
        }
        let z = Variable::from_quantity("z", z)?;

        if !data_vars.keys().any(|k| k.starts_with(MOLE_FRACTION_PREFIX)) {
            return Err(ProfileError::schema(format!(
                "missing mole fraction data variable (starting with '{}')",
                MOLE_FRACTION_PREFIX
            )));
        }

        let mut vars = Vec::with_capacity(data_vars.len() + 1);
        for name in ["p", "t"] {
            let q = data_vars
                .get(name)
                .ok_or_else(|| ProfileError::schema(format!("missing data variable '{}'", name)))?;
            vars.push(Variable::from_quantity(name, q)?);
        }

        let n = match data_vars.get("n") {
            Some(n) => Variable::from_quantity("n", n)?,
            None => {
                debug!("deriving air number density from pressure and temperature");
                let n = number_density(&vars[0].values, &vars[1].values);
                Variable::from_quantity("n", &Quantity::with_units(n, "m^-3")?)?
            }
        };
        vars.push(n);

        for (name, q) in data_vars {
            if REQUIRED_DATA_VARS.contains(&name.as_str()) {
                continue;
            }
            if !name.starts_with(MOLE_FRACTION_PREFIX) {
                return Err(ProfileError::schema(format!(
                    "unexpected data variable '{}'",
                    name
                )));
            }
            vars.push(Variable::from_quantity(name, q)?);
        }

        for var in &vars {
            if var.len() != z.len() {
                return Err(ProfileError::schema(format!(
                    "data variable '{}' has {} values but 'z' has {}",
                    var.name,
                    var.len(),
                    z.len()
                )));
            }
        }

        Ok(Dataset::from_parts(z, None, vars, Attributes::from_map(attrs)))
    }

    /// Check every dataset invariant, failing on the first violation.
    pub fn validate(&self, ds: &Dataset, check_mole_fraction_sum: bool) -> Result<()> {
        debug!("validating dataset");

        debug!("checking altitude coordinate");
        check_dimension(ds.z())?;
        let z = &ds.z().values;
        if z.is_empty() {
            return Err(ProfileError::schema("altitude coordinate 'z' is empty"));
        }
        if z.iter().any(|v| !v.is_finite()) {
            return Err(ProfileError::schema("altitude coordinate 'z' has non-finite values"));
        }
        for w in z.windows(2) {
            if w[1] == w[0] {
                return Err(ProfileError::schema(format!(
                    "altitude coordinate 'z' has duplicate value {}",
                    w[0]
                )));
            }
            if w[1] < w[0] {
                return Err(ProfileError::schema(
                    "altitude coordinate 'z' is not sorted in ascending order",
                ));
            }
        }

        if let Some(bounds) = ds.z_bounds() {
            debug!("checking cell bounds");
            if bounds.len() != z.len() {
                return Err(ProfileError::schema(format!(
                    "'z_bounds' has {} cells but 'z' has {} values",
                    bounds.len(),
                    z.len()
                )));
            }
            for ((lower, upper), zi) in bounds.iter().zip(z) {
                if lower >= upper || zi < lower || zi > upper {
                    return Err(ProfileError::schema(format!(
                        "altitude {} is not inside a valid cell [{}, {}]",
                        zi, lower, upper
                    )));
                }
            }
        }

        debug!("checking required data variables");
        for name in REQUIRED_DATA_VARS {
            check_dimension(ds.require(name)?)?;
        }

        debug!("checking mole fraction data variables");
        let molecules = ds.molecules();
        if molecules.is_empty() {
            return Err(ProfileError::schema(format!(
                "missing mole fraction data variable (starting with '{}')",
                MOLE_FRACTION_PREFIX
            )));
        }
        for m in &molecules {
            if !is_known_molecule(m) {
                return Err(ProfileError::schema(format!("unknown molecule '{}'", m)));
            }
        }

        for var in ds.data_vars() {
            check_dimension(var)?;
            if var.len() != z.len() {
                return Err(ProfileError::schema(format!(
                    "data variable '{}' has {} values but 'z' has {}",
                    var.name,
                    var.len(),
                    z.len()
                )));
            }
            if var.values.iter().any(|v| !v.is_finite()) {
                return Err(ProfileError::schema(format!(
                    "data variable '{}' has non-finite values",
                    var.name
                )));
            }
        }

        debug!("checking attributes");
        let missing = ds.attrs().missing_required();
        if !missing.is_empty() {
            return Err(ProfileError::schema(format!(
                "missing attribute(s): {}",
                missing.join(", ")
            )));
        }

        if check_mole_fraction_sum {
            debug!("checking that the mole fraction sum is never larger than one");
            let sum = crate::derived::mole_fraction_sum(ds);
            if let Some((i, s)) = sum.iter().enumerate().find(|(_, s)| **s > 1.0) {
                return Err(ProfileError::schema(format!(
                    "mole fraction sum is larger than one ({}) at altitude {} {}",
                    s,
                    z[i],
                    ds.z().units
                )));
            }
        }

        info!("dataset is valid");
        Ok(())
    }

    /// Validation that never fails: `true` when the dataset is valid.
    pub fn is_valid(&self, ds: &Dataset, check_mole_fraction_sum: bool) -> bool {
        match self.validate(ds, check_mole_fraction_sum) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "dataset is not valid");
                false
            }
        }
    }
}

/// Check the dimensionality of a variable against its schema entry.
fn check_dimension(var: &Variable) -> Result<()> {
    let (units, dimension, ..) = variable_metadata(&var.name)
        .ok_or_else(|| ProfileError::schema(format!("unexpected variable '{}'", var.name)))?;
    if var.units.dimension() != dimension {
        return Err(atmo_units::UnitsError::Dimensionality {
            from: var.units.to_string(),
            from_dimension: var.units.dimension().to_string(),
            to: units.to_string(),
            to_dimension: dimension.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Ideal gas number density [m^-3] from pressure [Pa] and temperature [K].
pub fn number_density(p: &[f64], t: &[f64]) -> Vec<f64> {
    p.iter().zip(t).map(|(p, t)| p / (BOLTZMANN * t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_rel_eq;

    fn raw(
        z: Vec<f64>,
        with_n: bool,
    ) -> (BTreeMap<String, Quantity>, BTreeMap<String, Quantity>) {
        let len = z.len();
        let mut data_vars = BTreeMap::new();
        data_vars.insert(
            "p".to_string(),
            Quantity::with_units(vec![1013.25; len], "hPa").unwrap(),
        );
        data_vars.insert(
            "t".to_string(),
            Quantity::with_units(vec![288.15; len], "K").unwrap(),
        );
        if with_n {
            data_vars.insert(
                "n".to_string(),
                Quantity::with_units(vec![2.5e19; len], "cm^-3").unwrap(),
            );
        }
        data_vars.insert(
            "x_H2O".to_string(),
            Quantity::with_units(vec![1.0; len], "percent").unwrap(),
        );
        let mut coords = BTreeMap::new();
        coords.insert("z".to_string(), Quantity::with_units(z, "m").unwrap());
        (data_vars, coords)
    }

    #[test]
    fn test_convert_to_storage_units() {
        let (data_vars, coords) = raw(vec![0.0, 1000.0, 2000.0], true);
        let ds = Schema.convert(&data_vars, &coords, &BTreeMap::new()).unwrap();
        assert_eq!(ds.z().values, vec![0.0, 1.0, 2.0]);
        assert_eq!(ds.z().units.symbol(), "km");
        assert_rel_eq!(ds.require("p").unwrap().values[0], 101325.0, 1e-12);
        assert_rel_eq!(ds.require("n").unwrap().values[0], 2.5e25, 1e-12);
        assert_rel_eq!(ds.mole_fraction("H2O").unwrap().values[0], 0.01, 1e-12);
        assert_eq!(ds.mole_fraction("H2O").unwrap().standard_name, "H2O_mole_fraction");
        assert_eq!(ds.require("t").unwrap().long_name, "air temperature");
        assert!(Schema.is_valid(&ds, true));
    }

    #[test]
    fn test_convert_derives_number_density() {
        let (data_vars, coords) = raw(vec![0.0, 1.0], false);
        let ds = Schema.convert(&data_vars, &coords, &BTreeMap::new()).unwrap();
        let n = &ds.require("n").unwrap().values;
        assert_rel_eq!(n[0], 101325.0 / (BOLTZMANN * 288.15), 1e-12);
    }

    #[test]
    fn test_convert_requires_mole_fraction() {
        let (mut data_vars, coords) = raw(vec![0.0, 1.0], true);
        data_vars.remove("x_H2O");
        let err = Schema.convert(&data_vars, &coords, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ProfileError::Schema(_)));
    }

    #[test]
    fn test_convert_rejects_wrong_dimension() {
        let (mut data_vars, coords) = raw(vec![0.0, 1.0], true);
        data_vars.insert("t".to_string(), Quantity::with_units(vec![1.0, 2.0], "km").unwrap());
        let err = Schema.convert(&data_vars, &coords, &BTreeMap::new()).unwrap_err();
        assert!(matches!(
            err,
            ProfileError::Units(atmo_units::UnitsError::Dimensionality { .. })
        ));
    }

    #[test]
    fn test_validate_duplicate_altitudes() {
        let (data_vars, coords) = raw(vec![0.0, 1000.0, 1000.0], true);
        let ds = Schema.convert(&data_vars, &coords, &BTreeMap::new()).unwrap();
        let err = Schema.validate(&ds, false).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
        assert!(!Schema.is_valid(&ds, false));
    }

    #[test]
    fn test_validate_unsorted_altitudes() {
        let (data_vars, coords) = raw(vec![2000.0, 1000.0], true);
        let ds = Schema.convert(&data_vars, &coords, &BTreeMap::new()).unwrap();
        let err = Schema.validate(&ds, false).unwrap_err();
        assert!(err.to_string().contains("ascending"));
    }

    #[test]
    fn test_validate_unknown_molecule() {
        let (mut data_vars, coords) = raw(vec![0.0, 1.0], true);
        data_vars.insert(
            "x_Kryptonite".to_string(),
            Quantity::dimensionless(vec![0.1, 0.1]),
        );
        let ds = Schema.convert(&data_vars, &coords, &BTreeMap::new()).unwrap();
        let err = Schema.validate(&ds, false).unwrap_err();
        assert!(err.to_string().contains("Kryptonite"));
    }

    #[test]
    fn test_validate_mole_fraction_sum_is_opt_in() {
        let (mut data_vars, coords) = raw(vec![0.0, 1.0], true);
        data_vars.insert("x_N2".to_string(), Quantity::dimensionless(vec![0.995, 0.995]));
        let ds = Schema.convert(&data_vars, &coords, &BTreeMap::new()).unwrap();
        assert!(Schema.is_valid(&ds, false));
        assert!(!Schema.is_valid(&ds, true));
    }

    #[test]
    fn test_with_data_vars_does_not_touch_original() {
        let (data_vars, coords) = raw(vec![0.0, 1.0], true);
        let ds = Schema.convert(&data_vars, &coords, &BTreeMap::new()).unwrap();
        let x = ds.mole_fraction("H2O").unwrap().with_values(vec![0.5, 0.5]);
        let changed = ds.with_data_vars(vec![x]);
        assert_eq!(ds.mole_fraction("H2O").unwrap().values, vec![0.01, 0.01]);
        assert_eq!(changed.mole_fraction("H2O").unwrap().values, vec![0.5, 0.5]);
    }
}
