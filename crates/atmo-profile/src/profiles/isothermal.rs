//! Isothermal barometric atmosphere.
//!
//! ```text
//! p(z) = p0 exp(-z / H)
//! t(z) = T
//! n(z) = p(z) / (k T)
//! ```
//!
//! with constant mole fractions.

use std::collections::BTreeMap;

use atmo_units::Quantity;
use tracing::debug;

use super::{mole_fractions_param, quantity_param};
use crate::constants::{is_known_molecule, mole_fraction_var};
use crate::error::{ProfileError, Result};
use crate::interp::InterpMethod;
use crate::registry::{Params, Profile};
use crate::schema::{Dataset, Schema, Z_UNITS};

pub(super) const IDENTIFIER: &str = "isothermal";

/// Default grid: 0 to 120 km every km.
const DEFAULT_TOP_KM: usize = 120;

/// Closed-form isothermal profile.
#[derive(Debug, Clone, PartialEq)]
pub struct IsothermalProfile {
    /// Surface pressure [Pa].
    pub surface_pressure: f64,
    /// Temperature [K].
    pub temperature: f64,
    /// Pressure scale height [km].
    pub scale_height: f64,
    /// Constant mole fractions.
    pub mole_fractions: BTreeMap<String, f64>,
}

impl Default for IsothermalProfile {
    fn default() -> Self {
        let mole_fractions = [
            ("N2", 0.78084),
            ("O2", 0.209476),
            ("Ar", 0.00934),
            ("CO2", 0.000314),
        ]
        .into_iter()
        .map(|(m, x)| (m.to_string(), x))
        .collect();
        Self {
            surface_pressure: 101325.0,
            temperature: 288.15,
            scale_height: 8.0,
            mole_fractions,
        }
    }
}

impl IsothermalProfile {
    /// Build from parameters `surface_pressure`, `temperature`,
    /// `scale_height` and `mole_fractions`, each optional.
    pub fn from_params(params: &Params) -> Result<Self> {
        let defaults = Self::default();
        let profile = Self {
            surface_pressure: quantity_param(params, "surface_pressure", "Pa")?
                .unwrap_or(defaults.surface_pressure),
            temperature: quantity_param(params, "temperature", "K")?
                .unwrap_or(defaults.temperature),
            scale_height: quantity_param(params, "scale_height", Z_UNITS)?
                .unwrap_or(defaults.scale_height),
            mole_fractions: mole_fractions_param(params, "mole_fractions")?
                .unwrap_or(defaults.mole_fractions),
        };
        profile.validate()?;
        Ok(profile)
    }

    pub(super) fn construct(params: &Params) -> Result<Box<dyn Profile>> {
        Ok(Box::new(Self::from_params(params)?))
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("surface_pressure", self.surface_pressure),
            ("temperature", self.temperature),
            ("scale_height", self.scale_height),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ProfileError::invalid_value(format!(
                    "{} must be strictly positive (got {})",
                    name, value
                )));
            }
        }
        if self.mole_fractions.is_empty() {
            return Err(ProfileError::invalid_value("at least one mole fraction is required"));
        }
        for (m, x) in &self.mole_fractions {
            if !is_known_molecule(m) {
                return Err(ProfileError::invalid_value(format!("unknown molecule '{}'", m)));
            }
            if !(0.0..=1.0).contains(x) {
                return Err(ProfileError::invalid_value(format!(
                    "mole fraction of {} must be in [0, 1] (got {})",
                    m, x
                )));
            }
        }
        Ok(())
    }

    fn default_grid() -> Vec<f64> {
        (0..=DEFAULT_TOP_KM).map(|z| z as f64).collect()
    }
}

impl Profile for IsothermalProfile {
    fn to_dataset(
        &self,
        z: Option<&Quantity>,
        _interp_method: Option<&InterpMethod>,
        _conserve_column: bool,
    ) -> Result<Dataset> {
        let mut z_km = match z {
            Some(z) => z.m_as(Z_UNITS)?,
            None => Self::default_grid(),
        };
        z_km.sort_by(f64::total_cmp);
        debug!(points = z_km.len(), "evaluating isothermal profile");

        let len = z_km.len();
        let p: Vec<f64> = z_km
            .iter()
            .map(|z| self.surface_pressure * (-z / self.scale_height).exp())
            .collect();

        let mut data_vars = BTreeMap::new();
        data_vars.insert("p".to_string(), Quantity::with_units(p, "Pa")?);
        data_vars.insert(
            "t".to_string(),
            Quantity::with_units(vec![self.temperature; len], "K")?,
        );
        for (m, x) in &self.mole_fractions {
            data_vars.insert(mole_fraction_var(m), Quantity::dimensionless(vec![*x; len]));
        }

        let mut coords = BTreeMap::new();
        coords.insert("z".to_string(), Quantity::with_units(z_km, Z_UNITS)?);

        let mut attrs = BTreeMap::new();
        attrs.insert("title".to_string(), "Isothermal atmosphere".to_string());
        attrs.insert(
            "source".to_string(),
            format!(
                "isothermal barometric model (T = {} K, H = {} km)",
                self.temperature, self.scale_height
            ),
        );

        Schema.convert(&data_vars, &coords, &attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BOLTZMANN;
    use crate::derived::mole_fraction_sum;
    use serde_json::json;
    use test_utils::assert_rel_eq;

    #[test]
    fn test_default_grid() {
        let ds = IsothermalProfile::default().to_dataset(None, None, false).unwrap();
        assert_eq!(ds.len(), 121);
        assert_eq!(ds.z().values[120], 120.0);
        assert!(Schema.is_valid(&ds, true));
        assert!(mole_fraction_sum(&ds).iter().all(|s| *s <= 1.0));
        assert_eq!(
            ds.molecules(),
            vec!["Ar".to_string(), "CO2".to_string(), "N2".to_string(), "O2".to_string()]
        );
    }

    #[test]
    fn test_barometric_law() {
        let profile = IsothermalProfile::default();
        let z = Quantity::with_units(vec![8000.0, 0.0], "m").unwrap();
        let ds = profile.to_dataset(Some(&z), None, false).unwrap();
        assert_eq!(ds.z().values, vec![0.0, 8.0]);
        let p = &ds.require("p").unwrap().values;
        assert_rel_eq!(p[1], 101325.0 / std::f64::consts::E, 1e-12);
        let n = &ds.require("n").unwrap().values;
        assert_rel_eq!(n[0], 101325.0 / (BOLTZMANN * 288.15), 1e-12);
    }

    #[test]
    fn test_from_params() {
        let params = match json!({
            "temperature": "250 K",
            "scale_height": 7.0,
            "mole_fractions": "N2=0.8,O2=0.2",
        }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let profile = IsothermalProfile::from_params(&params).unwrap();
        assert_eq!(profile.temperature, 250.0);
        assert_eq!(profile.scale_height, 7.0);
        assert_eq!(profile.mole_fractions.len(), 2);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = Params::new();
        params.insert("temperature".to_string(), json!(-1.0));
        assert!(IsothermalProfile::from_params(&params).is_err());

        let mut params = Params::new();
        params.insert("mole_fractions".to_string(), json!({"Kr2": 0.1}));
        assert!(IsothermalProfile::from_params(&params).is_err());
    }
}
