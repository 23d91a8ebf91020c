//! Quantities derived from a profile on demand.
//!
//! The column number density of molecule M is
//!
//! ```text
//! N_M = ∫ x_M(z) n(z) dz
//! ```
//!
//! integrated with the centred-rectangle rule `Σ x_M n (upper - lower)` when
//! the profile carries cell bounds, and with the trapezoidal rule over `z`
//! otherwise. On a regular grid the two agree to interpolation-order
//! accuracy.

use std::collections::BTreeMap;

use atmo_units::unit::DALTON_KG;
use atmo_units::Quantity;
use tracing::debug;

use crate::constants::{molar_mass, AIR_MAIN_CONSTITUENTS};
use crate::error::{ProfileError, Result};
use crate::schema::Dataset;

/// Average molecular mass of `molecule`.
pub fn molecular_mass(molecule: &str) -> Result<Quantity> {
    let mass = molar_mass(molecule)
        .ok_or_else(|| ProfileError::invalid_value(format!("unknown molecule '{}'", molecule)))?;
    Ok(Quantity::scalar(mass, "dalton")?)
}

fn molecular_mass_kg(molecule: &str) -> Result<f64> {
    molar_mass(molecule)
        .map(|m| m * DALTON_KG)
        .ok_or_else(|| ProfileError::invalid_value(format!("unknown molecule '{}'", molecule)))
}

/// Mole fraction values of `molecule`, dimensionless.
fn mole_fraction_values(ds: &Dataset, molecule: &str) -> Result<Vec<f64>> {
    let x = ds.mole_fraction(molecule).ok_or_else(|| {
        ProfileError::invalid_value(format!("molecule '{}' is not in the profile", molecule))
    })?;
    Ok(x.quantity().m_as("dimensionless")?)
}

fn air_number_density(ds: &Dataset) -> Result<Vec<f64>> {
    Ok(ds.require("n")?.quantity().m_as("m^-3")?)
}

/// Column number density of one molecule [m^-2].
pub fn column_number_density_of(ds: &Dataset, molecule: &str) -> Result<f64> {
    let x = mole_fraction_values(ds, molecule)?;
    let n = air_number_density(ds)?;
    let density: Vec<f64> = x.iter().zip(&n).map(|(x, n)| x * n).collect();

    match ds.z_bounds() {
        Some(bounds) => {
            // bounds share the units of z
            let to_m = ds.z().units.scale();
            Ok(density
                .iter()
                .zip(bounds)
                .map(|(d, (lower, upper))| d * (upper - lower) * to_m)
                .sum())
        }
        None => {
            let z = ds.z_as("m")?;
            Ok(z.windows(2)
                .zip(density.windows(2))
                .map(|(z, d)| 0.5 * (d[0] + d[1]) * (z[1] - z[0]))
                .sum())
        }
    }
}

/// Column number density of every molecule.
pub fn column_number_density(ds: &Dataset) -> Result<BTreeMap<String, Quantity>> {
    debug!(
        rule = if ds.has_cell_bounds() { "rectangle" } else { "trapezoid" },
        "computing column number density"
    );
    ds.molecules()
        .into_iter()
        .map(|m| {
            let column = column_number_density_of(ds, &m)?;
            Ok((m, Quantity::scalar(column, "m^-2")?))
        })
        .collect()
}

/// Column mass density of every molecule.
pub fn column_mass_density(ds: &Dataset) -> Result<BTreeMap<String, Quantity>> {
    ds.molecules()
        .into_iter()
        .map(|m| {
            let column = column_number_density_of(ds, &m)? * molecular_mass_kg(&m)?;
            Ok((m, Quantity::scalar(column, "kg * m^-2")?))
        })
        .collect()
}

/// Number density of every molecule at the lowest altitude.
pub fn number_density_at_sea_level(ds: &Dataset) -> Result<BTreeMap<String, Quantity>> {
    let n0 = first(&air_number_density(ds)?)?;
    ds.molecules()
        .into_iter()
        .map(|m| {
            let x0 = first(&mole_fraction_values(ds, &m)?)?;
            Ok((m, Quantity::scalar(x0 * n0, "m^-3")?))
        })
        .collect()
}

/// Mass density of every molecule at the lowest altitude.
pub fn mass_density_at_sea_level(ds: &Dataset) -> Result<BTreeMap<String, Quantity>> {
    number_density_at_sea_level(ds)?
        .into_iter()
        .map(|(m, n)| {
            let rho = n.value_as("m^-3")? * molecular_mass_kg(&m)?;
            Ok((m, Quantity::scalar(rho, "kg * m^-3")?))
        })
        .collect()
}

/// Mole fraction of every molecule at the lowest altitude.
pub fn mole_fraction_at_sea_level(ds: &Dataset) -> Result<BTreeMap<String, Quantity>> {
    ds.molecules()
        .into_iter()
        .map(|m| {
            let x0 = first(&mole_fraction_values(ds, &m)?)?;
            Ok((m, Quantity::dimensionless(vec![x0])))
        })
        .collect()
}

fn first(values: &[f64]) -> Result<f64> {
    values
        .first()
        .copied()
        .ok_or_else(|| ProfileError::schema("profile has no altitude samples"))
}

/// Pointwise sum of all mole fractions.
pub fn mole_fraction_sum(ds: &Dataset) -> Vec<f64> {
    let mut sum = vec![0.0; ds.len()];
    for m in ds.molecules() {
        if let Ok(x) = mole_fraction_values(ds, &m) {
            for (s, x) in sum.iter_mut().zip(x) {
                *s += x;
            }
        }
    }
    sum
}

/// Pointwise air molar mass [g/mol].
///
/// N2, O2 and Ar are assumed at their constant main-constituent mole
/// fractions when the profile does not carry them. The result is
/// normalized by the mole fraction sum.
pub fn air_molar_mass(ds: &Dataset) -> Result<Quantity> {
    let len = ds.len();
    let mut weighted = vec![0.0; len];
    let mut total = vec![0.0; len];

    let mut add = |x: &[f64], mass: f64| {
        for ((w, t), x) in weighted.iter_mut().zip(total.iter_mut()).zip(x) {
            *w += x * mass;
            *t += x;
        }
    };

    let molecules = ds.molecules();
    for m in &molecules {
        let mass = molar_mass(m)
            .ok_or_else(|| ProfileError::invalid_value(format!("unknown molecule '{}'", m)))?;
        add(&mole_fraction_values(ds, m)?, mass);
    }
    for (m, x) in AIR_MAIN_CONSTITUENTS {
        if !molecules.iter().any(|have| have == m) {
            let mass = molar_mass(m).unwrap_or_default();
            add(&vec![x; len], mass);
        }
    }

    let values = weighted
        .iter()
        .zip(&total)
        .map(|(w, t)| if *t > 0.0 { w / t } else { 0.0 })
        .collect();
    Ok(Quantity::with_units(values, "g/mol")?)
}

/// Pointwise mass fraction of `molecule`, dimensionless.
pub fn mass_fraction(ds: &Dataset, molecule: &str) -> Result<Quantity> {
    let x = mole_fraction_values(ds, molecule)?;
    let mass = molar_mass(molecule)
        .ok_or_else(|| ProfileError::invalid_value(format!("unknown molecule '{}'", molecule)))?;
    let air = air_molar_mass(ds)?.m_as("g/mol")?;
    let y = x
        .iter()
        .zip(&air)
        .map(|(x, m_air)| if *m_air > 0.0 { x * mass / m_air } else { 0.0 })
        .collect();
    Ok(Quantity::dimensionless(y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use atmo_units::Dimension;
    use test_utils::{assert_approx_eq, assert_rel_eq};

    /// Constant profile over 0-10 km: n = 1e25 m^-3, x_O3 = 1e-6,
    /// x_H2O = 0.
    fn constant_profile() -> Dataset {
        let z: Vec<f64> = (0..=10).map(f64::from).collect();
        let len = z.len();
        let mut data_vars = BTreeMap::new();
        data_vars.insert("p".to_string(), Quantity::with_units(vec![1e5; len], "Pa").unwrap());
        data_vars.insert("t".to_string(), Quantity::with_units(vec![250.0; len], "K").unwrap());
        data_vars.insert("n".to_string(), Quantity::with_units(vec![1e25; len], "m^-3").unwrap());
        data_vars.insert("x_O3".to_string(), Quantity::dimensionless(vec![1e-6; len]));
        data_vars.insert("x_H2O".to_string(), Quantity::dimensionless(vec![0.0; len]));
        let mut coords = BTreeMap::new();
        coords.insert("z".to_string(), Quantity::with_units(z, "km").unwrap());
        Schema.convert(&data_vars, &coords, &BTreeMap::new()).unwrap()
    }

    #[test]
    fn test_column_number_density_trapezoid() {
        let ds = constant_profile();
        let columns = column_number_density(&ds).unwrap();
        // 1e-6 * 1e25 m^-3 * 1e4 m
        assert_rel_eq!(columns["O3"].value_as("m^-2").unwrap(), 1e23, 1e-12);
        assert_eq!(columns["H2O"].value_as("m^-2").unwrap(), 0.0);
        assert!(columns["O3"].check(Dimension::COLUMN_NUMBER_DENSITY));
    }

    #[test]
    fn test_column_number_density_rectangle() {
        let ds = constant_profile();
        let bounds: Vec<(f64, f64)> = ds.z().values.iter().map(|z| (z - 0.5, z + 0.5)).collect();
        let cells = ds.with_bounds(Some(bounds));
        // 11 cells of 1 km each
        assert_rel_eq!(column_number_density_of(&cells, "O3").unwrap(), 1.1e23, 1e-12);
    }

    #[test]
    fn test_column_mass_density() {
        let ds = constant_profile();
        let sigma = column_mass_density(&ds).unwrap();
        let expected = 1e23 * 47.998 * DALTON_KG;
        assert_rel_eq!(sigma["O3"].value_as("kg/m^2").unwrap(), expected, 1e-12);
    }

    #[test]
    fn test_sea_level_quantities() {
        let ds = constant_profile();
        let n0 = number_density_at_sea_level(&ds).unwrap();
        assert_rel_eq!(n0["O3"].value_as("m^-3").unwrap(), 1e19, 1e-12);
        let rho0 = mass_density_at_sea_level(&ds).unwrap();
        assert_rel_eq!(
            rho0["O3"].value_as("kg/m^3").unwrap(),
            1e19 * 47.998 * DALTON_KG,
            1e-12
        );
        let x0 = mole_fraction_at_sea_level(&ds).unwrap();
        assert_approx_eq!(x0["O3"].value_as("").unwrap(), 1e-6, 1e-18);
    }

    #[test]
    fn test_air_molar_mass_fills_main_constituents() {
        let ds = constant_profile();
        let m_air = air_molar_mass(&ds).unwrap().m_as("g/mol").unwrap();
        // dominated by N2/O2/Ar
        assert!((m_air[0] - 28.96).abs() < 0.05, "got {}", m_air[0]);
        let y = mass_fraction(&ds, "O3").unwrap();
        assert_rel_eq!(y.magnitude()[0], 1e-6 * 47.998 / m_air[0], 1e-12);
    }

    #[test]
    fn test_mole_fraction_sum() {
        let ds = constant_profile();
        let sum = mole_fraction_sum(&ds);
        assert_eq!(sum.len(), 11);
        assert_approx_eq!(sum[0], 1e-6, 1e-18);
    }

    #[test]
    fn test_unknown_molecule_mass() {
        assert!(matches!(
            molecular_mass("XYZ"),
            Err(ProfileError::InvalidValue(_))
        ));
        assert_rel_eq!(
            molecular_mass("H2O").unwrap().value_as("kg").unwrap(),
            18.015 * DALTON_KG,
            1e-12
        );
    }
}
