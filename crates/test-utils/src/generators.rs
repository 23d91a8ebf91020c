//! Test data generators for synthetic atmospheres.
//!
//! These generators create smooth, physically plausible profiles that can be
//! used across the test suite without shipping tabulated data files.

use crate::fixtures::{BOLTZMANN, SYNTHETIC_MOLECULES};

/// The six climatological atmosphere families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtmosphereKind {
    Tropical,
    MidlatitudeSummer,
    MidlatitudeWinter,
    SubarcticSummer,
    SubarcticWinter,
    UsStandard,
}

impl AtmosphereKind {
    pub const ALL: [AtmosphereKind; 6] = [
        AtmosphereKind::Tropical,
        AtmosphereKind::MidlatitudeSummer,
        AtmosphereKind::MidlatitudeWinter,
        AtmosphereKind::SubarcticSummer,
        AtmosphereKind::SubarcticWinter,
        AtmosphereKind::UsStandard,
    ];

    /// (surface temperature [K], surface H2O mole fraction, tropopause [km],
    /// surface pressure [Pa])
    fn parameters(self) -> (f64, f64, f64, f64) {
        match self {
            AtmosphereKind::Tropical => (299.7, 2.6e-2, 17.0, 101_300.0),
            AtmosphereKind::MidlatitudeSummer => (294.2, 1.9e-2, 13.0, 101_300.0),
            AtmosphereKind::MidlatitudeWinter => (272.2, 4.3e-3, 10.0, 101_800.0),
            AtmosphereKind::SubarcticSummer => (287.2, 1.2e-2, 10.0, 101_000.0),
            AtmosphereKind::SubarcticWinter => (257.2, 1.4e-3, 9.0, 101_300.0),
            AtmosphereKind::UsStandard => (288.15, 7.7e-3, 11.0, 101_325.0),
        }
    }
}

/// A synthetic atmosphere as plain arrays.
///
/// Units: `z_km` in km, `p_pa` in Pa, `t_k` in K, `n_m3` in m^-3, mole
/// fractions dimensionless.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticAtmosphere {
    pub z_km: Vec<f64>,
    pub p_pa: Vec<f64>,
    pub t_k: Vec<f64>,
    pub n_m3: Vec<f64>,
    pub mole_fractions: Vec<(String, Vec<f64>)>,
}

impl SyntheticAtmosphere {
    pub fn len(&self) -> usize {
        self.z_km.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z_km.is_empty()
    }

    /// Mole fraction array for `molecule`, if generated.
    pub fn mole_fraction(&self, molecule: &str) -> Option<&[f64]> {
        self.mole_fractions
            .iter()
            .find(|(m, _)| m == molecule)
            .map(|(_, x)| x.as_slice())
    }
}

/// Evenly spaced values from `start` to `stop` inclusive.
///
/// The last value is exactly `stop`.
///
/// # Example
///
/// ```
/// use test_utils::linspace;
///
/// assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
/// ```
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = stop;
            out
        }
    }
}

/// Temperature at altitude `z` [km] for a given surface temperature and
/// tropopause height.
fn temperature(z: f64, t0: f64, z_trop: f64) -> f64 {
    let t_trop = t0 - 6.5 * z_trop;
    if z <= z_trop {
        t0 - 6.5 * z
    } else if z <= 20.0 {
        t_trop
    } else if z <= 50.0 {
        // warm towards the stratopause
        t_trop + (270.0 - t_trop) * (z - 20.0) / 30.0
    } else if z <= 85.0 {
        270.0 - 80.0 * (z - 50.0) / 35.0
    } else {
        190.0 + 170.0 * (z - 85.0) / 35.0
    }
}

/// Mole fraction of a synthetic molecule at altitude `z` [km].
fn mole_fraction(molecule: &str, z: f64, h2o_surface: f64) -> f64 {
    match molecule {
        "H2O" => h2o_surface * (-z / 2.0).exp() + 4e-6,
        "CO2" => 4.0e-4,
        "O3" => 8.0e-6 * (-((z - 30.0) / 8.0).powi(2)).exp() + 3.0e-8,
        "N2O" => 3.2e-7 * (-(z - 15.0).max(0.0) / 10.0).exp(),
        "CO" => 1.5e-7 * (-z / 10.0).exp() + 1.0e-8,
        "CH4" => 1.7e-6 * (-(z - 15.0).max(0.0) / 25.0).exp(),
        "O2" => 0.209,
        _ => 0.0,
    }
}

/// Generates a synthetic atmosphere on `n_points` altitudes evenly spaced
/// between 0 and 120 km.
///
/// Pressure decays exponentially with a 7 km scale height and the number
/// density follows the ideal gas law, so `n == p / (k T)` holds exactly.
///
/// # Example
///
/// ```
/// use test_utils::{synthetic_atmosphere, AtmosphereKind};
///
/// let atm = synthetic_atmosphere(AtmosphereKind::UsStandard, 121);
/// assert_eq!(atm.len(), 121);
/// assert_eq!(atm.z_km[120], 120.0);
/// assert_eq!(atm.mole_fractions.len(), 7);
/// ```
pub fn synthetic_atmosphere(kind: AtmosphereKind, n_points: usize) -> SyntheticAtmosphere {
    let (t0, h2o_surface, z_trop, p0) = kind.parameters();
    let z_km = linspace(0.0, 120.0, n_points);
    let t_k: Vec<f64> = z_km.iter().map(|&z| temperature(z, t0, z_trop)).collect();
    let p_pa: Vec<f64> = z_km.iter().map(|&z| p0 * (-z / 7.0).exp()).collect();
    let n_m3 = p_pa
        .iter()
        .zip(&t_k)
        .map(|(p, t)| p / (BOLTZMANN * t))
        .collect();
    let mole_fractions = SYNTHETIC_MOLECULES
        .iter()
        .map(|m| {
            let x = z_km
                .iter()
                .map(|&z| mole_fraction(m, z, h2o_surface))
                .collect();
            (m.to_string(), x)
        })
        .collect();

    SyntheticAtmosphere {
        z_km,
        p_pa,
        t_k,
        n_m3,
        mole_fractions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints() {
        let z = linspace(0.0, 120.0, 1201);
        assert_eq!(z.len(), 1201);
        assert_eq!(z[0], 0.0);
        assert_eq!(z[1200], 120.0);
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(3.0, 5.0, 1), vec![3.0]);
    }

    #[test]
    fn test_all_kinds_generate() {
        for kind in AtmosphereKind::ALL {
            let atm = synthetic_atmosphere(kind, 61);
            assert_eq!(atm.len(), 61);
            assert!(atm.t_k.iter().all(|t| *t > 150.0 && *t < 400.0));
            assert!(atm.p_pa.windows(2).all(|w| w[1] < w[0]));
            for (_, x) in &atm.mole_fractions {
                assert_eq!(x.len(), 61);
                assert!(x.iter().all(|v| (0.0..=1.0).contains(v)));
            }
        }
    }

    #[test]
    fn test_ideal_gas_consistency() {
        let atm = synthetic_atmosphere(AtmosphereKind::Tropical, 11);
        for i in 0..atm.len() {
            let expected = atm.p_pa[i] / (BOLTZMANN * atm.t_k[i]);
            assert!((atm.n_m3[i] - expected).abs() <= 1e-12 * expected);
        }
    }

    #[test]
    fn test_ozone_peaks_in_stratosphere() {
        let atm = synthetic_atmosphere(AtmosphereKind::UsStandard, 121);
        let o3 = atm.mole_fraction("O3").unwrap();
        let (peak, _) = o3
            .iter()
            .enumerate()
            .fold((0, 0.0), |acc, (i, v)| if *v > acc.1 { (i, *v) } else { acc });
        assert_eq!(atm.z_km[peak], 30.0);
    }

    #[test]
    fn test_unknown_molecule_is_none() {
        let atm = synthetic_atmosphere(AtmosphereKind::SubarcticWinter, 5);
        assert!(atm.mole_fraction("SF6").is_none());
    }
}
