//! Common test fixtures for atmospheric profile tests.
//!
//! This module provides pre-defined values that represent common scenarios
//! in profile processing.

/// Boltzmann constant [J/K].
pub const BOLTZMANN: f64 = 1.380649e-23;

/// Molecules included in every synthetic atmosphere.
pub const SYNTHETIC_MOLECULES: [&str; 7] = ["H2O", "CO2", "O3", "N2O", "CO", "CH4", "O2"];

/// Common altitude grids, as (start, stop, number of points) in km.
pub mod grids {
    /// The reference 1201-point grid, every 100 m up to 120 km.
    pub const FINE_0_120: (f64, f64, usize) = (0.0, 120.0, 1201);

    /// Every kilometre up to 120 km.
    pub const COARSE_0_120: (f64, f64, usize) = (0.0, 120.0, 121);

    /// A grid reaching beyond the usual 120 km top.
    pub const BEYOND_TOP: (f64, f64, usize) = (0.0, 130.0, 131);

    /// Small grid for quick tests.
    pub const SMALL_0_10: (f64, f64, usize) = (0.0, 10.0, 11);
}

/// Typical column amount targets, as quantity strings.
pub mod targets {
    /// Ozone total column.
    pub const O3_350_DU: &str = "350 dobson_unit";

    /// Precipitable water column.
    pub const H2O_20_KG_M2: &str = "20 kg * m^-2";

    /// Surface CO2 mole fraction.
    pub const CO2_400_PPM: &str = "400 ppm";
}

/// Typical surface values.
pub mod surface {
    pub const PRESSURE_PA: f64 = 101_325.0;
    pub const TEMPERATURE_K: f64 = 288.15;
}
