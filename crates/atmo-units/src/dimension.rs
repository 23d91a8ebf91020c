//! Physical dimensions expressed as exponents over base dimensions.

use std::fmt;

/// Names of the base dimensions, in exponent order.
const BASE_NAMES: [&str; 5] = ["length", "mass", "time", "temperature", "substance"];

/// Exponents of the base dimensions (length, mass, time, temperature,
/// amount of substance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimension([i8; 5]);

impl Dimension {
    pub const DIMENSIONLESS: Dimension = Dimension([0, 0, 0, 0, 0]);
    pub const LENGTH: Dimension = Dimension([1, 0, 0, 0, 0]);
    pub const MASS: Dimension = Dimension([0, 1, 0, 0, 0]);
    pub const TIME: Dimension = Dimension([0, 0, 1, 0, 0]);
    pub const TEMPERATURE: Dimension = Dimension([0, 0, 0, 1, 0]);
    pub const SUBSTANCE: Dimension = Dimension([0, 0, 0, 0, 1]);

    /// [mass] [length]^-1 [time]^-2
    pub const PRESSURE: Dimension = Dimension([-1, 1, -2, 0, 0]);
    /// [length]^-3
    pub const NUMBER_DENSITY: Dimension = Dimension([-3, 0, 0, 0, 0]);
    /// [length]^-2
    pub const COLUMN_NUMBER_DENSITY: Dimension = Dimension([-2, 0, 0, 0, 0]);
    /// [mass] [length]^-2
    pub const COLUMN_MASS_DENSITY: Dimension = Dimension([-2, 1, 0, 0, 0]);
    /// [mass] [length]^-3
    pub const MASS_DENSITY: Dimension = Dimension([-3, 1, 0, 0, 0]);
    /// [mass] [length]^2 [time]^-2
    pub const ENERGY: Dimension = Dimension([2, 1, -2, 0, 0]);

    /// Build a dimension from raw exponents.
    pub const fn new(length: i8, mass: i8, time: i8, temperature: i8, substance: i8) -> Self {
        Self([length, mass, time, temperature, substance])
    }

    /// Exponents in base-dimension order.
    pub fn exponents(&self) -> [i8; 5] {
        self.0
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::DIMENSIONLESS
    }

    /// Raise to an integer power, `None` on exponent overflow.
    pub fn checked_powi(self, exp: i8) -> Option<Self> {
        let mut out = self.0;
        for e in &mut out {
            *e = e.checked_mul(exp)?;
        }
        Some(Self(out))
    }

    /// Product of two dimensions, `None` on exponent overflow.
    pub fn checked_mul(self, rhs: Dimension) -> Option<Self> {
        let mut out = self.0;
        for (e, r) in out.iter_mut().zip(rhs.0) {
            *e = e.checked_add(r)?;
        }
        Some(Self(out))
    }

    /// Quotient of two dimensions, `None` on exponent overflow.
    pub fn checked_div(self, rhs: Dimension) -> Option<Self> {
        let mut out = self.0;
        for (e, r) in out.iter_mut().zip(rhs.0) {
            *e = e.checked_sub(r)?;
        }
        Some(Self(out))
    }
}

impl fmt::Display for Dimension {
    /// Formats as e.g. `[mass] * [length]^-2`, or `dimensionless`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "dimensionless");
        }
        let parts: Vec<String> = BASE_NAMES
            .iter()
            .zip(self.0)
            .filter(|(_, e)| *e != 0)
            .map(|(name, e)| {
                if e == 1 {
                    format!("[{}]", name)
                } else {
                    format!("[{}]^{}", name, e)
                }
            })
            .collect();
        // mass first reads more naturally for densities
        let mut ordered = parts.clone();
        if let Some(pos) = parts.iter().position(|p| p.starts_with("[mass]")) {
            let mass = ordered.remove(pos);
            ordered.insert(0, mass);
        }
        write!(f, "{}", ordered.join(" * "))
    }
}
