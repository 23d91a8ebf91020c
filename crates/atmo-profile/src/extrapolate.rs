//! Extension of a profile beyond its altitude range.

use std::fmt;
use std::str::FromStr;

use atmo_units::Quantity;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{ProfileError, Result};
use crate::interp::{interp_recording, FillPolicy, InterpMethod, InterpOptions};
use crate::schema::Dataset;

/// Side of the profile that is extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Above the highest altitude.
    Up,
    /// Below the lowest altitude.
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl FromStr for Direction {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(ProfileError::invalid_value(format!(
                "direction must be 'up' or 'down' (got '{}')",
                s
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extend `ds` to the altitudes `z_extra`, all strictly above (`Up`) or
/// strictly below (`Down`) the current range.
///
/// Every variable is evaluated past the end samples with its
/// interpolation kind. With `conserve_column`, mole fractions are then
/// rescaled to keep the column number densities of `ds`.
pub fn extrapolate(
    ds: &Dataset,
    z_extra: &Quantity,
    direction: Direction,
    method: &InterpMethod,
    conserve_column: bool,
) -> Result<Dataset> {
    let z = &ds.z().values;
    let (z_min, z_max) = match (z.first(), z.last()) {
        (Some(lo), Some(hi)) => (*lo, *hi),
        _ => return Err(ProfileError::schema("profile has no altitude samples")),
    };

    let extra = z_extra.to_unit(&ds.z().units)?.into_magnitude();
    if extra.is_empty() {
        return Err(ProfileError::invalid_value("no altitude to extrapolate to"));
    }

    let beyond = |v: &f64| match direction {
        Direction::Up => *v > z_max,
        Direction::Down => *v < z_min,
    };
    if !extra.iter().all(beyond) {
        let msg = match direction {
            Direction::Up => format!(
                "cannot extrapolate up to altitudes not strictly above {} {}",
                z_max,
                ds.z().units
            ),
            Direction::Down => format!(
                "cannot extrapolate down to altitudes not strictly below {} {}",
                z_min,
                ds.z().units
            ),
        };
        error!("{}", msg);
        return Err(ProfileError::invalid_value(msg));
    }

    let mut z_new = extra.clone();
    z_new.extend_from_slice(z);
    let z_new = Quantity::new(z_new, ds.z().units.clone());

    let options = InterpOptions {
        method: method.clone(),
        conserve_column,
        fill: FillPolicy::Extrapolate,
    };
    let message = format!("extrapolated {} altitude(s) {}", extra.len(), direction);
    let out = interp_recording(ds, &z_new, &options, &message)?;
    info!(points = extra.len(), direction = %direction, "extrapolated dataset");
    Ok(out)
}
