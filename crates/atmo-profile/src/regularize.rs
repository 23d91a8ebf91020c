//! Resampling onto an evenly spaced altitude grid.

use std::fmt;
use std::str::FromStr;

use atmo_units::Quantity;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProfileError, Result};
use crate::interp::{interp_recording, FillPolicy, InterpMethod, InterpOptions};
use crate::schema::Dataset;

/// Tolerance absorbing floating-point error when counting grid steps.
const STEP_EPSILON: f64 = 1e-9;

/// Largest regular grid a step or point count may produce.
pub const MAX_GRID_POINTS: usize = 1_000_000;

/// Fixed altitude step of a regular grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ZStep {
    /// The smallest spacing of the original grid.
    Auto,
    /// An explicit spacing, such as `0.1 km`.
    Fixed(Quantity),
}

impl FromStr for ZStep {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(ZStep::Auto);
        }
        let step: Quantity = s.parse().map_err(|_| {
            ProfileError::invalid_value(format!(
                "zstep must be 'auto' or an altitude step such as '0.1 km' (got '{}')",
                s
            ))
        })?;
        Ok(ZStep::Fixed(step))
    }
}

impl TryFrom<String> for ZStep {
    type Error = ProfileError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ZStep> for String {
    fn from(step: ZStep) -> Self {
        step.to_string()
    }
}

impl fmt::Display for ZStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZStep::Auto => write!(f, "auto"),
            ZStep::Fixed(step) => write!(f, "{}", step),
        }
    }
}

/// Grid definition: a point count or a fixed step, exactly one of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegularizeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zstep: Option<ZStep>,
}

impl RegularizeOptions {
    pub fn num(num: usize) -> Self {
        Self {
            num: Some(num),
            zstep: None,
        }
    }

    pub fn zstep(zstep: ZStep) -> Self {
        Self {
            num: None,
            zstep: Some(zstep),
        }
    }

    /// Check that exactly one grid definition is present.
    pub fn validate(&self) -> Result<()> {
        match (&self.num, &self.zstep) {
            (None, None) => Err(ProfileError::invalid_value(
                "regularize options must contain either 'num' or 'zstep'",
            )),
            (Some(_), Some(_)) => Err(ProfileError::invalid_value(
                "regularize options must contain only one of 'num' and 'zstep'",
            )),
            (Some(0), None) => Err(ProfileError::invalid_value(
                "regularize 'num' must be at least 1",
            )),
            (Some(num), None) if *num > MAX_GRID_POINTS => Err(ProfileError::invalid_value(
                format!("regularize 'num' must not exceed {} (got {})", MAX_GRID_POINTS, num),
            )),
            _ => Ok(()),
        }
    }

    /// The regular grid spanning the altitude range of `ds`, in `z` units.
    pub fn grid(&self, ds: &Dataset) -> Result<Vec<f64>> {
        self.validate()?;
        let (z_min, z_max) = range(ds)?;

        if let Some(num) = self.num {
            return Ok(linspace(z_min, z_max, num));
        }

        let step = match &self.zstep {
            Some(ZStep::Fixed(step)) => step
                .to_unit(&ds.z().units)?
                .magnitude()
                .first()
                .copied()
                .ok_or_else(|| ProfileError::invalid_value("zstep is empty"))?,
            _ => min_spacing(ds)?,
        };
        if !(step.is_finite() && step > 0.0) {
            return Err(ProfileError::invalid_value(format!(
                "zstep must be strictly positive (got {})",
                step
            )));
        }

        let count = grid_points(z_min, z_max, step)? - 1;
        Ok((0..=count)
            .map(|i| (z_min + i as f64 * step).min(z_max))
            .collect())
    }
}

fn range(ds: &Dataset) -> Result<(f64, f64)> {
    let z = &ds.z().values;
    match (z.first(), z.last()) {
        (Some(lo), Some(hi)) => Ok((*lo, *hi)),
        _ => Err(ProfileError::schema("profile has no altitude samples")),
    }
}

/// Smallest spacing between consecutive altitudes.
fn min_spacing(ds: &Dataset) -> Result<f64> {
    ds.z()
        .values
        .windows(2)
        .map(|w| w[1] - w[0])
        .min_by(f64::total_cmp)
        .ok_or_else(|| {
            ProfileError::invalid_value("cannot infer an altitude step from a single altitude")
        })
}

/// `num` evenly spaced values from `start` to `stop`, both included.
fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num)
                .map(|i| {
                    if i == num - 1 {
                        stop
                    } else {
                        start + i as f64 * step
                    }
                })
                .collect()
        }
    }
}

/// Number of points of a regular grid as fine as the finest spacing of
/// `ds`: `floor((z_max - z_min) / min Δz) + 1`.
pub fn default_num(ds: &Dataset) -> Result<usize> {
    let (z_min, z_max) = range(ds)?;
    if ds.len() < 2 {
        return Ok(1);
    }
    let step = min_spacing(ds)?;
    grid_points(z_min, z_max, step)
}

/// Points of the grid stepping from `z_min` towards `z_max` by `step`.
fn grid_points(z_min: f64, z_max: f64, step: f64) -> Result<usize> {
    let intervals = ((z_max - z_min) / step + STEP_EPSILON).floor();
    if !intervals.is_finite() || intervals < 0.0 || intervals >= MAX_GRID_POINTS as f64 {
        return Err(ProfileError::invalid_value(format!(
            "a step of {} over [{}, {}] exceeds {} grid points",
            step, z_min, z_max, MAX_GRID_POINTS
        )));
    }
    Ok(intervals as usize + 1)
}

/// Resample `ds` onto a regular grid spanning its altitude range.
pub fn regularize(
    ds: &Dataset,
    method: &InterpMethod,
    conserve_column: bool,
    options: &RegularizeOptions,
) -> Result<Dataset> {
    let grid = options.grid(ds)?;
    debug!(points = grid.len(), "regularizing altitude grid");

    let message = format!("regularized altitude grid ({} altitudes)", grid.len());
    let z_new = Quantity::new(grid, ds.z().units.clone());
    interp_recording(
        ds,
        &z_new,
        &InterpOptions {
            method: method.clone(),
            conserve_column,
            fill: FillPolicy::BoundsError,
        },
        &message,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use std::collections::BTreeMap;
    use test_utils::assert_approx_eq;

    fn irregular() -> Dataset {
        let z: Vec<f64> = vec![0.0, 0.5, 1.0, 2.0, 4.0, 7.0, 10.0];
        let len = z.len();
        let mut data_vars = BTreeMap::new();
        data_vars.insert(
            "p".to_string(),
            Quantity::with_units(z.iter().map(|z| 1e5 * (-z / 8.0).exp()).collect(), "Pa")
                .unwrap(),
        );
        data_vars.insert("t".to_string(), Quantity::with_units(vec![250.0; len], "K").unwrap());
        data_vars.insert("x_O2".to_string(), Quantity::dimensionless(vec![0.21; len]));
        let mut coords = BTreeMap::new();
        coords.insert("z".to_string(), Quantity::with_units(z, "km").unwrap());
        Schema.convert(&data_vars, &coords, &BTreeMap::new()).unwrap()
    }

    fn assert_regular(z: &[f64]) {
        let step = z[1] - z[0];
        for w in z.windows(2) {
            assert_approx_eq!(w[1] - w[0], step, 1e-9);
        }
    }

    #[test]
    fn test_regularize_by_num() {
        let ds = irregular();
        let out = regularize(&ds, &InterpMethod::default(), false, &RegularizeOptions::num(11))
            .unwrap();
        assert_eq!(out.len(), 11);
        assert_regular(&out.z().values);
        assert_eq!(out.z().values[10], 10.0);
        assert!(Schema.is_valid(&out, true));
    }

    #[test]
    fn test_regularize_by_zstep() {
        let ds = irregular();
        let step = ZStep::Fixed(Quantity::scalar(250.0, "m").unwrap());
        let out = regularize(&ds, &InterpMethod::default(), false, &RegularizeOptions::zstep(step))
            .unwrap();
        assert_eq!(out.len(), 41);
        assert_regular(&out.z().values);
    }

    #[test]
    fn test_regularize_auto_step_uses_smallest_spacing() {
        let ds = irregular();
        let out = regularize(
            &ds,
            &InterpMethod::default(),
            false,
            &RegularizeOptions::zstep(ZStep::Auto),
        )
        .unwrap();
        assert_eq!(out.len(), 21);
        assert_eq!(default_num(&ds).unwrap(), 21);
    }

    #[test]
    fn test_regularize_requires_one_option() {
        let ds = irregular();
        let neither = RegularizeOptions::default();
        assert!(matches!(
            regularize(&ds, &InterpMethod::default(), false, &neither),
            Err(ProfileError::InvalidValue(_))
        ));
        let both = RegularizeOptions {
            num: Some(3),
            zstep: Some(ZStep::Auto),
        };
        assert!(both.validate().is_err());
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        let ds = irregular();
        let tiny = ZStep::Fixed(Quantity::scalar(1e-15, "km").unwrap());
        assert!(matches!(
            regularize(&ds, &InterpMethod::default(), false, &RegularizeOptions::zstep(tiny)),
            Err(ProfileError::InvalidValue(_))
        ));
        assert!(matches!(
            RegularizeOptions::num(MAX_GRID_POINTS + 1).grid(&ds),
            Err(ProfileError::InvalidValue(_))
        ));
        let grid = RegularizeOptions::num(MAX_GRID_POINTS).grid(&ds).unwrap();
        assert_eq!(grid.len(), MAX_GRID_POINTS);

        let step = 10.0 / (MAX_GRID_POINTS - 1) as f64;
        let finest = ZStep::Fixed(Quantity::scalar(step, "km").unwrap());
        let grid = RegularizeOptions::zstep(finest).grid(&ds).unwrap();
        assert_eq!(grid.len(), MAX_GRID_POINTS);
    }

    #[test]
    fn test_zstep_parsing() {
        assert_eq!("auto".parse::<ZStep>().unwrap(), ZStep::Auto);
        match "0.1 km".parse::<ZStep>().unwrap() {
            ZStep::Fixed(q) => assert_approx_eq!(q.value_as("m").unwrap(), 100.0, 1e-9),
            ZStep::Auto => panic!("expected a fixed step"),
        }
        assert!("smallest".parse::<ZStep>().is_err());

        let options: RegularizeOptions = serde_json::from_str(r#"{"zstep": "auto"}"#).unwrap();
        assert_eq!(options, RegularizeOptions::zstep(ZStep::Auto));
    }

    #[test]
    fn test_linspace_includes_endpoints() {
        let grid = linspace(0.0, 120.0, 1201);
        assert_eq!(grid.len(), 1201);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[1200], 120.0);
    }
}
