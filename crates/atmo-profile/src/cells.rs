//! Cell (layer) representation of a profile.
//!
//! A point profile samples each variable at altitude levels. Its cell
//! representation has one sample per interval between consecutive
//! levels, located at the interval centre, with the interval edges kept
//! as cell bounds.

use atmo_units::Quantity;
use tracing::{debug, info};

use crate::error::{ProfileError, Result};
use crate::interp::{interp_recording, FillPolicy, InterpMethod, InterpOptions};
use crate::schema::Dataset;

/// Represent `ds` in altitude cells.
///
/// A profile that already has cell bounds is returned unchanged.
pub fn represent_in_cells(ds: &Dataset, method: &InterpMethod) -> Result<Dataset> {
    if ds.has_cell_bounds() {
        debug!("dataset is already represented in cells");
        return Ok(ds.clone());
    }

    let z = &ds.z().values;
    if z.len() < 2 {
        return Err(ProfileError::invalid_value(
            "at least two altitudes are required to build cells",
        ));
    }

    let bounds: Vec<(f64, f64)> = z.windows(2).map(|w| (w[0], w[1])).collect();
    let centres: Vec<f64> = bounds.iter().map(|(lo, hi)| 0.5 * (lo + hi)).collect();
    let z_centres = Quantity::new(centres, ds.z().units.clone());

    let message = format!("represented dataset in {} altitude cells", bounds.len());
    let cells = interp_recording(
        ds,
        &z_centres,
        &InterpOptions {
            method: method.clone(),
            conserve_column: false,
            fill: FillPolicy::BoundsError,
        },
        &message,
    )?;
    info!(cells = bounds.len(), "represented dataset in cells");
    Ok(cells.with_bounds(Some(bounds)))
}
