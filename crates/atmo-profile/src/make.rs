//! The profile creation pipeline.

use atmo_units::Quantity;
use tracing::{debug, info};

use crate::cells::represent_in_cells;
use crate::config::MakeConfig;
use crate::error::{ProfileError, Result};
use crate::registry::{self, Params};
use crate::regularize::{default_num, regularize, RegularizeOptions};
use crate::rescale::{rescale_to, select_molecules};
use crate::schema::Dataset;

/// Create the profile registered under `identifier` and run the
/// configured transformations on it.
///
/// Steps, each optional except the first:
///
/// 1. `create` and `to_dataset` (on `z` when given)
/// 2. molecule selection
/// 3. regularization
/// 4. cell representation
/// 5. rescaling to target amounts
pub fn make(
    identifier: &str,
    z: Option<&Quantity>,
    params: &Params,
    config: &MakeConfig,
) -> Result<Dataset> {
    info!(identifier, "creating profile");
    debug!(?config, "make configuration");
    config.validate().map_err(ProfileError::InvalidValue)?;

    let profile = registry::create(identifier, params)?;
    let method = &config.interp_method;
    let mut ds = profile.to_dataset(z, Some(method), config.conserve_column)?;

    if let Some(molecules) = &config.molecules {
        debug!(?molecules, "selecting molecules");
        ds = select_molecules(&ds, molecules)?;
    }

    if let Some(options) = &config.regularize {
        let options = if options.num.is_none() && options.zstep.is_none() {
            RegularizeOptions::num(default_num(&ds)?)
        } else {
            options.clone()
        };
        ds = regularize(&ds, method, config.conserve_column, &options)?;
    }

    if config.represent_in_cells {
        ds = represent_in_cells(&ds, method)?;
    }

    if !config.rescale_to.is_empty() {
        let target = config.target_amounts()?;
        ds = rescale_to(&ds, &target, config.check_mole_fraction_sum)?;
    }

    info!(identifier, points = ds.len(), "created profile");
    Ok(ds)
}
