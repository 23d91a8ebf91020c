//! Rescaling engine: match molecular amounts to target values.
//!
//! A target amount is interpreted by its dimensionality:
//!
//! | Dimension | Compared with |
//! |---|---|
//! | `[length]^-2` | column number density |
//! | `[mass] * [length]^-2` | column mass density |
//! | `[length]^-3` | number density at the lowest altitude |
//! | `[mass] * [length]^-3` | mass density at the lowest altitude |
//! | dimensionless | mole fraction at the lowest altitude |

use std::collections::BTreeMap;
use std::fmt;

use atmo_units::{Dimension, Quantity};
use tracing::{debug, error, info};

use crate::derived;
use crate::error::{ProfileError, Result};
use crate::schema::{Dataset, Schema};

/// How a target amount is compared with the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountKind {
    ColumnNumberDensity,
    ColumnMassDensity,
    NumberDensityAtSeaLevel,
    MassDensityAtSeaLevel,
    MoleFractionAtSeaLevel,
}

impl AmountKind {
    /// The kind selected by a target's dimensionality.
    pub fn from_dimension(dimension: Dimension) -> Option<Self> {
        match dimension {
            d if d == Dimension::COLUMN_NUMBER_DENSITY => Some(Self::ColumnNumberDensity),
            d if d == Dimension::COLUMN_MASS_DENSITY => Some(Self::ColumnMassDensity),
            d if d == Dimension::NUMBER_DENSITY => Some(Self::NumberDensityAtSeaLevel),
            d if d == Dimension::MASS_DENSITY => Some(Self::MassDensityAtSeaLevel),
            d if d == Dimension::DIMENSIONLESS => Some(Self::MoleFractionAtSeaLevel),
            _ => None,
        }
    }

    /// Current amounts of every molecule of `ds`.
    pub fn initial_amounts(&self, ds: &Dataset) -> Result<BTreeMap<String, Quantity>> {
        match self {
            Self::ColumnNumberDensity => derived::column_number_density(ds),
            Self::ColumnMassDensity => derived::column_mass_density(ds),
            Self::NumberDensityAtSeaLevel => derived::number_density_at_sea_level(ds),
            Self::MassDensityAtSeaLevel => derived::mass_density_at_sea_level(ds),
            Self::MoleFractionAtSeaLevel => derived::mole_fraction_at_sea_level(ds),
        }
    }
}

impl fmt::Display for AmountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ColumnNumberDensity => "column number density",
            Self::ColumnMassDensity => "column mass density",
            Self::NumberDensityAtSeaLevel => "number density at sea level",
            Self::MassDensityAtSeaLevel => "mass density at sea level",
            Self::MoleFractionAtSeaLevel => "mole fraction at sea level",
        };
        write!(f, "{}", name)
    }
}

/// Factor turning `initial` into `target`.
///
/// Zero initial and target amounts give a factor of zero. A zero initial
/// amount with a non-zero target has no finite factor.
pub fn scaling_factor(initial: &Quantity, target: &Quantity) -> Result<f64> {
    let initial_value = initial
        .magnitude()
        .first()
        .copied()
        .ok_or_else(|| ProfileError::invalid_value("initial amount is empty"))?;
    let target_value = target.to_unit(initial.units())?.magnitude().first().copied().ok_or_else(
        || ProfileError::invalid_value("target amount is empty"),
    )?;

    if initial_value == 0.0 {
        if target_value == 0.0 {
            return Ok(0.0);
        }
        return Err(ProfileError::invalid_value(format!(
            "cannot compute scaling factor when initial amount has magnitude of zero \
             and target amount has a non-zero magnitude (got {})",
            target
        )));
    }
    Ok(target_value / initial_value)
}

/// Scaling factors reaching each molecule's target amount.
pub fn scaling_factors(
    ds: &Dataset,
    target: &BTreeMap<String, Quantity>,
) -> Result<BTreeMap<String, f64>> {
    let mut factors = BTreeMap::new();

    for (m, amount) in target {
        let kind = AmountKind::from_dimension(amount.dimension()).ok_or_else(|| {
            ProfileError::invalid_value(format!(
                "target amount for {} has unsupported dimensionality {}",
                m,
                amount.dimension()
            ))
        })?;

        let initial_amounts = kind.initial_amounts(ds)?;
        let initial = initial_amounts.get(m).ok_or_else(|| {
            ProfileError::invalid_value(format!("molecule '{}' is not in the profile", m))
        })?;

        let factor = scaling_factor(initial, amount)?;
        debug!(molecule = %m, kind = %kind, factor, "computed scaling factor");
        factors.insert(m.clone(), factor);
    }
    Ok(factors)
}

/// Multiply mole fractions by per-molecule factors, without validation or
/// history.
pub(crate) fn apply_factors(ds: &Dataset, factors: &BTreeMap<String, f64>) -> Result<Dataset> {
    let mut scaled = Vec::with_capacity(factors.len());
    for (m, factor) in factors {
        let x = ds.mole_fraction(m).ok_or_else(|| {
            ProfileError::invalid_value(format!("molecule '{}' is not in the profile", m))
        })?;
        scaled.push(x.with_values(x.values.iter().map(|v| v * factor).collect()));
    }
    Ok(ds.with_data_vars(scaled))
}

/// Format `value` with `digits` significant digits.
///
/// Fixed notation is used while the rounded value has an exponent in
/// `-4..digits`, scientific notation otherwise.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }
    let digits = digits.max(1);
    let scientific = format!("{:.*e}", digits - 1, value);
    // exponent after rounding, so 9.996 counts as 1.00e1
    let exponent = scientific
        .rsplit_once('e')
        .and_then(|(_, e)| e.parse::<i32>().ok())
        .unwrap_or(0);
    if (-4..digits as i32).contains(&exponent) {
        let decimals = (digits as i32 - 1 - exponent) as usize;
        format!("{:.*}", decimals, value)
    } else {
        scientific
    }
}

/// Rescale mole fractions by per-molecule factors.
///
/// The result is validated (with the mole fraction sum check when
/// requested) before it is returned. One history entry is recorded per
/// rescaled molecule.
pub fn rescale(
    ds: &Dataset,
    factors: &BTreeMap<String, f64>,
    check_mole_fraction_sum: bool,
) -> Result<Dataset> {
    let mut candidate = apply_factors(ds, factors)?;

    if let Err(e) = Schema.validate(&candidate, check_mole_fraction_sum) {
        error!(error = %e, "rescaled dataset is not valid");
        return Err(ProfileError::rescale_impossible(e.to_string()));
    }

    for (m, factor) in factors {
        candidate = candidate.with_history(format!(
            "rescaled {}'s mole fraction using a scaling factor of {}",
            m,
            format_significant(*factor, 3)
        ));
    }
    info!(molecules = factors.len(), "rescaled dataset");
    Ok(candidate)
}

/// Rescale mole fractions to reach target amounts.
pub fn rescale_to(
    ds: &Dataset,
    target: &BTreeMap<String, Quantity>,
    check_mole_fraction_sum: bool,
) -> Result<Dataset> {
    let factors = scaling_factors(ds, target)?;
    rescale(ds, &factors, check_mole_fraction_sum)
}

/// Remove mole fraction variables.
pub fn drop_molecules(ds: &Dataset, molecules: &[String]) -> Result<Dataset> {
    let available = ds.molecules();
    if let Some(missing) = molecules.iter().find(|m| !available.contains(m)) {
        return Err(ProfileError::invalid_value(format!(
            "cannot drop molecule '{}', available molecules are {:?}",
            missing, available
        )));
    }
    let names: Vec<String> = molecules
        .iter()
        .map(|m| crate::constants::mole_fraction_var(m))
        .collect();
    Ok(ds.without_data_vars(&names).with_history(format!(
        "dropped mole fraction data for molecules {}",
        molecules.join(", ")
    )))
}

/// Keep exactly the listed molecules.
pub fn select_molecules(ds: &Dataset, molecules: &[String]) -> Result<Dataset> {
    let available = ds.molecules();
    if molecules.iter().any(|m| !available.contains(m)) {
        return Err(ProfileError::invalid_value(format!(
            "could not select molecules {:?}, available molecules are {:?}",
            molecules, available
        )));
    }
    let dropped: Vec<String> = available
        .into_iter()
        .filter(|m| !molecules.contains(m))
        .collect();
    if dropped.is_empty() {
        return Ok(ds.clone());
    }
    drop_molecules(ds, &dropped)
}
