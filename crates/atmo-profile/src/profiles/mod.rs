//! Built-in profile sources.
//!
//! | Identifier | Source |
//! |---|---|
//! | `tabulated` | A canonical dataset read from a persisted file |
//! | `isothermal` | Isothermal barometric model |

mod isothermal;
mod tabulated;

use std::collections::BTreeMap;

use atmo_units::Quantity;
use serde_json::Value;

use crate::error::{ProfileError, Result};
use crate::registry::{Params, ProfileFactory};

pub use isothermal::IsothermalProfile;
pub use tabulated::TabulatedProfile;

/// Register every built-in source in `factory`.
pub fn register_builtins(factory: &mut ProfileFactory) {
    factory.register(tabulated::IDENTIFIER, TabulatedProfile::construct);
    factory.register(isothermal::IDENTIFIER, IsothermalProfile::construct);
}

// ============================================================================
// Parameter helpers
// ============================================================================

/// A scalar parameter in `units`.
///
/// Numbers are taken to be in `units` already. Strings are parsed as
/// quantities (`"101325 Pa"`, `"8 km"`); a bare number string is taken to
/// be in `units` as well.
pub(crate) fn quantity_param(params: &Params, key: &str, units: &str) -> Result<Option<f64>> {
    let value = match params.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid_param(key, value)),
        Value::String(s) => {
            let q: Quantity = s.parse()?;
            if q.units().is_dimensionless() {
                Ok(q.magnitude().first().copied())
            } else {
                Ok(Some(q.value_as(units)?))
            }
        }
        _ => Err(invalid_param(key, value)),
    }
}

/// A string parameter.
pub(crate) fn string_param<'a>(params: &'a Params, key: &str) -> Result<Option<&'a str>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(value) => Err(invalid_param(key, value)),
    }
}

/// A molecule to mole fraction map, given as an object or as
/// `"N2=0.78,O2=0.21"`.
pub(crate) fn mole_fractions_param(
    params: &Params,
    key: &str,
) -> Result<Option<BTreeMap<String, f64>>> {
    let value = match params.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };
    let mut map = BTreeMap::new();
    match value {
        Value::Object(object) => {
            for (m, x) in object {
                let x = x.as_f64().ok_or_else(|| invalid_param(key, value))?;
                map.insert(m.clone(), x);
            }
        }
        Value::String(s) => {
            for item in s.split(',').map(str::trim).filter(|i| !i.is_empty()) {
                let (m, x) = item.split_once('=').ok_or_else(|| invalid_param(key, value))?;
                let x: f64 = x.trim().parse().map_err(|_| invalid_param(key, value))?;
                map.insert(m.trim().to_string(), x);
            }
        }
        _ => return Err(invalid_param(key, value)),
    }
    Ok(Some(map))
}

fn invalid_param(key: &str, value: &Value) -> ProfileError {
    ProfileError::invalid_value(format!("invalid value for parameter '{}': {}", key, value))
}
