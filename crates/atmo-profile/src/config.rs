//! Configuration of the `make` pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use atmo_units::Quantity;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::is_known_molecule;
use crate::error::{ProfileError, Result};
use crate::interp::InterpMethod;
use crate::regularize::{RegularizeOptions, ZStep};
use crate::rescale::AmountKind;

/// Options of [`crate::make::make`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MakeConfig {
    /// Interpolation kind per variable (`default`, `p`, `t`, `n`, `x`,
    /// `x_M`).
    pub interp_method: InterpMethod,

    /// Keep column number densities through interpolation.
    pub conserve_column: bool,

    /// Molecules to keep; all when absent.
    pub molecules: Option<Vec<String>>,

    /// Represent the profile in altitude cells.
    pub represent_in_cells: bool,

    /// Resample onto a regular altitude grid; empty options use the
    /// default point count.
    pub regularize: Option<RegularizeOptions>,

    /// Target amounts, molecule to quantity string (`"350 dobson_unit"`).
    pub rescale_to: BTreeMap<String, String>,

    /// Reject rescaled profiles whose mole fractions sum above one.
    pub check_mole_fraction_sum: bool,
}

impl Default for MakeConfig {
    fn default() -> Self {
        Self {
            interp_method: InterpMethod::default(),
            conserve_column: false,
            molecules: None,
            represent_in_cells: false,
            regularize: None,
            rescale_to: BTreeMap::new(),
            check_mole_fraction_sum: false,
        }
    }
}

impl MakeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from a variable lookup. Unparsable values are
    /// ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("ATMO_INTERP_METHOD") {
            if let Ok(method) = val.parse() {
                config.interp_method = method;
            }
        }

        if let Some(val) = lookup("ATMO_CONSERVE_COLUMN") {
            config.conserve_column = parse_flag(&val);
        }

        if let Some(val) = lookup("ATMO_CHECK_X_SUM") {
            config.check_mole_fraction_sum = parse_flag(&val);
        }

        if let Some(val) = lookup("ATMO_REPRESENT_IN_CELLS") {
            config.represent_in_cells = parse_flag(&val);
        }

        if let Some(val) = lookup("ATMO_REGULARIZE_NUM") {
            if let Ok(num) = val.parse() {
                config.regularize = Some(RegularizeOptions::num(num));
            }
        }

        if let Some(val) = lookup("ATMO_REGULARIZE_ZSTEP") {
            if let Ok(zstep) = val.parse::<ZStep>() {
                config.regularize = Some(RegularizeOptions::zstep(zstep));
            }
        }

        if let Some(val) = lookup("ATMO_MOLECULES") {
            let molecules: Vec<String> = val
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            if !molecules.is_empty() {
                config.molecules = Some(molecules);
            }
        }

        config
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::default().with_yaml_file(path)
    }

    /// Overlay the keys of a YAML file onto this configuration.
    pub fn with_yaml_file(&self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading make configuration");
        let text = fs::read_to_string(path).map_err(|e| {
            ProfileError::Io(format!("cannot read '{}': {}", path.display(), e))
        })?;
        self.with_yaml_str(&text)
    }

    /// Overlay the keys of a YAML document onto this configuration.
    pub fn with_yaml_str(&self, text: &str) -> Result<Self> {
        let overlay: serde_yaml::Value = serde_yaml::from_str(text)?;
        let mut base = serde_yaml::to_value(self)?;
        match (&mut base, overlay) {
            (serde_yaml::Value::Mapping(base), serde_yaml::Value::Mapping(overlay)) => {
                for (key, value) in overlay {
                    base.insert(key, value);
                }
            }
            (_, serde_yaml::Value::Null) => {}
            _ => {
                return Err(ProfileError::Serialization(
                    "make configuration must be a YAML mapping".to_string(),
                ))
            }
        }
        Ok(serde_yaml::from_value(base)?)
    }

    /// Parsed target amounts.
    pub fn target_amounts(&self) -> Result<BTreeMap<String, Quantity>> {
        self.rescale_to
            .iter()
            .map(|(m, amount)| -> Result<(String, Quantity)> {
                Ok((m.clone(), amount.parse::<Quantity>()?))
            })
            .collect()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(options) = &self.regularize {
            // empty options select the default point count
            if options.num.is_some() || options.zstep.is_some() {
                options.validate().map_err(|e| e.to_string())?;
            }
        }

        if let Some(molecules) = &self.molecules {
            if molecules.is_empty() {
                return Err("molecules must not be empty".to_string());
            }
            if let Some(m) = molecules.iter().find(|m| !is_known_molecule(m)) {
                return Err(format!("unknown molecule '{}'", m));
            }
        }

        for (m, amount) in &self.rescale_to {
            if !is_known_molecule(m) {
                return Err(format!("unknown molecule '{}' in rescale_to", m));
            }
            let q: Quantity = amount
                .parse()
                .map_err(|e| format!("invalid target amount for {}: {}", m, e))?;
            if AmountKind::from_dimension(q.dimension()).is_none() {
                return Err(format!(
                    "target amount for {} has unsupported dimensionality {}",
                    m,
                    q.dimension()
                ));
            }
        }

        Ok(())
    }
}

fn parse_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::InterpKind;
    use test_utils::paths::{temp_test_dir, write_temp_file};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = MakeConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.regularize.is_none());
        assert_eq!(config.interp_method, InterpMethod::default());
    }

    #[test]
    fn test_from_lookup() {
        let config = MakeConfig::from_lookup(lookup(&[
            ("ATMO_INTERP_METHOD", "default=linear,p=cubic"),
            ("ATMO_CONSERVE_COLUMN", "true"),
            ("ATMO_CHECK_X_SUM", "1"),
            ("ATMO_REGULARIZE_NUM", "1201"),
            ("ATMO_MOLECULES", "H2O, O3"),
        ]));
        assert_eq!(config.interp_method.kind_for("p"), InterpKind::Cubic);
        assert!(config.conserve_column);
        assert!(config.check_mole_fraction_sum);
        assert!(!config.represent_in_cells);
        assert_eq!(config.regularize, Some(RegularizeOptions::num(1201)));
        assert_eq!(
            config.molecules,
            Some(vec!["H2O".to_string(), "O3".to_string()])
        );
    }

    #[test]
    fn test_from_lookup_ignores_unparsable_values() {
        let config = MakeConfig::from_lookup(lookup(&[
            ("ATMO_INTERP_METHOD", "bogus"),
            ("ATMO_REGULARIZE_NUM", "many"),
            ("ATMO_REGULARIZE_ZSTEP", "auto"),
        ]));
        assert_eq!(config.interp_method, InterpMethod::default());
        assert_eq!(config.regularize, Some(RegularizeOptions::zstep(ZStep::Auto)));
    }

    #[test]
    fn test_yaml_overlay() {
        let dir = temp_test_dir();
        let path = write_temp_file(
            &dir,
            "make.yaml",
            "interp_method:\n  default: linear\n  x: nearest\n\
             regularize:\n  zstep: 0.5 km\n\
             rescale_to:\n  O3: 350 dobson_unit\n",
        );
        let base = MakeConfig {
            conserve_column: true,
            ..MakeConfig::default()
        };
        let config = base.with_yaml_file(&path).unwrap();
        assert!(config.conserve_column);
        assert_eq!(config.interp_method.kind_for("x_O3"), InterpKind::Nearest);
        assert!(matches!(
            config.regularize.as_ref().and_then(|r| r.zstep.as_ref()),
            Some(ZStep::Fixed(_))
        ));
        let targets = config.target_amounts().unwrap();
        assert_eq!(targets["O3"].magnitude(), &[350.0]);
        assert!(config.validate().is_ok());

        let plain = MakeConfig::from_yaml_file(&path).unwrap();
        assert!(!plain.conserve_column);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = MakeConfig::default();
        config.rescale_to.insert("O3".to_string(), "350 Pa".to_string());
        assert!(config.validate().is_err());

        let mut config = MakeConfig::default();
        config.molecules = Some(vec!["XYZ".to_string()]);
        assert!(config.validate().is_err());

        let config = MakeConfig {
            regularize: Some(RegularizeOptions::num(0)),
            ..MakeConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MakeConfig {
            regularize: Some(RegularizeOptions::default()),
            ..MakeConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
