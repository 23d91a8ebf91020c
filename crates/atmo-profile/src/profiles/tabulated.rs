//! Fixed-grid profile source backed by a canonical dataset.

use atmo_units::Quantity;
use tracing::debug;

use super::string_param;
use crate::error::{ProfileError, Result};
use crate::interp::{interp, InterpMethod};
use crate::io::open_dataset;
use crate::registry::{Params, Profile};
use crate::schema::{Dataset, Schema};

pub(super) const IDENTIFIER: &str = "tabulated";

/// A profile tabulated on a fixed altitude grid.
#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedProfile {
    dataset: Dataset,
}

impl TabulatedProfile {
    /// Wrap a dataset, which must be valid.
    pub fn new(dataset: Dataset) -> Result<Self> {
        Schema.validate(&dataset, false)?;
        Ok(Self { dataset })
    }

    /// Build from the `path` parameter naming a persisted dataset.
    pub fn from_params(params: &Params) -> Result<Self> {
        let path = string_param(params, "path")?.ok_or_else(|| {
            ProfileError::invalid_value("tabulated profile requires a 'path' parameter")
        })?;
        debug!(path, "loading tabulated profile");
        Self::new(open_dataset(path)?)
    }

    pub(super) fn construct(params: &Params) -> Result<Box<dyn Profile>> {
        Ok(Box::new(Self::from_params(params)?))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}

impl Profile for TabulatedProfile {
    fn to_dataset(
        &self,
        z: Option<&Quantity>,
        interp_method: Option<&InterpMethod>,
        conserve_column: bool,
    ) -> Result<Dataset> {
        match z {
            None => Ok(self.dataset.clone()),
            Some(z) => {
                let default_method = InterpMethod::default();
                let method = interp_method.unwrap_or(&default_method);
                interp(&self.dataset, z, method, conserve_column)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::write_dataset;
    use crate::profiles::IsothermalProfile;
    use serde_json::json;
    use test_utils::paths::temp_test_dir;

    fn source() -> Dataset {
        IsothermalProfile::default().to_dataset(None, None, false).unwrap()
    }

    #[test]
    fn test_native_grid_and_interpolation() {
        let ds = source();
        let profile = TabulatedProfile::new(ds.clone()).unwrap();
        assert_eq!(profile.to_dataset(None, None, false).unwrap(), ds);

        let z = Quantity::with_units(vec![0.5, 1.5], "km").unwrap();
        let ds = profile.to_dataset(Some(&z), None, true).unwrap();
        assert_eq!(ds.z().values, vec![0.5, 1.5]);

        let outside = Quantity::with_units(vec![130.0], "km").unwrap();
        assert!(matches!(
            profile.to_dataset(Some(&outside), None, false),
            Err(ProfileError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_from_path_param() {
        let dir = temp_test_dir();
        let path = dir.path().join("isothermal.json");
        write_dataset(&source(), &path).unwrap();

        let mut params = Params::new();
        params.insert("path".to_string(), json!(path.to_string_lossy()));
        let profile = TabulatedProfile::from_params(&params).unwrap();
        assert_eq!(profile.dataset().len(), 121);

        assert!(TabulatedProfile::from_params(&Params::new()).is_err());
    }
}
