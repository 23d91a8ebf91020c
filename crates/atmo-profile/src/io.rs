//! Persistence of profiles as self-describing JSON documents.
//!
//! ```json
//! {
//!   "dims": {"z": 3},
//!   "coords": {
//!     "z": {"name": "z", "units": "km", "values": [0.0, 1.0, 2.0], ...},
//!     "z_bounds": {"units": "km", "values": [[-0.5, 0.5], ...]}
//!   },
//!   "data_vars": [{"name": "p", "units": "Pa", ...}, ...],
//!   "attrs": {"Conventions": "CF-1.10", "history": [...], ...}
//! }
//! ```
//!
//! `z_bounds` is only present for profiles represented in cells. Reading a
//! document validates the resulting dataset.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use atmo_units::Unit;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::attrs::Attributes;
use crate::error::{ProfileError, Result};
use crate::schema::{Dataset, Schema, Variable};

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    dims: BTreeMap<String, usize>,
    coords: Coords,
    data_vars: Vec<Variable>,
    attrs: Attributes,
}

#[derive(Debug, Serialize, Deserialize)]
struct Coords {
    z: Variable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    z_bounds: Option<Bounds>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Bounds {
    units: Unit,
    values: Vec<(f64, f64)>,
}

impl Document {
    fn from_dataset(ds: &Dataset) -> Self {
        let mut dims = BTreeMap::new();
        dims.insert("z".to_string(), ds.len());
        Self {
            dims,
            coords: Coords {
                z: ds.z().clone(),
                z_bounds: ds.z_bounds().map(|values| Bounds {
                    units: ds.z().units.clone(),
                    values: values.to_vec(),
                }),
            },
            data_vars: ds.data_vars().to_vec(),
            attrs: ds.attrs().clone(),
        }
    }

    fn into_dataset(self) -> Result<Dataset> {
        let z = self.coords.z;
        if let Some(len) = self.dims.get("z") {
            if *len != z.len() {
                return Err(ProfileError::schema(format!(
                    "dimension 'z' has size {} but coordinate 'z' has {} values",
                    len,
                    z.len()
                )));
            }
        }

        let z_bounds = match self.coords.z_bounds {
            Some(bounds) => {
                let (lower, upper): (Vec<f64>, Vec<f64>) = bounds.values.into_iter().unzip();
                let lower = bounds.units.convert(&lower, &z.units)?;
                let upper = bounds.units.convert(&upper, &z.units)?;
                Some(lower.into_iter().zip(upper).collect())
            }
            None => None,
        };

        Ok(Dataset::from_parts(z, z_bounds, self.data_vars, self.attrs))
    }
}

/// Serialize `ds` to a pretty-printed JSON string.
pub fn to_json_string(ds: &Dataset) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Document::from_dataset(ds))?)
}

/// Parse and validate a dataset from a JSON string.
pub fn from_json_str(s: &str) -> Result<Dataset> {
    let document: Document = serde_json::from_str(s)?;
    let ds = document.into_dataset()?;
    Schema.validate(&ds, false)?;
    Ok(ds)
}

/// Write `ds` to `path`.
pub fn write_dataset(ds: &Dataset, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    debug!(path = %path.display(), "writing dataset");
    fs::write(path, to_json_string(ds)?)?;
    info!(path = %path.display(), points = ds.len(), "wrote dataset");
    Ok(())
}

/// Read and validate a dataset from `path`.
pub fn open_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    debug!(path = %path.display(), "opening dataset");
    let text = fs::read_to_string(path).map_err(|e| {
        ProfileError::Io(format!("cannot read '{}': {}", path.display(), e))
    })?;
    from_json_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use atmo_units::Quantity;
    use test_utils::paths::temp_test_dir;

    fn profile() -> Dataset {
        let mut data_vars = BTreeMap::new();
        data_vars.insert(
            "p".to_string(),
            Quantity::with_units(vec![1013.25, 900.0, 800.0], "hPa").unwrap(),
        );
        data_vars.insert(
            "t".to_string(),
            Quantity::with_units(vec![15.0, 10.0, 5.0], "degC").unwrap(),
        );
        data_vars.insert("x_H2O".to_string(), Quantity::with_units(vec![1.0, 0.5, 0.1], "percent").unwrap());
        data_vars.insert("x_CO2".to_string(), Quantity::with_units(vec![400.0; 3], "ppm").unwrap());
        let mut coords = BTreeMap::new();
        coords.insert("z".to_string(), Quantity::with_units(vec![0.0, 1.0, 2.0], "km").unwrap());
        let mut attrs = BTreeMap::new();
        attrs.insert("title".to_string(), "round trip".to_string());
        Schema.convert(&data_vars, &coords, &attrs).unwrap()
    }

    #[test]
    fn test_json_round_trip() {
        let ds = profile();
        let text = to_json_string(&ds).unwrap();
        let back = from_json_str(&text).unwrap();
        assert_eq!(back.z(), ds.z());
        assert_eq!(back.data_vars(), ds.data_vars());
        assert_eq!(back.attrs().title, "round trip");
        assert_eq!(back.history().len(), ds.history().len());
        assert!(Schema.is_valid(&back, true));
    }

    #[test]
    fn test_document_layout() {
        let ds = profile().with_bounds(Some(vec![(-0.5, 0.5), (0.5, 1.5), (1.5, 2.5)]));
        let value: serde_json::Value = serde_json::from_str(&to_json_string(&ds).unwrap()).unwrap();
        assert_eq!(value["dims"]["z"], 3);
        assert_eq!(value["coords"]["z"]["units"], "km");
        assert_eq!(value["coords"]["z_bounds"]["values"][0][1], 0.5);
        assert_eq!(value["data_vars"][0]["name"], "p");
        assert_eq!(value["data_vars"][0]["standard_name"], "air_pressure");
        assert_eq!(value["attrs"]["Conventions"], "CF-1.10");
    }

    #[test]
    fn test_file_round_trip_with_bounds() {
        let dir = temp_test_dir();
        let path = dir.path().join("profile.json");
        let ds = profile().with_bounds(Some(vec![(-0.5, 0.5), (0.5, 1.5), (1.5, 2.5)]));
        write_dataset(&ds, &path).unwrap();
        let back = open_dataset(&path).unwrap();
        assert_eq!(back.z_bounds(), ds.z_bounds());
        assert_eq!(back.data_vars(), ds.data_vars());
    }

    #[test]
    fn test_reading_invalid_documents() {
        let ds = profile();
        let mut value: serde_json::Value =
            serde_json::from_str(&to_json_string(&ds).unwrap()).unwrap();
        value["dims"]["z"] = serde_json::json!(4);
        assert!(matches!(
            from_json_str(&value.to_string()),
            Err(ProfileError::Schema(_))
        ));

        value["dims"]["z"] = serde_json::json!(3);
        value["coords"]["z"]["values"] = serde_json::json!([0.0, 2.0, 1.0]);
        assert!(from_json_str(&value.to_string()).is_err());

        assert!(matches!(
            from_json_str("{"),
            Err(ProfileError::Serialization(_))
        ));
        assert!(matches!(
            open_dataset("/nonexistent/profile.json"),
            Err(ProfileError::Io(_))
        ));
    }
}
