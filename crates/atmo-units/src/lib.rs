//! Physical units and quantities for atmospheric profile data.
//!
//! This crate attaches physical units to plain numeric arrays and checks
//! dimensional compatibility before two quantities are combined or converted.
//!
//! - [`Dimension`]: exponents over the base dimensions (length, mass, time,
//!   temperature, amount of substance)
//! - [`Unit`]: a parsed unit expression (`km`, `m^-3`, `kg/m^2`, `dobson_unit`)
//! - [`Quantity`]: a magnitude array paired with a unit
//! - [`to_quantity`]: converts any [`QuantityLike`] input into a [`Quantity`]
//!
//! # Example
//!
//! ```
//! use atmo_units::{to_quantity, Quantity};
//!
//! let z = to_quantity(vec![0.0, 500.0, 1000.0], Some("m")).unwrap();
//! assert_eq!(z.m_as("km").unwrap(), vec![0.0, 0.5, 1.0]);
//!
//! let ozone: Quantity = "350 dobson_unit".parse().unwrap();
//! assert!((ozone.m_as("m^-2").unwrap()[0] - 9.4045e22).abs() < 1e18);
//! ```

pub mod dimension;
pub mod error;
pub mod quantity;
pub mod unit;

pub use dimension::Dimension;
pub use error::{UnitsError, UnitsResult};
pub use quantity::{to_quantity, Quantity, QuantityLike, TaggedArray};
pub use unit::Unit;
