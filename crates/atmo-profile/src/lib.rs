//! Atmospheric thermophysical profiles.
//!
//! This crate holds the canonical profile representation and the
//! operations defined on it:
//!
//! - **Schema**: conversion of raw quantities into a [`Dataset`] and
//!   validation of its invariants
//! - **Interpolation**: resampling onto new altitudes with per-variable
//!   kinds, bounds checking and optional column conservation
//! - **Extrapolation** and **regularization** built on interpolation
//! - **Rescaling**: mole fraction scaling to reach target amounts
//! - **Registry**: profile sources created by identifier
//!
//! # Pipeline
//!
//! ```text
//! registry::create(identifier, params)
//!      │
//!      ▼
//! Profile::to_dataset(z)  ──►  Schema::convert
//!      │
//!      ├─► select_molecules
//!      ├─► regularize / interp / extrapolate
//!      ├─► represent_in_cells
//!      └─► rescale_to(target)
//!               │
//!               ▼
//!          io::write_dataset
//! ```
//!
//! # Example
//!
//! ```
//! use atmo_profile::{make, MakeConfig, Params, Schema};
//!
//! let mut config = MakeConfig::default();
//! config.rescale_to.insert("CO2".to_string(), "1e21 cm^-2".to_string());
//!
//! let ds = make("isothermal", None, &Params::new(), &config).unwrap();
//! assert!(Schema.is_valid(&ds, true));
//! ```

pub mod attrs;
pub mod cells;
pub mod config;
pub mod constants;
pub mod derived;
pub mod error;
pub mod extrapolate;
pub mod interp;
pub mod io;
pub mod make;
pub mod merge;
pub mod profiles;
pub mod registry;
pub mod regularize;
pub mod rescale;
pub mod schema;

/// Crate version, recorded in the creation history entry.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export commonly used types at crate root
pub use attrs::{Attributes, History, HistoryEntry};
pub use cells::represent_in_cells;
pub use config::MakeConfig;
pub use error::{ProfileError, Result};
pub use extrapolate::{extrapolate, Direction};
pub use interp::{interp, interp_with, FillPolicy, InterpKind, InterpMethod, InterpOptions};
pub use io::{from_json_str, open_dataset, to_json_string, write_dataset};
pub use make::make;
pub use merge::merge;
pub use profiles::{IsothermalProfile, TabulatedProfile};
pub use registry::{create, identifiers, register, Params, Profile, ProfileFactory};
pub use regularize::{regularize, RegularizeOptions, ZStep};
pub use rescale::{
    drop_molecules, rescale, rescale_to, scaling_factor, scaling_factors, select_molecules,
    AmountKind,
};
pub use schema::{Dataset, Schema, Variable};
