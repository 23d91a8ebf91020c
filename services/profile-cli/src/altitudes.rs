//! Altitude grid files.
//!
//! One altitude per line; `#` starts a comment, blank lines are skipped.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use atmo_units::Quantity;

/// Parse altitudes from text, in `units`.
pub fn parse_altitudes(text: &str, units: &str) -> Result<Quantity> {
    let mut values = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }
        let value: f64 = content
            .parse()
            .with_context(|| format!("line {}: invalid altitude '{}'", i + 1, content))?;
        values.push(value);
    }
    if values.is_empty() {
        bail!("altitude file contains no values");
    }
    Ok(Quantity::with_units(values, units)?)
}

/// Read altitudes from a file, in `units`.
pub fn read_altitudes(path: &Path, units: &str) -> Result<Quantity> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read altitude file '{}'", path.display()))?;
    parse_altitudes(&text, units)
}
