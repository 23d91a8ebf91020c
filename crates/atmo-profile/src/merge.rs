//! Combination of several profiles defined on the same altitude grid.

use tracing::info;

use crate::attrs::Attributes;
use crate::error::{ProfileError, Result};
use crate::schema::Dataset;

/// Relative tolerance when comparing altitude grids.
const GRID_TOLERANCE: f64 = 1e-9;

/// Merge `datasets` into one profile.
///
/// Variables present in several datasets are taken from the first one
/// holding them. Provenance attributes become the newline-joined distinct
/// values. The title is `new_title` or the title of the first dataset.
pub fn merge(datasets: &[Dataset], new_title: Option<&str>) -> Result<Dataset> {
    let (first, rest) = datasets
        .split_first()
        .ok_or_else(|| ProfileError::invalid_value("nothing to merge"))?;
    if rest.is_empty() {
        return Ok(first.clone());
    }

    let z_units = first.z().units.symbol().to_string();
    let z = &first.z().values;
    let mut data_vars = first.data_vars().to_vec();

    for ds in rest {
        let other = ds.z_as(&z_units)?;
        if !same_grid(z, &other) {
            return Err(ProfileError::invalid_value(format!(
                "cannot merge profile '{}' with profile '{}': altitude grids differ",
                first.attrs().title,
                ds.attrs().title
            )));
        }
        for var in ds.data_vars() {
            if !data_vars.iter().any(|v| v.name == var.name) {
                data_vars.push(var.clone());
            }
        }
    }

    let attrs = merge_attrs(datasets, new_title);
    let merged = Dataset::from_parts(
        first.z().clone(),
        first.z_bounds().map(<[_]>::to_vec),
        data_vars,
        attrs,
    );
    info!(datasets = datasets.len(), "merged datasets");
    Ok(merged)
}

fn same_grid(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(a, b)| (a - b).abs() <= GRID_TOLERANCE * a.abs().max(b.abs()).max(1.0))
}

/// Distinct values in order of first appearance, joined by newlines.
fn join_distinct<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut distinct: Vec<&str> = Vec::new();
    for value in values {
        if !distinct.contains(&value) {
            distinct.push(value);
        }
    }
    distinct.join("\n")
}

fn join_optional<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Option<String> {
    let present: Vec<&str> = values.flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(join_distinct(present.into_iter()))
    }
}

fn merge_attrs(datasets: &[Dataset], new_title: Option<&str>) -> Attributes {
    let attrs: Vec<&Attributes> = datasets.iter().map(Dataset::attrs).collect();
    let first = attrs[0];

    let mut extra = first.extra.clone();
    for a in &attrs[1..] {
        for (key, value) in &a.extra {
            extra.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    let others: Vec<String> = attrs[1..]
        .iter()
        .map(|a| format!("'{}'", a.title))
        .collect();
    let history = first.history.with(format!(
        "merged profile '{}' with profile(s) {}",
        first.title,
        others.join(", ")
    ));

    Attributes {
        conventions: join_distinct(attrs.iter().map(|a| a.conventions.as_str())),
        title: new_title.map_or_else(|| first.title.clone(), str::to_string),
        institution: join_distinct(attrs.iter().map(|a| a.institution.as_str())),
        source: join_distinct(attrs.iter().map(|a| a.source.as_str())),
        references: join_distinct(attrs.iter().map(|a| a.references.as_str())),
        history,
        url: join_optional(attrs.iter().map(|a| a.url.as_deref())),
        urldate: join_optional(attrs.iter().map(|a| a.urldate.as_deref())),
        extra,
    }
}
