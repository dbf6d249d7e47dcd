//! Mean imputation and population z-scores.
//!
//! Each selected column is copied, its missing cells filled with the mean of
//! the non-missing cells, and the copy standardized with `ddof = 0`. The
//! result lands in a new `<column>_z` column; the source column keeps its
//! missing values. A column with no valid cells has an undefined mean, so the
//! fill and every score are `NaN`. A zero-variance column scores as all zeros.

use anyhow::Result;
use log::{debug, info};

use crate::frame::{Column, ColumnRole, Frame};

pub const Z_SUFFIX: &str = "_z";

pub fn z_column_name(source: &str) -> String {
    format!("{source}{Z_SUFFIX}")
}

/// Arithmetic mean over non-missing values; `NaN` when there are none.
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Fills missing values in place with the mean of the others and returns
/// the fill value.
pub fn impute_mean(values: &mut [f64]) -> f64 {
    let mean = nan_mean(values);
    for value in values.iter_mut().filter(|v| v.is_nan()) {
        *value = mean;
    }
    mean
}

/// Population mean and standard deviation (`ddof = 0`).
pub fn population_moments(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

pub fn zscore(values: &[f64]) -> Vec<f64> {
    if is_constant(values) {
        return vec![0.0; values.len()];
    }
    let (mean, std_dev) = population_moments(values);
    if is_negligible_spread(mean, std_dev) {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std_dev).collect()
}

/// True when every non-missing value is identical (and at least one exists).
fn is_constant(values: &[f64]) -> bool {
    let mut present = values.iter().filter(|v| !v.is_nan());
    match present.next() {
        Some(first) => present.all(|v| v == first),
        None => false,
    }
}

// A spread at rounding level of the mean is zero variance.
fn is_negligible_spread(mean: f64, std_dev: f64) -> bool {
    std_dev <= f64::EPSILON * mean.abs().max(1.0)
}

/// Imputes then standardizes a copy of `values`.
///
/// The zero-variance case is decided on the non-missing values, before the
/// fill: a mean computed in floating point need not equal the constant it
/// was computed from.
pub fn impute_and_score(values: &[f64]) -> Vec<f64> {
    if is_constant(values) {
        return vec![0.0; values.len()];
    }
    let mut imputed = values.to_vec();
    impute_mean(&mut imputed);
    zscore(&imputed)
}

/// Appends a `<name>_z` column for each named numeric column.
///
/// Names are deduplicated in order; columns that are absent or not numeric
/// are skipped. Returns the derived column names.
pub fn normalize_columns(frame: &mut Frame, columns: &[String]) -> Result<Vec<String>> {
    let mut derived = Vec::new();
    let mut seen = Vec::new();
    for name in columns {
        if seen.contains(name) {
            continue;
        }
        seen.push(name.clone());
        let Some(values) = frame.numeric(name) else {
            debug!("Column '{name}' is absent or not numeric; skipping normalization");
            continue;
        };
        let scores = impute_and_score(values);
        let target = z_column_name(name);
        frame.push_column(Column::numeric(target.clone(), ColumnRole::Derived, scores))?;
        derived.push(target);
    }
    info!("Normalized {} column(s)", derived.len());
    Ok(derived)
}
