use std::collections::BTreeMap;

use log::{debug, warn};

use crate::{
    classify::ColumnClassification,
    frame::{ColumnRole, ColumnValues, Frame, is_missing_text, parse_numeric},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionReport {
    pub columns: usize,
    /// Non-empty cells that failed to parse, keyed by column.
    pub failures: BTreeMap<String, usize>,
}

impl CoercionReport {
    pub fn total_failures(&self) -> usize {
        self.failures.values().sum()
    }
}

/// Converts every measure column to `f64`, marking identifiers as such.
///
/// Unparseable cells become `NaN`; a failed parse never aborts the stage.
pub fn coerce_measures(frame: &mut Frame, classification: &ColumnClassification) -> CoercionReport {
    let mut report = CoercionReport::default();
    let names = frame.headers();
    for name in names {
        let Some(column) = frame.column_mut(&name) else {
            continue;
        };
        if classification.is_identifier(&name) {
            column.role = ColumnRole::Identifier;
            continue;
        }
        if column.role == ColumnRole::Derived {
            continue;
        }
        column.role = ColumnRole::Measure;
        let ColumnValues::Text(raw) = &column.values else {
            continue;
        };
        let mut failures = 0usize;
        let parsed = raw
            .iter()
            .map(|value| {
                let number = parse_numeric(value);
                if number.is_nan() && !is_missing_text(value) {
                    failures += 1;
                }
                number
            })
            .collect::<Vec<_>>();
        column.values = ColumnValues::Numeric(parsed);
        report.columns += 1;
        if failures > 0 {
            report.failures.insert(name, failures);
        }
    }
    for (name, count) in &report.failures {
        warn!("Column '{name}': {count} value(s) could not be parsed as numbers");
    }
    debug!("Coerced {} measure column(s)", report.columns);
    report
}

/// Replaces negative values in the named bounded-index columns with `NaN`.
///
/// Only the listed columns are touched; absent or non-numeric columns are
/// skipped. Returns the number of cells invalidated.
pub fn repair_negative_indexes(frame: &mut Frame, columns: &[String]) -> usize {
    let mut repaired = 0usize;
    for name in columns {
        let Some(values) = frame.column_mut(name).and_then(|c| c.as_numeric_mut()) else {
            debug!("Bounded index column '{name}' not present; skipping repair");
            continue;
        };
        let mut column_repaired = 0usize;
        for value in values.iter_mut().filter(|v| **v < 0.0) {
            *value = f64::NAN;
            column_repaired += 1;
        }
        if column_repaired > 0 {
            warn!("Column '{name}': replaced {column_repaired} negative value(s) with missing");
        }
        repaired += column_repaired;
    }
    repaired
}
