//! Group aggregation by metro area, plus top-N ranking of the result.

use std::{cmp::Ordering, collections::BTreeMap, path::Path};

use anyhow::{Context, Result, anyhow};
use itertools::Itertools;
use log::{debug, info, warn};

use crate::{
    error::PipelineError,
    frame::{Frame, format_cell, is_missing_text, parse_numeric},
    io_utils,
    normalize::nan_mean,
    profile::{AggregateKind, AggregateSpec, ColumnChoice},
};

pub const COUNT_COLUMN: &str = "metro_count";
pub const STATE_CODE_AMBIGUOUS: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateCell {
    Float(f64),
    Integer(i64),
}

impl AggregateCell {
    pub fn as_f64(&self) -> f64 {
        match self {
            AggregateCell::Float(value) => *value,
            AggregateCell::Integer(value) => *value as f64,
        }
    }

    pub fn render(&self) -> String {
        match self {
            AggregateCell::Float(value) => format_cell(*value),
            AggregateCell::Integer(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub key: String,
    pub count: usize,
    pub values: Vec<AggregateCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    pub key_column: String,
    pub columns: Vec<String>,
    pub rows: Vec<AggregateRow>,
}

/// An aggregate whose source column has been resolved against the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAggregate {
    pub name: String,
    pub source: String,
    pub kind: AggregateKind,
}

/// Resolves each declared aggregate to a concrete column.
///
/// Aggregates with neither column present are skipped with a warning.
pub fn resolve_aggregates(frame: &Frame, specs: &[AggregateSpec]) -> Vec<ResolvedAggregate> {
    specs
        .iter()
        .filter_map(|spec| match spec.source.resolve(|name| frame.has_column(name)) {
            Some(source) => {
                if source != spec.source.primary {
                    info!(
                        "Aggregate '{}' falls back to column '{source}' ('{}' not present)",
                        spec.name, spec.source.primary
                    );
                }
                Some(ResolvedAggregate {
                    name: spec.name.clone(),
                    source: source.to_string(),
                    kind: spec.kind,
                })
            }
            None => {
                warn!(
                    "Skipping aggregate '{}': no column named {}",
                    spec.name,
                    describe_choice(&spec.source)
                );
                None
            }
        })
        .collect()
}

fn describe_choice(choice: &ColumnChoice) -> String {
    match &choice.fallback {
        Some(fallback) => format!("'{}' or '{fallback}'", choice.primary),
        None => format!("'{}'", choice.primary),
    }
}

/// Collapses a group's mean state code to an integer.
///
/// Whole numbers are kept; a fractional or missing mean means the group
/// spans several states and maps to [`STATE_CODE_AMBIGUOUS`].
pub fn repair_state_code(value: f64) -> i64 {
    if value.is_finite() && value.fract() == 0.0 {
        value as i64
    } else {
        STATE_CODE_AMBIGUOUS
    }
}

/// Groups rows by `group_key` and computes the count and declared means.
///
/// Rows with a missing key are excluded. Groups come out sorted by key.
///
/// `metro_count` is the number of non-missing counter values in the group.
/// It equals the group's row count only when the counter column (a block
/// group id) has no missing values; with no counter column at all, rows are
/// counted directly.
pub fn aggregate(
    frame: &Frame,
    group_key: &str,
    count_column: &ColumnChoice,
    specs: &[AggregateSpec],
) -> Result<AggregateTable> {
    let keys = frame
        .column(group_key)
        .ok_or_else(|| PipelineError::MissingGroupKey(group_key.to_string()))?;

    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut excluded = 0usize;
    for row in 0..frame.row_count() {
        if keys.is_missing(row) {
            excluded += 1;
            continue;
        }
        let key = keys.display(row).into_owned();
        groups.entry(key).or_default().push(row);
    }
    if excluded > 0 {
        debug!("Excluded {excluded} row(s) with a missing '{group_key}'");
    }

    let counter = count_column
        .resolve(|name| frame.has_column(name))
        .and_then(|name| frame.column(name));
    if counter.is_none() {
        warn!(
            "No counter column {} present; counting rows instead",
            describe_choice(count_column)
        );
    }

    let resolved = resolve_aggregates(frame, specs);
    let sources = resolved
        .iter()
        .map(|aggregate| {
            frame
                .column(&aggregate.source)
                .map(|column| column.numeric_view())
                .ok_or_else(|| anyhow!("Column '{}' disappeared during aggregation", aggregate.source))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::with_capacity(groups.len());
    for (key, members) in groups {
        let count = match counter {
            Some(column) => members.iter().filter(|row| !column.is_missing(**row)).count(),
            None => members.len(),
        };
        let values = resolved
            .iter()
            .zip(&sources)
            .map(|(aggregate, source)| {
                let group_values = members.iter().map(|row| source[*row]).collect::<Vec<_>>();
                let mean = nan_mean(&group_values);
                match aggregate.kind {
                    AggregateKind::Mean => AggregateCell::Float(mean),
                    AggregateKind::StateCode => AggregateCell::Integer(repair_state_code(mean)),
                }
            })
            .collect();
        rows.push(AggregateRow { key, count, values });
    }

    info!(
        "Aggregated {} row(s) into {} group(s) by '{group_key}'",
        frame.row_count() - excluded,
        rows.len()
    );
    Ok(AggregateTable {
        key_column: group_key.to_string(),
        columns: resolved.into_iter().map(|aggregate| aggregate.name).collect(),
        rows,
    })
}

impl AggregateTable {
    pub fn headers(&self) -> Vec<String> {
        let mut headers = Vec::with_capacity(self.columns.len() + 2);
        headers.push(self.key_column.clone());
        headers.push(COUNT_COLUMN.to_string());
        headers.extend(self.columns.iter().cloned());
        headers
    }

    pub fn row(&self, key: &str) -> Option<&AggregateRow> {
        self.rows.iter().find(|row| row.key == key)
    }

    /// Looks up a metric by name; `metro_count` is addressable too.
    pub fn metric(&self, row: &AggregateRow, name: &str) -> Option<f64> {
        if name == COUNT_COLUMN {
            return Some(row.count as f64);
        }
        let idx = self.columns.iter().position(|c| c == name)?;
        row.values.get(idx).map(AggregateCell::as_f64)
    }

    pub fn render_row(&self, row: &AggregateRow) -> Vec<String> {
        let mut cells = Vec::with_capacity(row.values.len() + 2);
        cells.push(row.key.clone());
        cells.push(row.count.to_string());
        cells.extend(row.values.iter().map(AggregateCell::render));
        cells
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = io_utils::open_csv_writer(path, io_utils::DEFAULT_CSV_DELIMITER)?;
        writer
            .write_record(self.headers())
            .context("Writing aggregate headers")?;
        for row in &self.rows {
            writer
                .write_record(self.render_row(row))
                .with_context(|| format!("Writing aggregate row for '{}'", row.key))?;
        }
        writer.flush().context("Flushing aggregate writer")?;
        Ok(())
    }

    /// Reads an aggregate CSV back: key first, `metro_count` second, and the
    /// remaining columns as numbers.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let delimiter = io_utils::resolve_input_delimiter(path, None);
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let headers = reader
            .headers()
            .with_context(|| format!("Reading headers from {path:?}"))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let Some((key_column, rest)) = headers.split_first() else {
            return Err(anyhow!("Aggregate file {path:?} has no columns"));
        };
        let count_idx = rest.iter().position(|h| h == COUNT_COLUMN);
        let columns = rest
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != count_idx)
            .map(|(_, name)| name.clone())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
            let key = record.get(0).unwrap_or_default().to_string();
            if is_missing_text(&key) {
                continue;
            }
            let fields = record.iter().skip(1).collect::<Vec<_>>();
            let count = match count_idx {
                Some(idx) => fields
                    .get(idx)
                    .and_then(|raw| raw.trim().parse::<f64>().ok())
                    .map(|value| value as usize)
                    .unwrap_or(0),
                None => 0,
            };
            let values = fields
                .iter()
                .enumerate()
                .filter(|(idx, _)| Some(*idx) != count_idx)
                .map(|(_, raw)| AggregateCell::Float(parse_numeric(raw)))
                .collect();
            rows.push(AggregateRow { key, count, values });
        }
        Ok(AggregateTable {
            key_column: key_column.clone(),
            columns,
            rows,
        })
    }

    fn ensure_metric(&self, name: &str) -> Result<()> {
        if name == COUNT_COLUMN || self.columns.iter().any(|c| c == name) {
            Ok(())
        } else {
            Err(anyhow!(
                "Metric '{name}' not found; available: {}",
                self.headers().iter().skip(1).join(", ")
            ))
        }
    }

    /// The `n` groups with the largest `metric`, missing values last.
    pub fn top_by(&self, metric: &str, n: usize) -> Result<Vec<&AggregateRow>> {
        self.ensure_metric(metric)?;
        let ranked = self
            .rows
            .iter()
            .map(|row| (row, self.metric(row, metric).unwrap_or(f64::NAN)))
            .sorted_by(|(_, a), (_, b)| descending_nan_last(*a, *b))
            .take(n)
            .map(|(row, _)| row)
            .collect();
        Ok(ranked)
    }

    /// The `n` groups with the largest `|left - right|`.
    ///
    /// Groups where either metric is missing or not positive are left out.
    pub fn top_by_disparity(
        &self,
        left: &str,
        right: &str,
        n: usize,
    ) -> Result<Vec<(&AggregateRow, f64)>> {
        self.ensure_metric(left)?;
        self.ensure_metric(right)?;
        let ranked = self
            .rows
            .iter()
            .filter_map(|row| {
                let a = self.metric(row, left)?;
                let b = self.metric(row, right)?;
                (a > 0.0 && b > 0.0).then(|| (row, (a - b).abs()))
            })
            .sorted_by(|(_, a), (_, b)| descending_nan_last(*a, *b))
            .take(n)
            .collect();
        Ok(ranked)
    }
}

fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}
