//! In-memory record table.
//!
//! A [`Frame`] stores a dataset column by column. Columns arrive from the
//! loader as raw text and are converted in place by the cleaning stages:
//! identifiers stay text, measures become `f64` with `NaN` as the
//! missing-value marker, and normalization appends derived columns.

use std::borrow::Cow;

use anyhow::{Result, bail, ensure};

const NULL_TOKENS: &[&str] = &["na", "n/a", "nan", "null", "none", "<na>"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// Loaded but not yet classified.
    Raw,
    Identifier,
    Measure,
    Derived,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Text(Vec<String>),
    Numeric(Vec<f64>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Text(values) => values.len(),
            ColumnValues::Numeric(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub role: ColumnRole,
    pub values: ColumnValues,
}

impl Column {
    pub fn text(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            role: ColumnRole::Raw,
            values: ColumnValues::Text(values),
        }
    }

    pub fn numeric(name: impl Into<String>, role: ColumnRole, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            role,
            values: ColumnValues::Numeric(values),
        }
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match &self.values {
            ColumnValues::Numeric(values) => Some(values),
            ColumnValues::Text(_) => None,
        }
    }

    pub fn as_numeric_mut(&mut self) -> Option<&mut Vec<f64>> {
        match &mut self.values {
            ColumnValues::Numeric(values) => Some(values),
            ColumnValues::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&[String]> {
        match &self.values {
            ColumnValues::Text(values) => Some(values),
            ColumnValues::Numeric(_) => None,
        }
    }

    /// Numeric view of the column; text cells are parsed on the fly.
    pub fn numeric_view(&self) -> Cow<'_, [f64]> {
        match &self.values {
            ColumnValues::Numeric(values) => Cow::Borrowed(values),
            ColumnValues::Text(values) => {
                Cow::Owned(values.iter().map(|v| parse_numeric(v)).collect())
            }
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match &self.values {
            ColumnValues::Numeric(values) => values.get(row).is_none_or(|v| v.is_nan()),
            ColumnValues::Text(values) => values.get(row).is_none_or(|v| is_missing_text(v)),
        }
    }

    pub fn display(&self, row: usize) -> Cow<'_, str> {
        match &self.values {
            ColumnValues::Text(values) => values
                .get(row)
                .map(|v| Cow::Borrowed(v.as_str()))
                .unwrap_or(Cow::Borrowed("")),
            ColumnValues::Numeric(values) => {
                Cow::Owned(values.get(row).map(|v| format_cell(*v)).unwrap_or_default())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
    rows: usize,
}

impl Frame {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        for column in &columns {
            ensure!(
                column.values.len() == rows,
                "Column '{}' has {} value(s), expected {rows}",
                column.name,
                column.values.len()
            );
        }
        let mut frame = Frame {
            columns: Vec::with_capacity(columns.len()),
            rows,
        };
        for column in columns {
            frame.push_column(column)?;
        }
        Ok(frame)
    }

    /// Builds a text-only frame from a header and row-major records.
    pub fn from_rows(headers: &[String], rows: Vec<Vec<String>>) -> Result<Self> {
        let mut columns = headers
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect::<Vec<Vec<String>>>();
        for (row_idx, row) in rows.into_iter().enumerate() {
            ensure!(
                row.len() == headers.len(),
                "Row {} has {} field(s), expected {}",
                row_idx + 1,
                row.len(),
                headers.len()
            );
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        Frame::new(
            headers
                .iter()
                .zip(columns)
                .map(|(name, values)| Column::text(name.clone(), values))
                .collect(),
        )
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        self.column(name).and_then(Column::as_numeric)
    }

    pub fn text(&self, name: &str) -> Option<&[String]> {
        self.column(name).and_then(Column::as_text)
    }

    /// Appends a column, replacing any existing column with the same name.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.columns.is_empty() && self.rows == 0 {
            self.rows = column.values.len();
        }
        if column.values.len() != self.rows {
            bail!(
                "Column '{}' has {} value(s), expected {}",
                column.name,
                column.values.len(),
                self.rows
            );
        }
        match self.column_index(&column.name) {
            Some(idx) => self.columns[idx] = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Removes the named columns, returning how many were present.
    pub fn drop_columns(&mut self, names: &[String]) -> usize {
        let before = self.columns.len();
        self.columns.retain(|c| !names.contains(&c.name));
        before - self.columns.len()
    }
}

pub fn is_missing_text(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || NULL_TOKENS
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Parses a cell as `f64`, yielding `NaN` when the text is not a number.
pub fn parse_numeric(value: &str) -> f64 {
    value.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Renders a numeric cell for CSV output; `NaN` becomes an empty field.
pub fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}
