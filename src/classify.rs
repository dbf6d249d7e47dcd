//! Column classification by role and by name pattern.
//!
//! Identifiers come from a fixed list supplied by the active profile; every
//! other column is a measure. Two name patterns, both matched as
//! case-insensitive substrings, flag shape/geometry metadata columns (to be
//! dropped) and percentage columns (to be normalized).

use std::sync::LazyLock;

use regex::Regex;

static SHAPE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)shape|geometry|area|length").expect("valid shape pattern"));
static PERCENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)pct|percent").expect("valid percentage pattern"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnClassification {
    pub identifiers: Vec<String>,
    pub measures: Vec<String>,
    /// Shape/geometry metadata columns. Never includes identifiers.
    pub dropped: Vec<String>,
    /// Measure columns whose names mark them as percentages.
    pub percentages: Vec<String>,
}

impl ColumnClassification {
    pub fn is_identifier(&self, name: &str) -> bool {
        self.identifiers.iter().any(|c| c == name)
    }

    pub fn is_dropped(&self, name: &str) -> bool {
        self.dropped.iter().any(|c| c == name)
    }

    pub fn is_percentage(&self, name: &str) -> bool {
        self.percentages.iter().any(|c| c == name)
    }

    /// Measures that survive when `dropped` is applied.
    pub fn retained_measures(&self) -> impl Iterator<Item = &String> {
        self.measures.iter().filter(|name| !self.is_dropped(name))
    }
}

pub fn is_shape_column(name: &str) -> bool {
    SHAPE_PATTERN.is_match(name)
}

pub fn is_percentage_column(name: &str) -> bool {
    PERCENT_PATTERN.is_match(name)
}

pub fn classify_columns(columns: &[String], identifiers: &[String]) -> ColumnClassification {
    let mut classification = ColumnClassification::default();
    for name in columns {
        if identifiers.contains(name) {
            classification.identifiers.push(name.clone());
            continue;
        }
        classification.measures.push(name.clone());
        if is_shape_column(name) {
            classification.dropped.push(name.clone());
        }
        if is_percentage_column(name) {
            classification.percentages.push(name.clone());
        }
    }
    classification
}
