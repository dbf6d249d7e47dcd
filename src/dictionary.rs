//! Descriptions of well-known Smart Location Database columns, and the
//! `columns` command that reports them alongside each column's role.

use anyhow::{Context, Result};
use log::info;

use crate::{
    classify::{ColumnClassification, classify_columns},
    cli::ColumnsArgs,
    io_utils,
    loader::{self, LoadOptions},
    profile::Profile,
    report,
};

pub const KNOWN_COLUMNS: &[(&str, &str)] = &[
    (
        "CBSA_Name",
        "Name of the core based statistical area (or metropolitan region) in which block group resides.",
    ),
    ("CBSA", "Core based statistical area code"),
    ("GEOID10", "Census block group 12-digit FIPS code (2010)"),
    ("CBG_ID", "Census block group identifier"),
    ("STATEFP", "State FIPS code"),
    (
        "TrAccess_Index",
        "An index of relative accessibility compared to other block groups within the same metro region, as measured by travel time to working-age population via transit.",
    ),
    (
        "Pct_Pop_byTr_av",
        "Percentage of working-age population reachable within a 45-minute transit and walking commute",
    ),
    (
        "Pct_Jobs_byTr_av",
        "Percentage of jobs reachable within a 45-minute transit and walking commute",
    ),
    (
        "pct_LoWgWrks_byTr",
        "Percentage of low-wage workers reachable within a 45-minute transit and walking commute",
    ),
    (
        "pct_MeWgWrks_byTr",
        "Percentage of medium-wage workers reachable within a 45-minute transit and walking commute",
    ),
    ("CBSA_POP", "Population size"),
    ("D1B", "Population Density (People/Acre)"),
    ("NatWalkInd", "Walkability Index Score (0-20)"),
    ("Pct_AO0", "Percent of zero-car households"),
];

pub fn describe(name: &str) -> Option<&'static str> {
    KNOWN_COLUMNS
        .iter()
        .find(|(column, _)| *column == name)
        .map(|(_, description)| *description)
}

fn role_label(classification: &ColumnClassification, name: &str) -> &'static str {
    if classification.is_identifier(name) {
        "identifier"
    } else if classification.is_dropped(name) {
        "shape"
    } else {
        "measure"
    }
}

/// One row per column: name, role, percentage flag, known description.
pub fn column_rows(classification: &ColumnClassification, columns: &[String]) -> Vec<Vec<String>> {
    columns
        .iter()
        .map(|name| {
            vec![
                name.clone(),
                role_label(classification, name).to_string(),
                if classification.is_percentage(name) { "yes" } else { "" }.to_string(),
                describe(name).unwrap_or_default().to_string(),
            ]
        })
        .collect()
}

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let Some(input) = &args.input else {
        let headers = vec!["column".to_string(), "description".to_string()];
        let rows = KNOWN_COLUMNS
            .iter()
            .map(|(name, description)| vec![name.to_string(), description.to_string()])
            .collect::<Vec<_>>();
        report::print_table(&headers, &rows);
        return Ok(());
    };

    let profile = match &args.config {
        Some(path) => Profile::load(path)?,
        None => Profile::builtin(args.profile),
    };
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let options = LoadOptions {
        layer: &profile.layer,
        delimiter: args.delimiter,
        encoding,
    };
    let dataset = loader::load_dataset(input, &options)
        .with_context(|| format!("Loading dataset from {input:?}"))?;
    let columns = dataset.frame.headers();
    let classification = classify_columns(&columns, &profile.identifiers);
    info!(
        "{} column(s): {} identifier(s), {} measure(s), {} shape, {} percentage",
        columns.len(),
        classification.identifiers.len(),
        classification.measures.len(),
        classification.dropped.len(),
        classification.percentages.len()
    );

    let headers = ["column", "role", "percentage", "description"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    report::print_table(&headers, &column_rows(&classification, &columns));
    Ok(())
}
