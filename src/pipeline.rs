//! The `clean` command: load, clean, normalize, aggregate, write.
//!
//! [`clean_frame`] runs the in-memory stages in order so they can be
//! exercised without touching the filesystem; [`execute`] wraps it with the
//! loader and the writers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use crate::{
    aggregate::{self, AggregateTable},
    classify::{ColumnClassification, classify_columns},
    clean::{self, CoercionReport},
    cli::CleanArgs,
    frame::Frame,
    io_utils,
    loader::{self, LoadOptions},
    normalize,
    profile::Profile,
    writer,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    pub classification: ColumnClassification,
    pub dropped: usize,
    pub coercion: CoercionReport,
    pub repaired: usize,
    pub derived: Vec<String>,
}

/// Columns scored by normalization: bounded indexes first, then
/// percentages, in column order.
pub fn normalization_targets(profile: &Profile, classification: &ColumnClassification) -> Vec<String> {
    let mut targets = profile.bounded_indexes.clone();
    for name in &classification.percentages {
        if !targets.contains(name) {
            targets.push(name.clone());
        }
    }
    targets
}

pub fn clean_frame(frame: &mut Frame, profile: &Profile) -> Result<CleanReport> {
    let classification = classify_columns(&frame.headers(), &profile.identifiers);
    let dropped = if profile.drop_shape_columns {
        frame.drop_columns(&classification.dropped)
    } else {
        0
    };
    if dropped > 0 {
        info!(
            "Dropped {dropped} shape/geometry column(s): {}",
            classification.dropped.join(", ")
        );
    }
    let coercion = clean::coerce_measures(frame, &classification);
    let repaired = clean::repair_negative_indexes(frame, &profile.bounded_indexes);
    let targets = normalization_targets(profile, &classification);
    let derived = normalize::normalize_columns(frame, &targets)?;
    Ok(CleanReport {
        classification,
        dropped,
        coercion,
        repaired,
        derived,
    })
}

pub fn aggregate_frame(frame: &Frame, profile: &Profile) -> Result<AggregateTable> {
    aggregate::aggregate(
        frame,
        &profile.group_key,
        &profile.count_column,
        &profile.aggregates,
    )
}

pub fn resolve_profile(args: &CleanArgs) -> Result<Profile> {
    let mut profile = match &args.config {
        Some(path) => Profile::load(path)?,
        None => Profile::builtin(args.profile),
    };
    if let Some(layer) = args.layer.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        profile.layer = layer.to_string();
    }
    Ok(profile)
}

pub fn execute(args: &CleanArgs) -> Result<()> {
    let profile = resolve_profile(args)?;
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Cleaning '{}' with profile '{}' (layer '{}')",
        args.input.display(),
        profile.name,
        profile.layer
    );

    let options = LoadOptions {
        layer: &profile.layer,
        delimiter: args.delimiter,
        encoding,
    };
    let mut dataset = loader::load_dataset(&args.input, &options)
        .with_context(|| format!("Loading dataset from {:?}", args.input))?;

    let report = clean_frame(&mut dataset.frame, &profile)?;
    info!(
        "Coerced {} measure column(s) ({} unparseable value(s)); repaired {} negative index value(s)",
        report.coercion.columns,
        report.coercion.total_failures(),
        report.repaired
    );
    let aggregated = aggregate_frame(&dataset.frame, &profile)?;

    io_utils::ensure_output_dir(&args.output_dir)?;
    let mut written: Vec<PathBuf> = Vec::new();

    let cleaned_path = args.output_dir.join(&profile.outputs.cleaned_csv);
    writer::write_frame_csv(&dataset.frame, &cleaned_path)
        .with_context(|| format!("Writing cleaned table to {cleaned_path:?}"))?;
    written.push(cleaned_path);

    match (&profile.outputs.geojson, &dataset.geo) {
        (Some(name), Some(layer)) => {
            let geo_path = args.output_dir.join(name);
            writer::write_geojson(layer, &dataset.frame, &profile.bounded_indexes, &geo_path)
                .with_context(|| format!("Writing GeoJSON to {geo_path:?}"))?;
            written.push(geo_path);
        }
        (Some(_), None) => info!("Source carries no geometry; skipping GeoJSON output"),
        (None, _) => {}
    }

    let aggregate_path = args.output_dir.join(&profile.outputs.aggregate_csv);
    aggregated
        .write_csv(&aggregate_path)
        .with_context(|| format!("Writing aggregate table to {aggregate_path:?}"))?;
    written.push(aggregate_path);

    info!("Saved files:");
    for path in &written {
        info!(" - {}", path.display());
    }
    Ok(())
}
