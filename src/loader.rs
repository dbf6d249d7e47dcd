//! Dataset loading.
//!
//! Inputs are resolved by extension:
//!
//! - `.zip`: unpacked into a scoped temporary directory, then searched
//!   recursively for the profile's layer saved as CSV or GeoJSON, or failing
//!   that for a `.gdb` geodatabase holding it. The directory is removed when
//!   the load returns, whether it succeeded or not.
//! - `.gdb` directory: the layer is read from the geodatabase.
//! - `.csv` / `.tsv` / `.txt`: read directly.
//! - `.geojson` / `.json`: a GeoJSON `FeatureCollection`; feature properties
//!   become columns and the features are kept for the geospatial writer.

use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{debug, info};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use zip::ZipArchive;

use crate::{
    error::PipelineError,
    frame::Frame,
    geodatabase,
    io_utils,
};

const CSV_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];
const GEOJSON_EXTENSIONS: &[&str] = &["geojson", "json"];

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions<'a> {
    pub layer: &'a str,
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoFeature {
    #[serde(default)]
    pub geometry: JsonValue,
    #[serde(default)]
    pub properties: Option<Map<String, JsonValue>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<GeoFeature>,
}

/// Features of a geospatial source, in row order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoLayer {
    pub features: Vec<GeoFeature>,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: PathBuf,
    pub frame: Frame,
    pub geo: Option<GeoLayer>,
}

pub fn load_dataset(path: &Path, options: &LoadOptions<'_>) -> Result<Dataset> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()).into());
    }
    if geodatabase::is_geodatabase(path) {
        return load_geodatabase(path, options)?.ok_or_else(|| {
            PipelineError::LayerNotFound {
                layer: options.layer.to_string(),
                archive: path.to_path_buf(),
            }
            .into()
        });
    }
    match io_utils::extension_lowercase(path).as_deref() {
        Some("zip") => load_archive(path, options),
        Some(ext) if CSV_EXTENSIONS.contains(&ext) => load_file(path, options),
        Some(ext) if GEOJSON_EXTENSIONS.contains(&ext) => load_file(path, options),
        _ => Err(PipelineError::UnsupportedInput(path.to_path_buf()).into()),
    }
}

fn load_file(path: &Path, options: &LoadOptions<'_>) -> Result<Dataset> {
    let is_geojson = io_utils::extension_lowercase(path)
        .is_some_and(|ext| GEOJSON_EXTENSIONS.contains(&ext.as_str()));
    let dataset = if is_geojson {
        let layer = read_geojson(path)?;
        let frame = frame_from_features(&layer.features)
            .with_context(|| format!("Building table from {path:?}"))?;
        Dataset {
            source: path.to_path_buf(),
            frame,
            geo: Some(layer),
        }
    } else {
        let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
        debug!(
            "Reading {path:?} with delimiter '{}'",
            crate::printable_delimiter(delimiter)
        );
        Dataset {
            source: path.to_path_buf(),
            frame: read_csv(path, delimiter, options.encoding)?,
            geo: None,
        }
    };
    info!(
        "Loaded {} row(s) x {} column(s) from {:?}",
        dataset.frame.row_count(),
        dataset.frame.columns().len(),
        path
    );
    Ok(dataset)
}

fn load_archive(path: &Path, options: &LoadOptions<'_>) -> Result<Dataset> {
    let scratch = tempfile::Builder::new()
        .prefix("transit-eda-")
        .tempdir()
        .context("Creating extraction directory")?;
    let file = File::open(path).with_context(|| format!("Opening archive {path:?}"))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).with_context(|| format!("Reading archive {path:?}"))?;
    debug!("Extracting {} entr(ies) from {:?}", archive.len(), path);
    archive
        .extract(scratch.path())
        .with_context(|| format!("Extracting archive {path:?}"))?;

    let mut dataset = match find_layer(scratch.path(), options.layer)? {
        Some(layer_path) => {
            debug!("Found layer '{}' at {:?}", options.layer, layer_path);
            load_file(&layer_path, options)?
        }
        None => {
            let mut found = None;
            for gdb in geodatabase::find_geodatabases(scratch.path())? {
                if let Some(dataset) = load_geodatabase(&gdb, options)? {
                    found = Some(dataset);
                    break;
                }
            }
            found.ok_or_else(|| PipelineError::LayerNotFound {
                layer: options.layer.to_string(),
                archive: path.to_path_buf(),
            })?
        }
    };
    dataset.source = path.to_path_buf();
    Ok(dataset)
}

/// Reads the layer from a geodatabase directory; `None` when it has no such
/// layer.
fn load_geodatabase(path: &Path, options: &LoadOptions<'_>) -> Result<Option<Dataset>> {
    let Some(layer) = geodatabase::read_layer(path, options.layer)? else {
        debug!("Layer '{}' not present in {:?}", options.layer, path);
        return Ok(None);
    };
    let frame = frame_from_features(&layer.features)
        .with_context(|| format!("Building table from {path:?}"))?;
    info!(
        "Loaded {} row(s) x {} column(s) from layer '{}' of {:?}",
        frame.row_count(),
        frame.columns().len(),
        options.layer,
        path
    );
    Ok(Some(Dataset {
        source: path.to_path_buf(),
        frame,
        geo: Some(layer),
    }))
}

/// Searches `root` recursively for `<layer>.<ext>` with a supported
/// extension; the stem comparison ignores case. CSV wins over GeoJSON when
/// both exist.
pub fn find_layer(root: &Path, layer: &str) -> Result<Option<PathBuf>> {
    let mut candidates = Vec::new();
    collect_files(root, &mut candidates)?;
    candidates.sort();
    let matches_layer = |path: &PathBuf| {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| stem.eq_ignore_ascii_case(layer))
    };
    for extensions in [CSV_EXTENSIONS, GEOJSON_EXTENSIONS] {
        if let Some(found) = candidates.iter().find(|path| {
            matches_layer(path)
                && io_utils::extension_lowercase(path)
                    .is_some_and(|ext| extensions.contains(&ext.as_str()))
        }) {
            return Ok(Some(found.clone()));
        }
    }
    Ok(None)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Listing {dir:?}"))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

pub fn read_csv(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Frame> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)
        .with_context(|| format!("Reading headers from {path:?}"))?;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        rows.push(decoded);
    }
    Frame::from_rows(&headers, rows).with_context(|| format!("Building table from {path:?}"))
}

pub fn read_geojson(path: &Path) -> Result<GeoLayer> {
    let file = File::open(path).with_context(|| format!("Opening GeoJSON {path:?}"))?;
    let collection: FeatureCollection = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing GeoJSON {path:?}"))?;
    Ok(GeoLayer {
        features: collection.features,
    })
}

/// Flattens feature properties into text columns. The column set is the
/// union of property names in first-seen order; absent properties are empty.
pub fn frame_from_features(features: &[GeoFeature]) -> Result<Frame> {
    let mut headers: Vec<String> = Vec::new();
    for feature in features {
        for key in feature.properties.iter().flat_map(|props| props.keys()) {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    let rows = features
        .iter()
        .map(|feature| {
            headers
                .iter()
                .map(|key| {
                    feature
                        .properties
                        .as_ref()
                        .and_then(|props| props.get(key))
                        .map(json_to_text)
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();
    Frame::from_rows(&headers, rows)
}

fn json_to_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
