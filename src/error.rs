use std::path::PathBuf;

use thiserror::Error;

/// Conditions that abort a run outright.
///
/// Per-value parse failures and schema drift are never reported through this
/// type; they degrade to missing values or fallback columns instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input file not found: {0:?}")]
    MissingInput(PathBuf),
    #[error("Layer '{layer}' not found in archive {archive:?} (expected {layer}.csv, {layer}.geojson or {layer}.json)")]
    LayerNotFound { layer: String, archive: PathBuf },
    #[error("Unsupported input {0:?}; expected a .zip archive, a .gdb directory, a CSV/TSV file, or a GeoJSON file")]
    UnsupportedInput(PathBuf),
    #[error("{0:?} is an ESRI File Geodatabase; rebuild with `--features gdal` to read it")]
    GeodatabaseUnsupported(PathBuf),
    #[error("Group key column '{0}' is not present in the dataset")]
    MissingGroupKey(String),
}
