//! ESRI File Geodatabase layers.
//!
//! The SLD archives ship their layers inside a `<name>.gdb` directory.
//! Reading one goes through GDAL's OpenFileGDB driver and is only compiled
//! with the `gdal` cargo feature; without it, finding a geodatabase is
//! reported as a dedicated error instead of a missing layer.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::{io_utils, loader::GeoLayer};

pub const GDB_EXTENSION: &str = "gdb";

pub fn is_geodatabase(path: &Path) -> bool {
    path.is_dir() && io_utils::extension_lowercase(path).as_deref() == Some(GDB_EXTENSION)
}

/// All `.gdb` directories under `root` (including `root` itself), sorted.
pub fn find_geodatabases(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect(root, &mut found)?;
    found.sort();
    Ok(found)
}

fn collect(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    if is_geodatabase(dir) {
        out.push(dir.to_path_buf());
        return Ok(());
    }
    for entry in fs::read_dir(dir).with_context(|| format!("Listing {dir:?}"))? {
        let path = entry?.path();
        if path.is_dir() {
            collect(&path, out)?;
        }
    }
    Ok(())
}

/// Reads `layer` (case-insensitive) from the geodatabase at `path`.
///
/// Returns `Ok(None)` when the geodatabase has no such layer.
#[cfg(feature = "gdal")]
pub fn read_layer(path: &Path, layer: &str) -> Result<Option<GeoLayer>> {
    use gdal::{Dataset, vector::LayerAccess};
    use log::debug;

    use crate::loader::GeoFeature;

    let dataset = Dataset::open(path).with_context(|| format!("Opening geodatabase {path:?}"))?;
    let Some(name) = dataset
        .layers()
        .map(|candidate| candidate.name())
        .find(|name| name.eq_ignore_ascii_case(layer))
    else {
        return Ok(None);
    };
    let mut source = dataset
        .layer_by_name(&name)
        .with_context(|| format!("Opening layer '{name}' in {path:?}"))?;
    debug!("Reading layer '{name}' from {path:?}");

    let mut features = Vec::new();
    for feature in source.features() {
        let geometry = match feature.geometry() {
            Some(geometry) => {
                let raw = geometry
                    .json()
                    .with_context(|| format!("Encoding geometry of layer '{name}'"))?;
                serde_json::from_str(&raw).context("Parsing GDAL geometry JSON")?
            }
            None => serde_json::Value::Null,
        };
        let properties = feature
            .fields()
            .map(|(field, value)| (field, field_to_json(value)))
            .collect();
        features.push(GeoFeature {
            geometry,
            properties: Some(properties),
        });
    }
    Ok(Some(GeoLayer { features }))
}

#[cfg(not(feature = "gdal"))]
pub fn read_layer(path: &Path, _layer: &str) -> Result<Option<GeoLayer>> {
    Err(crate::error::PipelineError::GeodatabaseUnsupported(path.to_path_buf()).into())
}

#[cfg(feature = "gdal")]
fn field_to_json(value: Option<gdal::vector::FieldValue>) -> serde_json::Value {
    use gdal::vector::FieldValue;
    use serde_json::{Number, Value};

    match value {
        None => Value::Null,
        Some(FieldValue::IntegerValue(v)) => Value::from(v),
        Some(FieldValue::Integer64Value(v)) => Value::from(v),
        Some(FieldValue::RealValue(v)) => Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null),
        Some(FieldValue::StringValue(v)) => Value::String(v),
        Some(other) => other.into_string().map(Value::String).unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nested_geodatabase_directories() {
        let dir = tempfile::tempdir().unwrap();
        let gdb = dir.path().join("SLD").join("SLD_Trans45.GDB");
        fs::create_dir_all(&gdb).unwrap();
        fs::write(gdb.join("a00000001.gdbtable"), b"").unwrap();
        fs::write(dir.path().join("readme.gdb"), b"not a directory").unwrap();

        let found = find_geodatabases(dir.path()).unwrap();
        assert_eq!(found, vec![gdb.clone()]);
        assert!(is_geodatabase(&gdb));
        assert!(!is_geodatabase(&dir.path().join("readme.gdb")));
    }

    #[cfg(not(feature = "gdal"))]
    #[test]
    fn reading_without_gdal_names_the_feature() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_layer(dir.path(), "CBG_Trans45").unwrap_err();
        assert!(err.to_string().contains("--features gdal"));
    }

    #[cfg(feature = "gdal")]
    #[test]
    fn field_values_map_to_json() {
        use gdal::vector::FieldValue;
        use serde_json::json;

        assert_eq!(field_to_json(None), json!(null));
        assert_eq!(field_to_json(Some(FieldValue::IntegerValue(25))), json!(25));
        assert_eq!(field_to_json(Some(FieldValue::RealValue(0.5))), json!(0.5));
        assert_eq!(field_to_json(Some(FieldValue::RealValue(f64::NAN))), json!(null));
        assert_eq!(
            field_to_json(Some(FieldValue::StringValue("Boston".to_string()))),
            json!("Boston")
        );
    }
}
