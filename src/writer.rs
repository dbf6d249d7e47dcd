use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde_json::{Map, Number, Value as JsonValue, json};

use crate::{frame::Frame, io_utils, loader::GeoLayer};

/// Writes every column of the frame, one row per record; `NaN` cells are
/// written as empty fields.
pub fn write_frame_csv(frame: &Frame, path: &Path) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path, io_utils::DEFAULT_CSV_DELIMITER)?;
    writer
        .write_record(frame.headers())
        .context("Writing output headers")?;
    let columns = frame.columns();
    for row in 0..frame.row_count() {
        writer
            .write_record(columns.iter().map(|column| column.display(row).into_owned()))
            .with_context(|| format!("Writing output row {}", row + 2))?;
    }
    writer.flush().context("Flushing output writer")?;
    Ok(())
}

fn json_number(value: f64) -> JsonValue {
    Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

/// Writes the source features as a `FeatureCollection`, overwriting the
/// `repaired` properties with the frame's cleaned values.
pub fn write_geojson(layer: &GeoLayer, frame: &Frame, repaired: &[String], path: &Path) -> Result<()> {
    let replacements = repaired
        .iter()
        .filter_map(|name| frame.numeric(name).map(|values| (name.as_str(), values)))
        .collect::<Vec<_>>();

    let features = layer
        .features
        .iter()
        .enumerate()
        .map(|(row, feature)| {
            let mut properties = feature.properties.clone().unwrap_or_else(Map::new);
            for (name, values) in &replacements {
                if let Some(value) = values.get(row) {
                    properties.insert((*name).to_string(), json_number(*value));
                }
            }
            json!({
                "type": "Feature",
                "properties": properties,
                "geometry": feature.geometry,
            })
        })
        .collect::<Vec<_>>();

    let collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &collection)
        .with_context(|| format!("Writing GeoJSON to {path:?}"))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frame::{Column, ColumnRole},
        loader::GeoFeature,
    };

    #[test]
    fn geojson_replaces_repaired_properties() {
        let layer = GeoLayer {
            features: vec![
                GeoFeature {
                    geometry: json!({"type": "Point", "coordinates": [-71.06, 42.36]}),
                    properties: json!({"CBSA_Name": "Boston", "TrAccess_Index": -5})
                        .as_object()
                        .cloned(),
                },
                GeoFeature {
                    geometry: JsonValue::Null,
                    properties: json!({"CBSA_Name": "Boston", "TrAccess_Index": 10})
                        .as_object()
                        .cloned(),
                },
            ],
        };
        let frame = Frame::new(vec![Column::numeric(
            "TrAccess_Index",
            ColumnRole::Measure,
            vec![f64::NAN, 10.0],
        )])
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");
        write_geojson(&layer, &frame, &["TrAccess_Index".to_string()], &path).unwrap();

        let written: JsonValue =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let features = written["features"].as_array().unwrap();
        assert_eq!(written["type"], "FeatureCollection");
        assert!(features[0]["properties"]["TrAccess_Index"].is_null());
        assert_eq!(features[0]["properties"]["CBSA_Name"], "Boston");
        assert_eq!(features[0]["geometry"]["type"], "Point");
        assert_eq!(features[1]["properties"]["TrAccess_Index"], 10.0);
    }
}
