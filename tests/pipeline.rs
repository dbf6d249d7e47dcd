mod common;

use std::fs;

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;

use common::{TestWorkspace, fixture_path, read_csv};

const BOSTON: &str = "Boston-Cambridge-Newton, MA-NH";
const PROVIDENCE: &str = "Providence-Warwick, RI-MA";

fn clean(input: &std::path::Path, output: &std::path::Path) -> assert_cmd::assert::Assert {
    Command::cargo_bin("transit-eda")
        .expect("binary exists")
        .args([
            "clean",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
}

fn close(actual: &str, expected: f64) -> bool {
    actual
        .parse::<f64>()
        .map(|value| (value - expected).abs() < 1e-9)
        .unwrap_or(false)
}

#[test]
fn clean_csv_writes_cleaned_and_aggregate_tables() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("outputs");
    clean(&fixture_path("cbg_trans45_sample.csv"), &output).success();

    let (headers, rows) = read_csv(&output.join("cleaned_transit_data.csv"));
    assert!(!headers.iter().any(|h| h.starts_with("Shape_")));
    assert_eq!(
        &headers[headers.len() - 5..],
        &[
            "TrAccess_Index_z",
            "Pct_Jobs_byTr_av_z",
            "Pct_Pop_byTr_av_z",
            "pct_LoWgWrks_byTr_z",
            "pct_MeWgWrks_byTr_z",
        ]
    );
    assert_eq!(rows.len(), 5);
    let access = headers.iter().position(|h| h == "TrAccess_Index").unwrap();
    assert_eq!(rows[1][access], "", "negative index must be blanked");
    let geoid = headers.iter().position(|h| h == "GEOID10").unwrap();
    assert_eq!(rows[0][geoid], "250250001001");
    let access_z = headers.iter().position(|h| h == "TrAccess_Index_z").unwrap();
    assert!(rows.iter().all(|row| !row[access_z].is_empty()));

    // No geometry in a CSV source, so no GeoJSON output.
    assert!(!output.join("cleaned_transit_data.geojson").exists());

    let (headers, rows) = read_csv(&output.join("metro_aggregated.csv"));
    assert_eq!(
        headers,
        vec![
            "CBSA_Name",
            "metro_count",
            "avg_access",
            "avg_pop",
            "avg_jobs",
            "avg_LoWgWrks_byTr",
            "avg_MeWgWrks_byTr",
            "state_fips",
        ]
    );
    assert_eq!(rows.len(), 2, "row without a metro name is excluded");
    assert_eq!(rows[0][0], BOSTON);
    assert_eq!(rows[0][1], "3");
    assert!(close(&rows[0][2], 0.6));
    assert!(close(&rows[0][4], 0.26));
    assert_eq!(rows[0][7], "0", "mixed states collapse to 0");
    assert_eq!(rows[1][0], PROVIDENCE);
    assert_eq!(rows[1][1], "1");
    assert_eq!(rows[1][7], "44");
}

#[test]
fn clean_reads_layer_from_nested_zip() {
    let workspace = TestWorkspace::new();
    let csv = fs::read_to_string(fixture_path("cbg_trans45_sample.csv")).unwrap();
    let archive = workspace.write_zip(
        "SmartLocationDatabase.zip",
        &[
            ("README.txt", "Smart Location Database"),
            ("SLD/cbg_trans45.csv", &csv),
        ],
    );
    let output = workspace.path().join("out");
    clean(&archive, &output).success();

    let (_, rows) = read_csv(&output.join("metro_aggregated.csv"));
    assert_eq!(rows.len(), 2);
}

#[test]
fn clean_geojson_archive_writes_repaired_features() {
    let workspace = TestWorkspace::new();
    let geojson = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-71.06, 42.36]},
     "properties": {"CBSA_Name": "Boston", "GEOID10": "1", "STATEFP": 25, "TrAccess_Index": -1, "Shape_Area": 10}},
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-71.1, 42.4]},
     "properties": {"CBSA_Name": "Boston", "GEOID10": "2", "STATEFP": 25, "TrAccess_Index": 0.5, "Shape_Area": 12}}
  ]
}"#;
    let archive = workspace.write_zip("trans.zip", &[("CBG_Trans45.geojson", geojson)]);
    let output = workspace.path().join("out");
    clean(&archive, &output).success();

    let written = fs::read_to_string(output.join("cleaned_transit_data.geojson")).unwrap();
    let parsed: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed["type"], "FeatureCollection");
    let features = parsed["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert!(features[0]["properties"]["TrAccess_Index"].is_null());
    assert_eq!(features[1]["properties"]["TrAccess_Index"], 0.5);
    assert_eq!(features[0]["properties"]["Shape_Area"], 10);
    assert_eq!(features[0]["geometry"]["type"], "Point");

    let (_, rows) = read_csv(&output.join("metro_aggregated.csv"));
    assert_eq!(rows[0][0], "Boston");
    assert_eq!(rows[0][1], "2");
    assert_eq!(rows[0][2], "0.5");
    assert_eq!(rows[0][3], "25");
}

#[test]
fn walkability_profile_keeps_shape_columns() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "smartlocation.csv",
        "CBSA_Name,GEOID10,D1B,NatWalkInd,Pct_AO0,Shape_Area\n\
         Akron,1,2.0,10.5,0.1,5\n\
         Akron,2,4.0,-99999,0.3,6\n",
    );
    let output = workspace.path().join("out");
    Command::cargo_bin("transit-eda")
        .expect("binary exists")
        .args([
            "clean",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--profile",
            "walkability",
        ])
        .assert()
        .success();

    let (headers, _) = read_csv(&output.join("cleaned_smart_data.csv"));
    assert!(headers.contains(&"Shape_Area".to_string()));
    assert!(headers.contains(&"NatWalkInd_z".to_string()));
    assert!(headers.contains(&"Pct_AO0_z".to_string()));

    let (headers, rows) = read_csv(&output.join("smart_aggregated.csv"));
    assert_eq!(
        headers,
        vec!["CBSA_Name", "metro_count", "avg_D1B", "avg_NWI", "avg_pct_zero_car_HH"]
    );
    assert_eq!(rows[0][1], "2");
    assert_eq!(rows[0][2], "3");
    assert_eq!(rows[0][3], "10.5");
    assert!(close(&rows[0][4], 0.2));
}

#[test]
fn missing_input_fails_with_message() {
    let workspace = TestWorkspace::new();
    clean(&workspace.path().join("absent.zip"), workspace.path())
        .failure()
        .code(1)
        .stderr(contains("Input file not found"));
}

#[test]
fn archive_without_layer_fails() {
    let workspace = TestWorkspace::new();
    let archive = workspace.write_zip("empty.zip", &[("notes.txt", "nothing here")]);
    clean(&archive, workspace.path())
        .failure()
        .stderr(contains("CBG_Trans45"));
}

#[test]
fn unsupported_extension_fails() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("data.gdb", "binary");
    clean(&input, workspace.path())
        .failure()
        .stderr(contains("Unsupported input"));
}

#[test]
fn missing_group_key_fails() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("nokey.csv", "GEOID10,TrAccess_Index\n1,0.5\n");
    clean(&input, &workspace.path().join("out"))
        .failure()
        .stderr(contains("CBSA_Name"));
}

#[cfg(not(feature = "gdal"))]
#[test]
fn geodatabase_archive_requires_gdal_feature() {
    let workspace = TestWorkspace::new();
    let archive = workspace.write_zip(
        "SmartLocationDatabase.zip",
        &[
            ("SLD_Trans45.gdb/a00000001.gdbtable", "binary"),
            ("SLD_Trans45.gdb/gdb", "binary"),
        ],
    );
    clean(&archive, &workspace.path().join("out"))
        .failure()
        .code(1)
        .stderr(contains("SLD_Trans45.gdb"))
        .stderr(contains("--features gdal"));
}

#[cfg(not(feature = "gdal"))]
#[test]
fn geodatabase_directory_requires_gdal_feature() {
    let workspace = TestWorkspace::new();
    let gdb = workspace.path().join("SLD_Trans45.gdb");
    fs::create_dir_all(&gdb).unwrap();
    fs::write(gdb.join("a00000001.gdbtable"), b"binary").unwrap();
    clean(&gdb, &workspace.path().join("out"))
        .failure()
        .stderr(contains("--features gdal"));
}
