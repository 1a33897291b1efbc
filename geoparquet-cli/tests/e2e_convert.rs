//! End-to-end CLI tests driving the built `geoparquet` binary, the way
//! `geoetl-cli`'s own `tests/e2e_*.rs` drive its binary with `assert_cmd`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const CITIES_GEOJSON: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","geometry":{"type":"Point","coordinates":[12.4534,41.9029]},"properties":{"name":"Vatican City"}},
    {"type":"Feature","geometry":{"type":"Point","coordinates":[2.3522,48.8566]},"properties":{"name":"Paris"}}
]}"#;

fn geoparquet_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("geoparquet"))
}

#[test]
fn convert_geojson_to_geoparquet_and_back() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("cities.geojson");
    let parquet = dir.path().join("cities.parquet");
    let roundtrip = dir.path().join("cities.out.geojson");
    fs::write(&input, CITIES_GEOJSON).unwrap();

    geoparquet_cmd()
        .arg("convert")
        .arg(&input)
        .arg(&parquet)
        .arg("--min")
        .arg("1")
        .assert()
        .success();
    assert!(fs::metadata(&parquet).unwrap().len() > 0);

    geoparquet_cmd().arg("convert").arg(&parquet).arg(&roundtrip).assert().success();

    let output = fs::read_to_string(&roundtrip).unwrap();
    assert!(output.contains("Vatican City"));
    assert!(output.contains("FeatureCollection"));
    serde_json::from_str::<serde_json::Value>(&output).expect("valid JSON");
}

#[test]
fn describe_reports_geometry_metadata() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("cities.geojson");
    let parquet = dir.path().join("cities.parquet");
    fs::write(&input, CITIES_GEOJSON).unwrap();

    geoparquet_cmd().arg("convert").arg(&input).arg(&parquet).assert().success();

    geoparquet_cmd()
        .arg("describe")
        .arg(&parquet)
        .assert()
        .success()
        .stdout(predicate::str::contains("geo:"))
        .stdout(predicate::str::contains("primary_column"));
}

#[test]
fn validate_reports_valid_for_converted_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("cities.geojson");
    let parquet = dir.path().join("cities.parquet");
    fs::write(&input, CITIES_GEOJSON).unwrap();

    geoparquet_cmd().arg("convert").arg(&input).arg(&parquet).assert().success();

    geoparquet_cmd()
        .arg("validate")
        .arg(&parquet)
        .assert()
        .success()
        .stdout(predicate::str::contains("VALID"));
}

#[test]
fn extract_filters_by_bbox() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("cities.geojson");
    let parquet = dir.path().join("cities.parquet");
    let extracted = dir.path().join("western.parquet");
    let extracted_json = dir.path().join("western.geojson");
    fs::write(&input, CITIES_GEOJSON).unwrap();

    geoparquet_cmd().arg("convert").arg(&input).arg(&parquet).assert().success();

    geoparquet_cmd()
        .arg("extract")
        .arg(&parquet)
        .arg(&extracted)
        .arg("--bbox")
        .arg("-10,45,5,55")
        .assert()
        .success();

    geoparquet_cmd().arg("convert").arg(&extracted).arg(&extracted_json).assert().success();
    let output = fs::read_to_string(&extracted_json).unwrap();
    assert!(output.contains("Paris"));
    assert!(!output.contains("Vatican City"));
}

#[test]
fn convert_reports_error_for_unknown_extension() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("cities.geojson");
    let output = dir.path().join("cities.bin");
    fs::write(&input, CITIES_GEOJSON).unwrap();

    geoparquet_cmd()
        .arg("convert")
        .arg(&input)
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a recognized format"));
}

#[test]
fn version_prints_package_version() {
    geoparquet_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("geoparquet "));
}
