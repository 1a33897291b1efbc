//! End-to-end exercise of the converter, validator, extractor and describe
//! paths against a single in-memory dataset, the way `geozero`'s own
//! top-level `tests/` crate exercises whole reader-to-writer pipelines
//! rather than individual processor calls.

use bytes::Bytes;
use geoparquet_core::bbox::Bbox;
use geoparquet_core::convert::{
    geojson_to_geoparquet, geoparquet_to_geojson, normalize_geoparquet, ConvertOptions,
};
use geoparquet_core::describe::{describe, DescribeOptions};
use geoparquet_core::extract::{extract, ExtractOptions};
use geoparquet_core::geojson_stream::FeatureReader;
use geoparquet_core::metadata::{GeometryColumn, Metadata};
use geoparquet_core::record::{RecordWriter, WriterOptions};
use geoparquet_core::schema::SchemaBuilder;
use geoparquet_core::validator::{validate, ValidateOptions};
use std::collections::BTreeMap;

const CITIES: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","geometry":{"type":"Point","coordinates":[2.3522,48.8566]},"properties":{"name":"Paris","population":2161000}},
    {"type":"Feature","geometry":{"type":"Point","coordinates":[-0.1276,51.5072]},"properties":{"name":"London","population":8982000}},
    {"type":"Feature","geometry":{"type":"Point","coordinates":[13.405,52.52]},"properties":{"name":"Berlin","population":3645000}}
]}"#;

fn cities_geoparquet() -> Bytes {
    let mut reader = FeatureReader::new(CITIES.as_bytes());
    let opts = ConvertOptions { min_features: 1, max_features: 10, ..ConvertOptions::default() };
    let mut out = Vec::new();
    geojson_to_geoparquet(&mut reader, &mut out, opts).unwrap();
    Bytes::from(out)
}

#[test]
fn geojson_to_geoparquet_round_trips_back_to_geojson() {
    let parquet_bytes = cities_geoparquet();

    let mut json_out = Vec::new();
    let stats = geoparquet_to_geojson(parquet_bytes, &mut json_out).unwrap();
    assert_eq!(stats.features_written, 3);

    let collection: serde_json::Value = serde_json::from_slice(&json_out).unwrap();
    let features = collection["features"].as_array().unwrap();
    assert_eq!(features.len(), 3);
    assert_eq!(features[0]["properties"]["name"], "Paris");
    assert_eq!(features[0]["geometry"]["type"], "Point");
}

#[test]
fn normalized_file_passes_validation() {
    let parquet_bytes = cities_geoparquet();
    let report = validate(parquet_bytes.clone(), ValidateOptions::default()).unwrap();
    assert!(!report.failed(), "{report:#?}");

    let mut renormalized = Vec::new();
    let stats = normalize_geoparquet(parquet_bytes, &mut renormalized, None, parquet::basic::Compression::SNAPPY).unwrap();
    assert_eq!(stats.features_written, 3);

    let report = validate(Bytes::from(renormalized), ValidateOptions::default()).unwrap();
    assert!(!report.failed(), "{report:#?}");
}

/// Builds a GeoParquet source with two declared geometry columns: the
/// primary `geometry` (WKB) and a secondary `alt_geom` (WKT) -- the shape
/// `normalize_geoparquet` must re-encode both of, not just the primary.
fn two_geometry_columns_geoparquet() -> Bytes {
    use geoparquet_core::geometry::{Coord, Geometry};

    let mut builder = SchemaBuilder::new();
    builder.add_geometry("geometry", "WKB").unwrap();
    builder.add_geometry("alt_geom", "WKT").unwrap();
    let mut row = BTreeMap::new();
    row.insert("name".to_string(), geoparquet_core::property::PropertyValue::String("a".to_string()));
    builder.add(&row).unwrap();
    let schema = builder.build();

    let mut columns = BTreeMap::new();
    columns.insert("geometry".to_string(), GeometryColumn::new("WKB"));
    columns.insert("alt_geom".to_string(), GeometryColumn::new("WKT"));
    let metadata = Metadata { version: "1.0.0".to_string(), primary_column: "geometry".to_string(), columns };

    let mut out = Vec::new();
    let mut writer = RecordWriter::try_new(&mut out, schema, metadata, WriterOptions::default()).unwrap();

    let primary = Geometry::Point(Coord::xy(1.0, 2.0));
    let secondary = Geometry::Point(Coord::xy(3.0, 4.0));
    let wkb_bytes = geoparquet_core::codec::encode_wkb(&primary).unwrap();
    let wkt_text = geoparquet_core::codec::encode_wkt(&secondary).unwrap();
    writer.push_extra_column(
        "geometry",
        std::sync::Arc::new(arrow_array::BinaryArray::from(vec![Some(wkb_bytes.as_slice())])),
    );
    writer.push_extra_column(
        "alt_geom",
        std::sync::Arc::new(arrow_array::StringArray::from(vec![Some(wkt_text.as_str())])),
    );
    writer.write_row(row).unwrap();
    writer.close().unwrap();
    Bytes::from(out)
}

#[test]
fn normalize_reencodes_every_declared_geometry_column() {
    let parquet_bytes = two_geometry_columns_geoparquet();

    let mut renormalized = Vec::new();
    let stats =
        normalize_geoparquet(parquet_bytes, &mut renormalized, None, parquet::basic::Compression::SNAPPY).unwrap();
    assert_eq!(stats.features_written, 1);

    let renormalized = Bytes::from(renormalized);
    let report = validate(renormalized.clone(), ValidateOptions::default()).unwrap();
    assert!(!report.failed(), "{report:#?}");

    let info = describe(renormalized.clone(), DescribeOptions::default()).unwrap();
    let meta = info.geo.metadata.expect("geo metadata present");
    assert_eq!(meta.columns["geometry"].encoding, "WKB");
    assert_eq!(meta.columns["alt_geom"].encoding, "WKB");
    assert_eq!(meta.columns["alt_geom"].geometry_types, vec!["Point".to_string()]);

    let mut json_out = Vec::new();
    geoparquet_to_geojson(renormalized, &mut json_out).unwrap();
    let collection: serde_json::Value = serde_json::from_slice(&json_out).unwrap();
    let feature = &collection["features"][0];
    assert_eq!(feature["geometry"]["coordinates"], serde_json::json!([1.0, 2.0]));
    assert_eq!(feature["properties"]["alt_geom"]["coordinates"], serde_json::json!([3.0, 4.0]));
    assert_eq!(feature["properties"]["name"], "a");
}

#[test]
fn describe_reports_primary_column_and_row_count() {
    let parquet_bytes = cities_geoparquet();
    let info = describe(parquet_bytes, DescribeOptions::default()).unwrap();
    assert_eq!(info.num_rows, 3);
    let meta = info.geo.metadata.expect("geo metadata present");
    assert_eq!(meta.primary_column, "geometry");
    assert!(info.geo.issues.is_empty());
}

#[test]
fn extract_applies_bbox_and_column_projection() {
    let parquet_bytes = cities_geoparquet();

    // Western Europe only: excludes Berlin (13.4E).
    let opts = ExtractOptions {
        bbox: Some(Bbox::new(-10.0, 40.0, 5.0, 60.0)),
        drop_cols: Some(vec!["population".to_string()]),
        keep_only_cols: None,
    };
    let mut out = Vec::new();
    let stats = extract(parquet_bytes, &mut out, opts).unwrap();
    assert_eq!(stats.rows_written, 2);

    let mut json_out = Vec::new();
    geoparquet_to_geojson(Bytes::from(out), &mut json_out).unwrap();
    let collection: serde_json::Value = serde_json::from_slice(&json_out).unwrap();
    let features = collection["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    for feature in features {
        assert!(feature["properties"].get("population").is_none());
    }
}
