//! Validator rule engine (C9): checks a file's `geo` metadata and, unless
//! running metadata-only, every row's geometry against that metadata,
//! producing an ordered [`Report`] of [`Check`]s (§4.9).
//!
//! No single source file does this; the shape is four parallel rule groups
//! (file/metadata shape, per-column metadata, schema structure, per-row
//! geometry) sharing a common `Check { title, run, passed, message }`
//! output, rather than one `Visitor` trait threading state through every
//! rule as `geozero`'s `GeomProcessor` does for encoding. Row scanning reuses
//! [`crate::record::RecordReader`] and [`crate::codec`] exactly as
//! `convert.rs`/`extract.rs` do.

use crate::bbox::Bbox;
use crate::codec::RawColumn;
use crate::error::Result;
use crate::geometry::{Geometry, RingOrientation};
use crate::metadata::{Metadata, GEO_METADATA_KEY};
use arrow_array::{Array, BinaryArray, StringArray};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::basic::{Repetition, Type as PhysicalType};
use parquet::file::reader::ChunkReader;
use parquet::format::KeyValue;
use parquet::schema::types::SchemaDescriptor;
use serde_json::Value;

const RECOGNIZED_GEOMETRY_TYPES: &[&str] = &[
    "Point",
    "LineString",
    "Polygon",
    "MultiPoint",
    "MultiLineString",
    "MultiPolygon",
    "GeometryCollection",
];

/// The outcome of a single named rule.
#[derive(Clone, Debug, PartialEq)]
pub struct Check {
    pub title: &'static str,
    pub run: bool,
    pub passed: bool,
    pub message: Option<String>,
}

impl Check {
    fn not_run(title: &'static str) -> Check {
        Check { title, run: false, passed: false, message: None }
    }

    fn pass(title: &'static str) -> Check {
        Check { title, run: true, passed: true, message: None }
    }

    fn fail(title: &'static str, message: impl Into<String>) -> Check {
        Check { title, run: true, passed: false, message: Some(message.into()) }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ValidateOptions {
    /// Skip opening a record reader and scanning rows; only the metadata and
    /// schema rule groups run.
    pub metadata_only: bool,
}

/// The full, ordered set of rule outcomes for one file. `checks.len()` is
/// fixed at compile time regardless of the data: every rule contributes
/// exactly one entry, `run: false` when a fatal failure upstream skipped it.
#[derive(Clone, Debug)]
pub struct Report {
    pub checks: Vec<Check>,
}

impl Report {
    /// Any rule that ran and did not pass.
    pub fn failed(&self) -> bool {
        self.checks.iter().any(|c| c.run && !c.passed)
    }
}

/// Marks the point past which every remaining rule in this run reports
/// `not_run`, once a fatal check has failed.
struct Aborted;

pub fn validate<T: ChunkReader + 'static>(source: T, opts: ValidateOptions) -> Result<Report> {
    let mut checks = Vec::new();
    let builder = ParquetRecordBatchReaderBuilder::try_new(source)?;
    let kvs: Vec<KeyValue> = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .cloned()
        .unwrap_or_default();

    let geo_value = match check_file_stage(&kvs, &mut checks) {
        Ok(v) => v,
        Err(Aborted) => return Ok(finish(checks)),
    };

    let top = match check_metadata_stage(&geo_value, &mut checks) {
        Ok(v) => v,
        Err(Aborted) => return Ok(finish(checks)),
    };

    let meta = match check_column_stage(&top, &mut checks) {
        Ok(m) => m,
        Err(Aborted) => return Ok(finish(checks)),
    };

    if check_file_info_stage(&meta, builder.parquet_schema(), &mut checks).is_err() {
        return Ok(finish(checks));
    }

    if opts.metadata_only {
        checks.push(Check::not_run(TITLE_ENCODED_WELL_FORMED));
        checks.push(Check::not_run(TITLE_TYPE_DECLARED));
        checks.push(Check::not_run(TITLE_ORIENTATION));
        checks.push(Check::not_run(TITLE_BBOX_CONTAINS));
        return Ok(finish(checks));
    }

    let reader = builder.build()?;
    let row_checks = scan_rows(reader, &meta);
    checks.extend(row_checks);

    Ok(finish(checks))
}

fn finish(checks: Vec<Check>) -> Report {
    Report { checks }
}

// --- Stage A: raw key-value metadata (§4.9 "file handle") ---

const TITLE_GEO_KEY_PRESENT: &str = "file has exactly one \"geo\" metadata entry";
const TITLE_GEO_VALID_JSON: &str = "\"geo\" metadata value is valid JSON";
const TITLE_GEO_IS_OBJECT: &str = "\"geo\" metadata value is a JSON object";

fn check_file_stage(kvs: &[KeyValue], checks: &mut Vec<Check>) -> std::result::Result<Value, Aborted> {
    let matches: Vec<&KeyValue> = kvs.iter().filter(|kv| kv.key == GEO_METADATA_KEY).collect();
    if matches.len() != 1 {
        let message = if matches.is_empty() {
            format!("Not a valid GeoParquet file (missing the \"{GEO_METADATA_KEY}\" metadata key)")
        } else {
            format!("\"{GEO_METADATA_KEY}\" metadata key appears {} times", matches.len())
        };
        checks.push(Check::fail(TITLE_GEO_KEY_PRESENT, message));
        abort_remaining(checks);
        return Err(Aborted);
    }
    checks.push(Check::pass(TITLE_GEO_KEY_PRESENT));

    let raw = match matches[0].value.as_deref() {
        Some(v) => v,
        None => {
            checks.push(Check::fail(TITLE_GEO_VALID_JSON, "metadata key has no value"));
            abort_remaining(checks);
            return Err(Aborted);
        }
    };

    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            checks.push(Check::fail(TITLE_GEO_VALID_JSON, e.to_string()));
            abort_remaining(checks);
            return Err(Aborted);
        }
    };
    checks.push(Check::pass(TITLE_GEO_VALID_JSON));

    if !value.is_object() {
        checks.push(Check::fail(TITLE_GEO_IS_OBJECT, "expected a JSON object"));
        abort_remaining(checks);
        return Err(Aborted);
    }
    checks.push(Check::pass(TITLE_GEO_IS_OBJECT));
    Ok(value)
}

// --- Stage B: required top-level fields (§3.1) ---

const TITLE_VERSION_PRESENT: &str = "metadata has a \"version\" string";
const TITLE_PRIMARY_COLUMN_PRESENT: &str = "metadata has a \"primary_column\" string";
const TITLE_COLUMNS_PRESENT: &str = "metadata has a \"columns\" object";

fn check_metadata_stage(value: &Value, checks: &mut Vec<Check>) -> std::result::Result<Value, Aborted> {
    let obj = value.as_object().expect("checked in stage A");

    if !matches!(obj.get("version"), Some(Value::String(_))) {
        checks.push(Check::fail(TITLE_VERSION_PRESENT, "missing or non-string \"version\""));
        abort_remaining(checks);
        return Err(Aborted);
    }
    checks.push(Check::pass(TITLE_VERSION_PRESENT));

    if !matches!(obj.get("primary_column"), Some(Value::String(_))) {
        checks.push(Check::fail(
            TITLE_PRIMARY_COLUMN_PRESENT,
            "missing or non-string \"primary_column\"",
        ));
        abort_remaining(checks);
        return Err(Aborted);
    }
    checks.push(Check::pass(TITLE_PRIMARY_COLUMN_PRESENT));

    match obj.get("columns") {
        Some(Value::Object(_)) => {
            checks.push(Check::pass(TITLE_COLUMNS_PRESENT));
            Ok(value.clone())
        }
        _ => {
            checks.push(Check::fail(TITLE_COLUMNS_PRESENT, "missing or non-object \"columns\""));
            abort_remaining(checks);
            Err(Aborted)
        }
    }
}

// --- Stage C: per-column metadata semantics (§3.1 column table) ---

const TITLE_PRIMARY_IN_COLUMNS: &str = "primary_column is a key of columns";
const TITLE_ENCODING_IS_WKB: &str = "every column's encoding is \"WKB\"";
const TITLE_GEOMETRY_TYPES_RECOGNIZED: &str = "every column's geometry_types are recognized type names";
const TITLE_CRS_IS_OBJECT: &str = "every column's crs, when present, is a JSON object";
const TITLE_ORIENTATION_RECOGNIZED: &str = "every column's orientation, when present, is \"counterclockwise\"";
const TITLE_EDGES_RECOGNIZED: &str = "every column's edges, when present, is \"planar\" or \"spherical\"";
const TITLE_BBOX_SHAPE: &str = "every column's bbox, when present, has 4 or 6 numbers";

/// Returns the parsed [`Metadata`] once every column-level rule has passed,
/// so later stages work from typed data instead of re-inspecting `Value`.
fn check_column_stage(value: &Value, checks: &mut Vec<Check>) -> std::result::Result<Metadata, Aborted> {
    let obj = value.as_object().expect("checked in stage B");
    let primary_column = obj["primary_column"].as_str().expect("checked in stage B").to_string();
    let columns = obj["columns"].as_object().expect("checked in stage B");

    if !columns.contains_key(&primary_column) {
        checks.push(Check::fail(
            TITLE_PRIMARY_IN_COLUMNS,
            format!("primary_column `{primary_column}` is not a key of columns"),
        ));
        abort_remaining(checks);
        return Err(Aborted);
    }
    checks.push(Check::pass(TITLE_PRIMARY_IN_COLUMNS));

    if let Some(bad) = columns
        .iter()
        .find(|(_, c)| c.get("encoding").and_then(Value::as_str) != Some("WKB"))
    {
        checks.push(Check::fail(
            TITLE_ENCODING_IS_WKB,
            format!("column `{}` has a non-\"WKB\" or missing encoding", bad.0),
        ));
        abort_remaining(checks);
        return Err(Aborted);
    }
    checks.push(Check::pass(TITLE_ENCODING_IS_WKB));

    let unrecognized = columns.iter().find_map(|(name, c)| {
        let types = c.get("geometry_types").and_then(Value::as_array);
        let bad_type = types?.iter().find_map(|t| {
            let s = t.as_str()?;
            let base = s.strip_suffix(" Z").unwrap_or(s);
            (!RECOGNIZED_GEOMETRY_TYPES.contains(&base)).then(|| s.to_string())
        });
        bad_type.map(|t| (name.clone(), t))
    });
    if let Some((col, kind)) = unrecognized {
        checks.push(Check::fail(
            TITLE_GEOMETRY_TYPES_RECOGNIZED,
            format!("column `{col}` declares unrecognized geometry type `{kind}`"),
        ));
    } else {
        checks.push(Check::pass(TITLE_GEOMETRY_TYPES_RECOGNIZED));
    }

    let bad_crs = columns
        .iter()
        .find(|(_, c)| matches!(c.get("crs"), Some(v) if !v.is_null() && !v.is_object()));
    if let Some((name, _)) = bad_crs {
        checks.push(Check::fail(TITLE_CRS_IS_OBJECT, format!("column `{name}`'s crs is not an object")));
    } else {
        checks.push(Check::pass(TITLE_CRS_IS_OBJECT));
    }

    let bad_orientation = columns.iter().find(|(_, c)| {
        matches!(c.get("orientation"), Some(Value::String(s)) if s != "counterclockwise")
    });
    if let Some((name, _)) = bad_orientation {
        checks.push(Check::fail(
            TITLE_ORIENTATION_RECOGNIZED,
            format!("column `{name}`'s orientation is not \"counterclockwise\""),
        ));
    } else {
        checks.push(Check::pass(TITLE_ORIENTATION_RECOGNIZED));
    }

    let bad_edges = columns.iter().find(|(_, c)| {
        matches!(c.get("edges"), Some(Value::String(s)) if s != "planar" && s != "spherical")
    });
    if let Some((name, _)) = bad_edges {
        checks.push(Check::fail(
            TITLE_EDGES_RECOGNIZED,
            format!("column `{name}`'s edges is neither \"planar\" nor \"spherical\""),
        ));
    } else {
        checks.push(Check::pass(TITLE_EDGES_RECOGNIZED));
    }

    let bad_bbox = columns.iter().find(|(_, c)| match c.get("bbox") {
        None | Some(Value::Null) => false,
        Some(Value::Array(a)) => a.len() != 4 && a.len() != 6 || a.iter().any(|v| v.as_f64().is_none()),
        Some(_) => true,
    });
    if let Some((name, _)) = bad_bbox {
        checks.push(Check::fail(
            TITLE_BBOX_SHAPE,
            format!("column `{name}`'s bbox is not an array of 4 or 6 numbers"),
        ));
        abort_remaining(checks);
        return Err(Aborted);
    }
    checks.push(Check::pass(TITLE_BBOX_SHAPE));

    // Every field the rule list above actually checks has now been
    // confirmed well-shaped; build the typed document column by column so a
    // stray malformed optional field (`epoch` as a string, say) this engine
    // doesn't have a dedicated rule for can't abort row scanning outright.
    let mut typed_columns = std::collections::BTreeMap::new();
    for (name, c) in columns {
        let col = serde_json::from_value(c.clone())
            .unwrap_or_else(|_| crate::metadata::GeometryColumn::new("WKB"));
        typed_columns.insert(name.clone(), col);
    }
    Ok(Metadata { version: obj["version"].as_str().unwrap().to_string(), primary_column, columns: typed_columns })
}

// --- Stage D: schema structure (§4.9 "FileInfo") ---

const TITLE_GEOMETRY_IS_LEAF: &str = "every geometry column is a BYTE_ARRAY leaf";
const TITLE_GEOMETRY_NOT_REPEATED: &str = "every geometry column is not REPEATED";

fn check_file_info_stage(
    meta: &Metadata,
    parquet_schema: &SchemaDescriptor,
    checks: &mut Vec<Check>,
) -> std::result::Result<(), Aborted> {
    let mut bad_physical = None;
    let mut bad_repetition = None;
    for name in meta.columns.keys() {
        let Some(leaf) = leaf_index(parquet_schema, name) else {
            bad_physical = Some(format!("column `{name}` is not present in the Parquet schema"));
            continue;
        };
        let descr = parquet_schema.column(leaf);
        if descr.physical_type() != PhysicalType::BYTE_ARRAY {
            bad_physical = Some(format!(
                "column `{name}` has physical type {:?}, expected BYTE_ARRAY",
                descr.physical_type()
            ));
        }
        if descr.repetition() == Repetition::REPEATED {
            bad_repetition = Some(format!("column `{name}` is REPEATED"));
        }
    }

    match bad_physical {
        Some(msg) => {
            checks.push(Check::fail(TITLE_GEOMETRY_IS_LEAF, msg));
            abort_remaining(checks);
            return Err(Aborted);
        }
        None => checks.push(Check::pass(TITLE_GEOMETRY_IS_LEAF)),
    }

    match bad_repetition {
        Some(msg) => {
            checks.push(Check::fail(TITLE_GEOMETRY_NOT_REPEATED, msg));
            abort_remaining(checks);
            Err(Aborted)
        }
        None => {
            checks.push(Check::pass(TITLE_GEOMETRY_NOT_REPEATED));
            Ok(())
        }
    }
}

fn leaf_index(schema: &SchemaDescriptor, name: &str) -> Option<usize> {
    (0..schema.num_columns()).find(|&i| schema.column(i).path().string() == name)
}

// --- Stages E/F: per-row geometry (§4.9 "row rule activation") ---

const TITLE_ENCODED_WELL_FORMED: &str = "every geometry value is well-formed under its declared encoding";
const TITLE_TYPE_DECLARED: &str = "every geometry's type is declared in geometry_types";
const TITLE_ORIENTATION: &str = "every polygon ring follows the declared orientation";
const TITLE_BBOX_CONTAINS: &str = "every geometry lies within the column's declared bbox";

fn scan_rows(mut reader: ParquetRecordBatchReader, meta: &Metadata) -> Vec<Check> {
    let mut well_formed = Check::not_run(TITLE_ENCODED_WELL_FORMED);
    let mut type_declared = Check::not_run(TITLE_TYPE_DECLARED);
    let mut orientation = Check::not_run(TITLE_ORIENTATION);
    let mut bbox_contains = Check::not_run(TITLE_BBOX_CONTAINS);

    'outer: loop {
        let batch = match reader.next() {
            Some(Ok(b)) => b,
            Some(Err(e)) => {
                well_formed = Check::fail(TITLE_ENCODED_WELL_FORMED, e.to_string());
                break;
            }
            None => break,
        };

        for (name, col) in &meta.columns {
            let Ok(idx) = batch.schema().index_of(name) else { continue };
            let array = batch.column(idx);
            let raw = if let Some(a) = array.as_any().downcast_ref::<BinaryArray>() {
                RawColumn::Bytes(a)
            } else if let Some(a) = array.as_any().downcast_ref::<StringArray>() {
                RawColumn::Text(a)
            } else {
                continue;
            };

            let declared_types = meta.get_geometry_types(name);
            let declared_orientation = col.orientation.as_deref() == Some("counterclockwise");
            let declared_bbox = col.bbox.as_ref().filter(|b| b.len() == 4 || b.len() == 6).map(|b| {
                if b.len() == 6 {
                    Bbox::new(b[0], b[1], b[3], b[4])
                } else {
                    Bbox::new(b[0], b[1], b[2], b[3])
                }
            });

            for row in 0..raw.len_hint() {
                if raw.is_null(row) {
                    continue;
                }
                let geom = match raw.decode_row(row, &col.encoding) {
                    Ok(Some(g)) => {
                        note_pass(&mut well_formed);
                        g
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        well_formed = Check::fail(TITLE_ENCODED_WELL_FORMED, e.to_string());
                        break 'outer;
                    }
                };

                if !declared_types.is_empty() {
                    if declared_types.iter().any(|t| t == &geom.kind()) {
                        note_pass(&mut type_declared);
                    } else {
                        type_declared = Check::fail(
                            TITLE_TYPE_DECLARED,
                            format!("column `{name}` produced undeclared type `{}`", geom.kind()),
                        );
                    }
                }

                if declared_orientation {
                    if let Geometry::Polygon(rings) = &geom {
                        let mut ok = true;
                        for (i, ring) in rings.iter().enumerate() {
                            let expect =
                                if i == 0 { RingOrientation::CounterClockwise } else { RingOrientation::Clockwise };
                            if let Some(actual) = crate::geometry::ring_orientation(ring) {
                                if actual != expect {
                                    ok = false;
                                }
                            }
                        }
                        if ok {
                            note_pass(&mut orientation);
                        } else {
                            orientation = Check::fail(
                                TITLE_ORIENTATION,
                                format!("column `{name}` has a polygon with unexpected ring winding"),
                            );
                        }
                    }
                }

                if let Some(declared) = &declared_bbox {
                    if declared.contains(&geom.bound()) {
                        note_pass(&mut bbox_contains);
                    } else {
                        bbox_contains = Check::fail(
                            TITLE_BBOX_CONTAINS,
                            format!("column `{name}` has a geometry outside its declared bbox"),
                        );
                    }
                }
            }
        }
    }

    vec![well_formed, type_declared, orientation, bbox_contains]
}

/// Mark a row rule as having run and passed, unless it already failed.
fn note_pass(check: &mut Check) {
    if !check.run {
        *check = Check::pass(check.title);
    }
}

/// Every rule title this engine can produce, in report order. Used only to
/// pad out `not_run` entries after a fatal failure, so `Report::checks`
/// always has the same length regardless of where validation stopped.
const ALL_TITLES: [&str; 19] = [
    TITLE_GEO_KEY_PRESENT,
    TITLE_GEO_VALID_JSON,
    TITLE_GEO_IS_OBJECT,
    TITLE_VERSION_PRESENT,
    TITLE_PRIMARY_COLUMN_PRESENT,
    TITLE_COLUMNS_PRESENT,
    TITLE_PRIMARY_IN_COLUMNS,
    TITLE_ENCODING_IS_WKB,
    TITLE_GEOMETRY_TYPES_RECOGNIZED,
    TITLE_CRS_IS_OBJECT,
    TITLE_ORIENTATION_RECOGNIZED,
    TITLE_EDGES_RECOGNIZED,
    TITLE_BBOX_SHAPE,
    TITLE_GEOMETRY_IS_LEAF,
    TITLE_GEOMETRY_NOT_REPEATED,
    TITLE_ENCODED_WELL_FORMED,
    TITLE_TYPE_DECLARED,
    TITLE_ORIENTATION,
    TITLE_BBOX_CONTAINS,
];

/// Pad `checks` out to the full, fixed rule list once a fatal failure means
/// no later rule will run.
fn abort_remaining(checks: &mut Vec<Check>) {
    for title in ALL_TITLES.iter().skip(checks.len()) {
        checks.push(Check::not_run(title));
    }
}

trait RawColumnExt {
    fn len_hint(&self) -> usize;
}

impl RawColumnExt for RawColumn<'_> {
    fn len_hint(&self) -> usize {
        match self {
            RawColumn::Bytes(a) => arrow_array::Array::len(*a),
            RawColumn::Text(a) => arrow_array::Array::len(*a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{geojson_to_geoparquet, ConvertOptions};
    use crate::geojson_stream::FeatureReader;
    use bytes::Bytes;

    fn sample_file(geojson: &str) -> Vec<u8> {
        let mut reader = FeatureReader::new(geojson.as_bytes());
        let mut sink = Vec::new();
        let opts = ConvertOptions { min_features: 1, max_features: 10, ..Default::default() };
        geojson_to_geoparquet(&mut reader, &mut sink, opts).unwrap();
        sink
    }

    fn fc(features: &str) -> String {
        format!(r#"{{"type":"FeatureCollection","features":[{features}]}}"#)
    }

    #[test]
    fn well_formed_file_passes_every_check() {
        let feature = r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[1.0,2.0]},"properties":{}}"#;
        let bytes = sample_file(&fc(feature));
        let report = validate(Bytes::from(bytes), ValidateOptions::default()).unwrap();
        assert!(!report.failed());
        assert!(report.checks.iter().all(|c| c.run));
    }

    #[test]
    fn missing_geo_metadata_fails_first_check_and_aborts() {
        // A bare Parquet file with no `geo` key at all: built by writing a
        // GeoParquet file then re-parsing its bytes without the metadata
        // reconstruction helper geoparquet_to_geojson would provide -- here
        // we instead assert the file-stage message directly via a crafted
        // key-value list, exercising the same code path `validate` uses.
        let kvs: Vec<KeyValue> = Vec::new();
        let mut checks = Vec::new();
        let err = check_file_stage(&kvs, &mut checks).unwrap_err();
        let _ = err;
        assert_eq!(checks.len(), 1);
        assert!(!checks[0].passed);
        assert!(checks[0].message.as_ref().unwrap().contains("missing the \"geo\" metadata key"));
    }

    #[test]
    fn bogus_bbox_aborts_all_later_rules() {
        let value: Value = serde_json::json!({
            "version": "1.0.0",
            "primary_column": "geometry",
            "columns": {
                "geometry": { "encoding": "WKB", "geometry_types": [], "bbox": "bogus" }
            }
        });
        let mut checks = Vec::new();
        let top = check_metadata_stage(&value, &mut checks).unwrap();
        let err = check_column_stage(&top, &mut checks);
        assert!(err.is_err());
        let bbox_check = checks.iter().find(|c| c.title == TITLE_BBOX_SHAPE).unwrap();
        assert!(bbox_check.run && !bbox_check.passed);
    }

    #[test]
    fn report_check_count_is_fixed() {
        let feature = r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[1.0,2.0]},"properties":{}}"#;
        let bytes = sample_file(&fc(feature));
        let report = validate(Bytes::from(bytes), ValidateOptions::default()).unwrap();
        assert_eq!(report.checks.len(), 19);
    }

    #[test]
    fn metadata_only_skips_row_checks() {
        let feature = r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[1.0,2.0]},"properties":{}}"#;
        let bytes = sample_file(&fc(feature));
        let report =
            validate(Bytes::from(bytes), ValidateOptions { metadata_only: true }).unwrap();
        let row_checks: Vec<_> = report
            .checks
            .iter()
            .filter(|c| {
                c.title == TITLE_ENCODED_WELL_FORMED
                    || c.title == TITLE_TYPE_DECLARED
                    || c.title == TITLE_ORIENTATION
                    || c.title == TITLE_BBOX_CONTAINS
            })
            .collect();
        assert_eq!(row_checks.len(), 4);
        assert!(row_checks.iter().all(|c| !c.run));
    }
}
