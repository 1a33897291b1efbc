//! Schema and metadata summary (C10): walks the physical Parquet schema
//! tree and reports the `geo` metadata document alongside it (§4.10).
//!
//! `geozero` never introspects a file's physical schema, only its logical
//! Arrow one. Grounded instead in `geoarrow-rs`'s
//! `rust/geoarrow-geoparquet/src/reader/metadata.rs`, which walks the same
//! `parquet::schema::types` tree to map Arrow `DataType`s back to
//! GeoParquet column descriptors.

use crate::error::{Error, Result};
use crate::metadata::{Metadata, GEO_METADATA_KEY};
use parquet::basic::{Compression, Repetition, Type as PhysicalType};
use parquet::file::metadata::RowGroupMetaData;
use parquet::file::reader::ChunkReader;
use parquet::schema::types::{SchemaDescriptor, Type as SchemaType};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default)]
pub struct DescribeOptions {
    /// Skip the physical schema walk; report only the `geo` metadata.
    pub metadata_only: bool,
}

/// One node of the physical schema tree.
#[derive(Clone, Debug, Serialize)]
pub struct FieldInfo {
    pub name: String,
    pub optional: bool,
    pub repeated: bool,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldInfo>>,
}

/// The `geo` metadata document alongside any issues found while loading it.
/// `metadata` is `None` (and `issues` non-empty) for a file that is not a
/// valid GeoParquet file at all.
#[derive(Clone, Debug, Serialize)]
pub struct GeoDescribe {
    pub metadata: Option<Metadata>,
    pub issues: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Describe {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<FieldInfo>,
    pub geo: GeoDescribe,
    pub num_rows: i64,
    pub num_row_groups: usize,
}

pub fn describe<T: ChunkReader + 'static>(source: T, opts: DescribeOptions) -> Result<Describe> {
    let reader = parquet::file::reader::SerializedFileReader::new(source)?;
    let file_metadata = {
        use parquet::file::reader::FileReader;
        reader.metadata().clone()
    };

    let kvs = file_metadata
        .file_metadata()
        .key_value_metadata()
        .cloned()
        .unwrap_or_default();
    let (geo_metadata, issues) = match Metadata::from_key_value_metadata(&kvs) {
        Ok(m) => (Some(m), Vec::new()),
        Err(Error::NoMetadata) => (
            None,
            vec![format!(
                "Not a valid GeoParquet file (missing the \"{GEO_METADATA_KEY}\" metadata key)"
            )],
        ),
        Err(e) => (None, vec![e.to_string()]),
    };

    let schema = if opts.metadata_only {
        None
    } else {
        let descr = file_metadata.file_metadata().schema_descr();
        let first_row_group = (file_metadata.num_row_groups() > 0)
            .then(|| file_metadata.row_group(0).clone());
        let leaf_paths = leaf_path_index(descr);
        Some(walk(descr.root_schema(), first_row_group.as_ref(), &leaf_paths, &[], true))
    };

    Ok(Describe {
        schema,
        geo: GeoDescribe { metadata: geo_metadata, issues },
        num_rows: file_metadata.file_metadata().num_rows(),
        num_row_groups: file_metadata.num_row_groups(),
    })
}

/// Maps a leaf column's dotted path to its flat index in `descr`, so the
/// recursive walk can look up per-column compression without re-deriving
/// the dotted path it has already built up while descending.
fn leaf_path_index(descr: &SchemaDescriptor) -> HashMap<String, usize> {
    (0..descr.num_columns())
        .map(|i| (descr.column(i).path().string(), i))
        .collect()
}

fn walk(
    node: &Arc<SchemaType>,
    row_group: Option<&RowGroupMetaData>,
    leaf_paths: &HashMap<String, usize>,
    path: &[String],
    is_root: bool,
) -> FieldInfo {
    let basic = node.get_basic_info();
    let name = basic.name().to_string();

    if node.is_group() {
        let mut child_path = path.to_vec();
        if !is_root {
            child_path.push(name.clone());
        }
        let fields = node
            .get_fields()
            .iter()
            .map(|f| walk(f, row_group, leaf_paths, &child_path, false))
            .collect();
        FieldInfo {
            name,
            optional: is_root || basic.repetition() == Repetition::OPTIONAL,
            repeated: !is_root && basic.repetition() == Repetition::REPEATED,
            type_: "group".to_string(),
            annotation: annotation_of(node),
            compression: None,
            fields: Some(fields),
        }
    } else {
        let mut full_path = path.to_vec();
        full_path.push(name.clone());
        let dotted = full_path.join(".");
        let compression = leaf_paths
            .get(&dotted)
            .and_then(|&idx| row_group.map(|rg| compression_label(rg.column(idx).compression())));

        FieldInfo {
            name,
            optional: basic.repetition() == Repetition::OPTIONAL,
            repeated: basic.repetition() == Repetition::REPEATED,
            type_: physical_type_label(node),
            annotation: annotation_of(node),
            compression,
            fields: None,
        }
    }
}

fn physical_type_label(node: &SchemaType) -> String {
    match node.get_physical_type() {
        PhysicalType::BOOLEAN => "boolean".to_string(),
        PhysicalType::INT32 => "int32".to_string(),
        PhysicalType::INT64 => "int64".to_string(),
        PhysicalType::INT96 => "int96".to_string(),
        PhysicalType::FLOAT => "float".to_string(),
        PhysicalType::DOUBLE => "double".to_string(),
        PhysicalType::BYTE_ARRAY => "byte_array".to_string(),
        PhysicalType::FIXED_LEN_BYTE_ARRAY => {
            format!("fixed_len_byte_array({})", node.get_type_length())
        }
    }
}

fn annotation_of(node: &SchemaType) -> Option<String> {
    let basic = node.get_basic_info();
    if let Some(logical) = basic.logical_type() {
        return Some(format!("{logical:?}"));
    }
    let converted = basic.converted_type();
    if converted != parquet::basic::ConvertedType::NONE {
        return Some(format!("{converted:?}"));
    }
    None
}

fn compression_label(c: Compression) -> String {
    format!("{c:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{geojson_to_geoparquet, ConvertOptions};
    use crate::geojson_stream::FeatureReader;
    use bytes::Bytes;

    fn sample_file() -> Vec<u8> {
        let geojson = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Point","coordinates":[1.0,2.0]},"properties":{"name":"a"}}
        ]}"#;
        let mut reader = FeatureReader::new(geojson.as_bytes());
        let opts = ConvertOptions { min_features: 1, max_features: 10, ..Default::default() };
        let mut sink = Vec::new();
        geojson_to_geoparquet(&mut reader, &mut sink, opts).unwrap();
        sink
    }

    #[test]
    fn describes_valid_file_with_no_issues() {
        let bytes = sample_file();
        let d = describe(Bytes::from(bytes), DescribeOptions::default()).unwrap();
        assert!(d.geo.issues.is_empty());
        assert!(d.geo.metadata.is_some());
        assert_eq!(d.num_rows, 1);
        let schema = d.schema.unwrap();
        assert_eq!(schema.type_, "group");
        assert!(schema.fields.unwrap().iter().any(|f| f.name == "geometry"));
    }

    #[test]
    fn metadata_only_skips_schema_walk() {
        let bytes = sample_file();
        let d = describe(Bytes::from(bytes), DescribeOptions { metadata_only: true }).unwrap();
        assert!(d.schema.is_none());
        assert!(d.geo.metadata.is_some());
    }

    #[test]
    fn missing_geo_metadata_reports_issue() {
        use arrow_array::{Int32Array, RecordBatch};
        use arrow_schema::{DataType, Field, Schema};
        use parquet::arrow::arrow_writer::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![Field::new("n", DataType::Int32, false)]));
        let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(Int32Array::from(vec![1, 2]))]).unwrap();
        let mut sink = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut sink, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let d = describe(Bytes::from(sink), DescribeOptions::default()).unwrap();
        assert!(d.geo.metadata.is_none());
        assert_eq!(d.geo.issues.len(), 1);
        assert!(d.geo.issues[0].contains("missing the \"geo\" metadata key"));
    }
}
