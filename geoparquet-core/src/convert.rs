//! Converter (C7): orchestrates GeoJSON <-> GeoParquet with bounded
//! buffering and metadata finalization (§4.7).
//!
//! `geozero` ships independent one-shot reader/writer pairs per format,
//! never a two-phase buffered converter, so the orchestration here is built
//! from pieces grounded elsewhere: [`crate::schema::SchemaBuilder`] for
//! discovery, [`crate::record::RecordWriter`]/[`crate::record::RecordReader`]
//! for the columnar side, [`crate::geojson_stream`] for the JSON side.

use crate::arrow_bridge;
use crate::bbox::Bbox;
use crate::codec;
use crate::error::{Error, Result};
use crate::feature::Feature;
use crate::geojson_stream::{FeatureReader, FeatureWriter};
use crate::metadata::Metadata;
use crate::record::{ReaderOptions, RecordReader, RecordWriter, WriterOptions};
use crate::schema::SchemaBuilder;
use parquet::basic::Compression;
use parquet::file::reader::ChunkReader;
use std::io::{Read, Write};

/// GeoJSON -> GeoParquet configuration (§4.7.1).
#[derive(Clone, Debug)]
pub struct ConvertOptions {
    pub min_features: usize,
    pub max_features: usize,
    pub compression: Compression,
    pub row_group_length: Option<usize>,
    pub input_primary_column: String,
}

impl Default for ConvertOptions {
    fn default() -> ConvertOptions {
        ConvertOptions {
            min_features: 1,
            max_features: 50,
            compression: Compression::ZSTD(Default::default()),
            row_group_length: None,
            input_primary_column: "geometry".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ConvertStats {
    pub features_written: u64,
}

/// Stream a GeoJSON feature source into a new GeoParquet file.
///
/// Two-phase schema discovery: features are buffered while the schema is
/// not yet `ready()` and fewer than `min_features` have been seen; if
/// `max_features` is exceeded without readiness, fails with
/// [`Error::SchemaNotReady`]. Once ready, a geometry column is injected
/// under `input_primary_column` with the default WKB encoding, the record
/// writer is constructed, the buffer is replayed, and the remaining
/// features stream straight through.
pub fn geojson_to_geoparquet<R: Read, W: Write + Send>(
    reader: &mut FeatureReader<R>,
    sink: W,
    opts: ConvertOptions,
) -> Result<ConvertStats> {
    let mut builder = SchemaBuilder::new();
    builder.add_geometry(&opts.input_primary_column, "WKB")?;

    let mut buffer: Vec<Feature> = Vec::new();
    loop {
        let Some(feature) = reader.read()? else { break };
        builder.add(&feature.properties)?;
        buffer.push(feature);
        if builder.ready() && buffer.len() >= opts.min_features {
            break;
        }
        if buffer.len() >= opts.max_features {
            return Err(Error::SchemaNotReady(buffer.len(), opts.max_features));
        }
    }
    if !builder.ready() {
        return Err(Error::SchemaNotReady(buffer.len(), opts.max_features));
    }

    let schema = builder.build();
    let mut metadata = Metadata::default_for_primary(&opts.input_primary_column);

    let writer_opts = WriterOptions {
        row_group_length: opts
            .row_group_length
            .unwrap_or_else(|| WriterOptions::default().row_group_length),
        compression: opts.compression,
    };
    let mut writer = RecordWriter::try_new(sink, schema, metadata.clone(), writer_opts)?;

    let mut count: u64 = 0;
    for feature in buffer.drain(..) {
        write_feature_row(&mut writer, &mut metadata, &opts.input_primary_column, &feature)?;
        count += 1;
    }
    while let Some(feature) = reader.read()? {
        write_feature_row(&mut writer, &mut metadata, &opts.input_primary_column, &feature)?;
        count += 1;
    }

    set_writer_metadata(&mut writer, metadata);
    writer.close()?;
    Ok(ConvertStats { features_written: count })
}

fn write_feature_row<W: Write + Send>(
    writer: &mut RecordWriter<W>,
    metadata: &mut Metadata,
    primary_column: &str,
    feature: &Feature,
) -> Result<()> {
    let geometry_array = arrow_bridge::geometry_wkb_array(feature.geometry.as_ref())?;
    writer.push_extra_column(primary_column, geometry_array);
    writer.write_row(feature.properties.clone())?;

    if let Some(geom) = &feature.geometry {
        if let Some(col) = metadata.columns.get_mut(primary_column) {
            col.add_geometry_type(&geom.kind());
            col.union_bounds(&geom.bound());
        }
    }
    Ok(())
}

/// `RecordWriter::metadata` is only finalized once, at `close()`; this lets
/// the converter accumulate bounds/types across the whole stream before
/// swapping in the final value.
fn set_writer_metadata<W: Write + Send>(writer: &mut RecordWriter<W>, metadata: Metadata) {
    writer.metadata = metadata;
}

/// Materialize record batches from a GeoParquet source into a GeoJSON
/// `FeatureCollection` (§4.7.3). Returns the number of features written.
pub fn geoparquet_to_geojson<T: ChunkReader + 'static, W: Write>(
    source: T,
    sink: W,
) -> Result<ConvertStats> {
    let mut reader = RecordReader::try_new(source, ReaderOptions::new(), None)?;
    let metadata = reader
        .metadata
        .clone()
        .ok_or(Error::NoMetadata)?;
    metadata.validate_primary_column()?;
    let primary = metadata.primary_column.clone();
    let encoding = metadata.primary().map(|c| c.encoding.clone()).unwrap_or_default();

    let schema = arrow_bridge::from_arrow_schema(&reader.arrow_schema);
    let column_names: Vec<String> = schema.fields.iter().map(|(n, _)| n.clone()).collect();
    let bbox_column = crate::metadata::get_bbox_column(&column_names, &metadata);
    let secondary_columns: Vec<(String, String)> = metadata
        .columns
        .iter()
        .filter(|(name, _)| *name != &primary)
        .map(|(name, col)| (name.clone(), col.encoding.clone()))
        .collect();

    let mut exclude = vec![primary.clone()];
    exclude.extend(secondary_columns.iter().map(|(n, _)| n.clone()));
    if bbox_column.is_present() {
        exclude.push(bbox_column.column_name.clone());
    }

    let mut writer = FeatureWriter::new(sink);
    let mut count: u64 = 0;

    while let Some(batch) = reader.next_batch()? {
        for row in 0..batch.num_rows() {
            let raw = arrow_bridge::geometry_raw_at(&batch, &primary)?;
            let geometry = raw.decode_row(row, &encoding)?;
            let mut properties = arrow_bridge::row_properties(&batch, &schema, row, &exclude)?;

            for (name, col_encoding) in &secondary_columns {
                let raw = arrow_bridge::geometry_raw_at(&batch, name)?;
                if let Some(geom) = raw.decode_row(row, col_encoding)? {
                    properties.insert(
                        name.clone(),
                        crate::property::PropertyValue::from_json(&crate::geojson_stream::geometry_to_json(&geom)),
                    );
                }
            }

            let bbox = if bbox_column.is_present() {
                let [xn, yn, xx, yx] = &bbox_column.field_names;
                let values = [
                    arrow_bridge::struct_f64_field(&batch, &bbox_column.column_name, xn, row)?,
                    arrow_bridge::struct_f64_field(&batch, &bbox_column.column_name, yn, row)?,
                    arrow_bridge::struct_f64_field(&batch, &bbox_column.column_name, xx, row)?,
                    arrow_bridge::struct_f64_field(&batch, &bbox_column.column_name, yx, row)?,
                ];
                match values {
                    [Some(xmin), Some(ymin), Some(xmax), Some(ymax)] => {
                        Some(Bbox::new(xmin, ymin, xmax, ymax))
                    }
                    _ => None,
                }
            } else {
                None
            };

            let feature = Feature { id: None, geometry, properties, bbox };
            writer.write(&feature)?;
            count += 1;
        }
    }
    writer.close()?;
    Ok(ConvertStats { features_written: count })
}

/// GeoParquet (or plain Parquet) -> GeoParquet normalization (§4.7.2): every
/// WKT geometry column is re-encoded to WKB; bounds and type sets are
/// recomputed from scratch across all row groups; everything else passes
/// through unchanged.
pub fn normalize_geoparquet<T: ChunkReader + 'static, W: Write + Send>(
    source: T,
    sink: W,
    input_primary_column: Option<&str>,
    compression: Compression,
) -> Result<ConvertStats> {
    let mut reader = RecordReader::try_new(source, ReaderOptions::new(), None)?;
    let mut metadata = match reader.metadata.clone() {
        Some(m) => m,
        None => {
            let primary = input_primary_column
                .ok_or(Error::MissingGeometryColumn)?
                .to_string();
            Metadata::default_for_primary(&primary)
        }
    };
    if let Some(primary) = input_primary_column {
        if !metadata.columns.contains_key(primary) {
            return Err(Error::MissingGeometryColumn);
        }
        metadata.primary_column = primary.to_string();
    }
    metadata.validate_primary_column()?;

    // Every declared geometry column is re-encoded, not just the primary
    // one (§4.7.2: "the declared geometry columns", plural). Capture each
    // column's input encoding before the loop below overwrites it.
    let input_encodings: Vec<(String, String)> = metadata
        .columns
        .iter()
        .map(|(name, col)| (name.clone(), col.encoding.clone()))
        .collect();
    let geometry_columns: Vec<String> = input_encodings.iter().map(|(n, _)| n.clone()).collect();

    let schema = arrow_bridge::from_arrow_schema(&reader.arrow_schema);
    // Bounds/types are recomputed from the data, not copied from the input
    // file's metadata; the physical encoding becomes WKB unconditionally.
    for col in metadata.columns.values_mut() {
        col.encoding = codec::Encoding::Wkb.as_str().to_string();
        col.bbox = None;
        col.geometry_types = Vec::new();
    }

    let writer_opts = WriterOptions { row_group_length: WriterOptions::default().row_group_length, compression };
    let mut writer = RecordWriter::try_new(sink, schema.clone(), metadata.clone(), writer_opts)?;

    let mut count: u64 = 0;
    while let Some(batch) = reader.next_batch()? {
        for row in 0..batch.num_rows() {
            let props = arrow_bridge::row_properties(&batch, &schema, row, &geometry_columns)?;

            for (name, input_encoding) in &input_encodings {
                let raw = arrow_bridge::geometry_raw_at(&batch, name)?;
                let geometry = raw.decode_row(row, input_encoding)?;
                let geometry_array = arrow_bridge::geometry_wkb_array(geometry.as_ref())?;
                writer.push_extra_column(name, geometry_array);
                if let Some(geom) = &geometry {
                    if let Some(col) = writer.metadata.columns.get_mut(name) {
                        col.add_geometry_type(&geom.kind());
                        col.union_bounds(&geom.bound());
                    }
                }
            }
            writer.write_row(props)?;
            count += 1;
        }
    }
    writer.close()?;
    Ok(ConvertStats { features_written: count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyValue;

    #[test]
    fn convert_options_default_matches_component_spec() {
        let opts = ConvertOptions::default();
        assert_eq!(opts.min_features, 1);
        assert_eq!(opts.max_features, 50);
        assert_eq!(opts.input_primary_column, "geometry");
    }

    #[test]
    fn schema_not_ready_when_max_features_exceeded_without_resolution() {
        let input = (0..5)
            .map(|_| r#"{"type":"Feature","geometry":null,"properties":{"tags":[]}}"#)
            .collect::<Vec<_>>()
            .join("\n");
        let mut reader = FeatureReader::new(input.as_bytes());
        let opts = ConvertOptions { min_features: 1, max_features: 3, ..ConvertOptions::default() };
        let err = geojson_to_geoparquet(&mut reader, Vec::new(), opts);
        assert!(matches!(err, Err(Error::SchemaNotReady(..))));
    }

    #[test]
    fn writes_and_reads_back_simple_features() {
        let input = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Point","coordinates":[1.0,2.0]},"properties":{"name":"a"}},
            {"type":"Feature","geometry":{"type":"Point","coordinates":[3.0,4.0]},"properties":{"name":"b"}}
        ]}"#;
        let mut reader = FeatureReader::new(input.as_bytes());
        let opts = ConvertOptions { min_features: 1, max_features: 10, ..ConvertOptions::default() };
        let stats = geojson_to_geoparquet(&mut reader, Vec::new(), opts).unwrap();
        assert_eq!(stats.features_written, 2);
    }

    #[test]
    fn property_value_roundtrips_through_schema() {
        let mut builder = SchemaBuilder::new();
        let mut row = crate::property::PropertyMap::new();
        row.insert("n".to_string(), PropertyValue::Int(3));
        builder.add(&row).unwrap();
        assert!(builder.ready());
    }
}
