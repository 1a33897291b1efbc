//! `geoparquet convert` (§6.2): read GeoJSON or GeoParquet, write the other
//! (or re-normalize GeoParquet to GeoParquet).

use crate::commands::parse_compression;
use crate::driver::{resolve_auto, DataFormat, Sink, Source};
use crate::error::CliResult;
use geoparquet_core::convert::{
    geojson_to_geoparquet, geoparquet_to_geojson, normalize_geoparquet, ConvertOptions,
};
use geoparquet_core::geojson_stream::FeatureReader;

pub struct ConvertArgs {
    pub input: Option<String>,
    pub output: Option<String>,
    pub from: Option<DataFormat>,
    pub to: Option<DataFormat>,
    pub min: usize,
    pub max: usize,
    /// `--input-primary-column`: unset unless the user passed it. Only
    /// GeoJSON input defaults this to `"geometry"` (§6.2); normalizing an
    /// existing GeoParquet file instead keeps its own declared primary
    /// column unless this is explicitly given.
    pub input_primary_column: Option<String>,
    pub compression: String,
    pub row_group_length: Option<usize>,
}

pub fn run(args: ConvertArgs) -> CliResult<()> {
    let source = Source::from_arg(args.input.as_deref());
    let sink = Sink::from_arg(args.output.as_deref());

    let from = resolve_auto(args.from, source.suffix_source(), "--from")?;
    let to = resolve_auto(args.to, sink.suffix_source(), "--to")?;
    let compression = parse_compression(&args.compression)?;

    match (from, to) {
        (DataFormat::GeoJson, DataFormat::Parquet) => {
            let mut reader = FeatureReader::new(source.open_read()?);
            let opts = ConvertOptions {
                min_features: args.min,
                max_features: args.max,
                compression,
                row_group_length: args.row_group_length,
                input_primary_column: args
                    .input_primary_column
                    .clone()
                    .unwrap_or_else(|| "geometry".to_string()),
            };
            let stats = geojson_to_geoparquet(&mut reader, sink.create()?, opts)?;
            log::info!("wrote {} features", stats.features_written);
        }
        (DataFormat::Parquet, DataFormat::GeoJson) => {
            let bytes = source.read_to_bytes()?;
            let stats = geoparquet_to_geojson(bytes, sink.create()?)?;
            log::info!("wrote {} features", stats.features_written);
        }
        (DataFormat::Parquet, DataFormat::Parquet) => {
            let bytes = source.read_to_bytes()?;
            let stats = normalize_geoparquet(
                bytes,
                sink.create()?,
                args.input_primary_column.as_deref(),
                compression,
            )?;
            log::info!("wrote {} features", stats.features_written);
        }
        (DataFormat::GeoJson, DataFormat::GeoJson) => {
            // Tolerant-reader -> canonical-writer pass-through: re-serializes
            // whatever shape the input came in (bare Geometry, single
            // Feature, ndjson, ...) as one well-formed FeatureCollection.
            let mut reader = FeatureReader::new(source.open_read()?);
            let mut writer = geoparquet_core::geojson_stream::FeatureWriter::new(sink.create()?);
            let mut count = 0u64;
            while let Some(feature) = reader.read()? {
                writer.write(&feature)?;
                count += 1;
            }
            writer.close()?;
            log::info!("wrote {count} features");
        }
    }
    Ok(())
}
