//! Record reader/writer (C6): columnar batches over a Parquet file,
//! honoring projection and row-group selection on read, and row-group-sized
//! buffered flushing plus finalized `geo` metadata on write.
//!
//! `geozero`'s `arrow/geoparquet_reader.rs` uses `arrow2` and only reads --
//! no writer, no projection, no row-group selection, no stats. Those
//! capabilities are enriched from `geoarrow-rs`'s
//! `rust/geoarrow-geoparquet` crate, which depends
//! directly on `parquet` (arrow-rs) and `arrow-schema`/`arrow-array`. This
//! crate adopts that same dependency set in place of `arrow2`, because
//! `arrow2` exposes no column-chunk statistics API, which C8's predicate
//! pushdown requires (the one dependency swap made in this transformation;
//! see DESIGN.md).

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::property::PropertyMap;
use crate::schema::Schema;
use arrow_array::{ArrayRef, RecordBatch, RecordBatchReader};
use arrow_schema::{Schema as ArrowSchema, SchemaRef};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::arrow::ProjectionMask;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::ChunkReader;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

pub const DEFAULT_BATCH_SIZE: usize = 1024;

#[derive(Clone, Debug, Default)]
pub struct ReaderOptions {
    pub batch_size: usize,
    /// Column indices to project; `None` reads every column.
    pub projection: Option<Vec<usize>>,
    /// Row group indices to read; `None` reads every row group.
    pub row_groups: Option<Vec<usize>>,
}

impl ReaderOptions {
    pub fn new() -> ReaderOptions {
        ReaderOptions { batch_size: DEFAULT_BATCH_SIZE, projection: None, row_groups: None }
    }
}

/// Columnar reader over a Parquet source. Yields Arrow `RecordBatch`es with
/// the projected schema; a supplied projection must keep every `geo`
/// geometry column present, or construction fails with
/// `MissingGeometryColumn`.
pub struct RecordReader {
    inner: ParquetRecordBatchReader,
    pub metadata: Option<Metadata>,
    pub arrow_schema: SchemaRef,
    cancel: Option<CancellationToken>,
}

impl RecordReader {
    pub fn try_new<T: ChunkReader + 'static>(
        reader: T,
        opts: ReaderOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<RecordReader> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(reader)?;

        let kvs = builder
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .cloned()
            .unwrap_or_default();
        let geo_metadata = match Metadata::from_key_value_metadata(&kvs) {
            Ok(m) => Some(m),
            Err(Error::NoMetadata) => None,
            Err(e) => return Err(e),
        };

        if let (Some(meta), Some(cols)) = (&geo_metadata, &opts.projection) {
            let full_schema = builder.schema();
            for col_name in meta.columns.keys() {
                let idx = full_schema.index_of(col_name).map_err(|_| {
                    Error::UnknownColumn(col_name.clone())
                })?;
                if !cols.contains(&idx) {
                    return Err(Error::MissingGeometryColumn);
                }
            }
        }

        let mut builder = builder.with_batch_size(if opts.batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            opts.batch_size
        });
        if let Some(cols) = &opts.projection {
            let mask = ProjectionMask::leaves(builder.parquet_schema(), cols.iter().copied());
            builder = builder.with_projection(mask);
        }
        if let Some(row_groups) = &opts.row_groups {
            builder = builder.with_row_groups(row_groups.clone());
        }

        let inner = builder.build()?;
        let arrow_schema = inner.schema();
        Ok(RecordReader { inner, metadata: geo_metadata, arrow_schema, cancel })
    }

    pub fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        if let Some(token) = &self.cancel {
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }
        }
        match self.inner.next() {
            None => Ok(None),
            Some(Ok(batch)) => Ok(Some(batch)),
            Some(Err(e)) => Err(Error::from(e)),
        }
    }
}

impl Iterator for RecordReader {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Result<RecordBatch>> {
        self.next_batch().transpose()
    }
}

#[derive(Clone, Debug)]
pub struct WriterOptions {
    pub row_group_length: usize,
    pub compression: Compression,
}

impl Default for WriterOptions {
    fn default() -> WriterOptions {
        WriterOptions {
            row_group_length: WriterProperties::builder().build().max_row_group_size(),
            compression: Compression::ZSTD(Default::default()),
        }
    }
}

/// Buffered row-group writer: accumulates encoded rows into Arrow
/// `RecordBatch`es of up to [`DEFAULT_BATCH_SIZE`] and hands them to
/// `ArrowWriter`, which itself flushes a physical Parquet row group once
/// `row_group_length` rows have accumulated.
pub struct RecordWriter<W: Write + Send> {
    inner: ArrowWriter<W>,
    arrow_schema: SchemaRef,
    schema: Schema,
    pub metadata: Metadata,
    buffered_rows: Vec<PropertyMap>,
    buffered_extra: HashMap<String, Vec<ArrayRef>>,
    metadata_appended: bool,
}

impl<W: Write + Send> RecordWriter<W> {
    pub fn try_new(
        sink: W,
        schema: Schema,
        metadata: Metadata,
        opts: WriterOptions,
    ) -> Result<RecordWriter<W>> {
        let arrow_schema = Arc::new(crate::arrow_bridge::to_arrow_schema(&schema));
        let props = WriterProperties::builder()
            .set_compression(opts.compression)
            .set_max_row_group_size(opts.row_group_length)
            .build();
        let inner = ArrowWriter::try_new(sink, arrow_schema.clone(), Some(props))?;
        Ok(RecordWriter {
            inner,
            arrow_schema,
            schema,
            metadata,
            buffered_rows: Vec::new(),
            buffered_extra: HashMap::new(),
            metadata_appended: false,
        })
    }

    /// Write a single row's properties. `extra` supplies any column whose
    /// value was produced outside the property map (encoded geometry
    /// bytes, bbox struct arrays); these are appended column-wise once the
    /// buffer flushes.
    pub fn write_row(&mut self, properties: PropertyMap) -> Result<()> {
        self.buffered_rows.push(properties);
        if self.buffered_rows.len() >= DEFAULT_BATCH_SIZE {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Register a pre-built column (e.g. the primary geometry column's WKB
    /// bytes for the row just buffered) under `name`, one array per
    /// already-flushed batch boundary. Callers append exactly one array
    /// per `write_row` call via [`RecordWriter::push_extra_column`]; this
    /// method exists to make that contract explicit at the call site.
    pub fn push_extra_column(&mut self, name: &str, value: ArrayRef) {
        self.buffered_extra.entry(name.to_string()).or_default().push(value);
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if self.buffered_rows.is_empty() {
            return Ok(());
        }
        let rows = std::mem::take(&mut self.buffered_rows);
        let extra = crate::arrow_bridge::concat_extra_columns(&mut self.buffered_extra)?;
        let batch = crate::arrow_bridge::build_record_batch(
            self.arrow_schema.clone(),
            &self.schema,
            &rows,
            &extra,
        )?;
        self.inner.write(&batch)?;
        Ok(())
    }

    /// Write an already-built `RecordBatch` directly (used by the
    /// normalization and extract paths, which already hold batches).
    pub fn write_batch(&mut self, batch: &RecordBatch) -> Result<()> {
        self.flush_buffer()?;
        self.inner.write(batch)?;
        Ok(())
    }

    /// Append the serialized `geo` metadata to the file's key-value
    /// metadata. Idempotent: a second call is a no-op. `close` calls this
    /// automatically if it was not already called explicitly.
    pub fn finalize_metadata(&mut self) -> Result<()> {
        if self.metadata_appended {
            return Ok(());
        }
        let kv = self.metadata.to_key_value()?;
        self.inner.append_key_value_metadata(kv);
        self.metadata_appended = true;
        Ok(())
    }

    pub fn close(mut self) -> Result<W> {
        self.flush_buffer()?;
        self.finalize_metadata()?;
        let file_writer = self.inner.into_inner()?;
        Ok(file_writer)
    }

    pub fn arrow_schema(&self) -> &ArrowSchema {
        &self.arrow_schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use crate::schema::SchemaBuilder;

    #[test]
    fn writer_options_default_uses_zstd() {
        let opts = WriterOptions::default();
        assert!(matches!(opts.compression, Compression::ZSTD(_)));
    }

    #[test]
    fn reader_options_default_batch_size() {
        let opts = ReaderOptions::new();
        assert_eq!(opts.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn metadata_finalize_is_idempotent() {
        let mut builder = SchemaBuilder::new();
        builder.add_geometry("geometry", "WKB").unwrap();
        let schema = builder.build();
        let meta = Metadata::default_for_primary("geometry");
        let mut writer =
            RecordWriter::try_new(Vec::new(), schema, meta, WriterOptions::default()).unwrap();
        writer.finalize_metadata().unwrap();
        writer.finalize_metadata().unwrap(); // no panic, no duplicate append
        let _ = writer.close().unwrap();
    }
}
