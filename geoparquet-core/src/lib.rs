//! A toolkit for reading, writing, validating and converting GeoParquet
//! files: Parquet with a `geo` JSON metadata key describing one or more
//! geometry columns (encoding, CRS, bounding box, and an optional covering
//! bbox column for spatial predicate pushdown).
//!
//! ## Layout
//!
//! * [`geometry`] / [`wkb`] / [`wkt`] / [`codec`] -- the in-memory geometry
//!   model and its WKB/WKT encodings.
//! * [`bbox`] -- 2D bounding box arithmetic, antimeridian-aware.
//! * [`metadata`] -- the `geo` file metadata document.
//! * [`schema`] -- streaming Arrow schema inference from GeoJSON properties.
//! * [`feature`] / [`property`] / [`geojson_stream`] -- the feature model and
//!   a tolerant, duplicate-key-rejecting GeoJSON reader/writer.
//! * [`record`] -- columnar Parquet batch reading and writing.
//! * [`convert`] -- GeoJSON <-> GeoParquet conversion.
//! * [`extract`] -- projection and bbox-predicate extraction, with row-group
//!   statistics pushdown.
//! * [`validator`] -- the file-and-row rule engine behind `geoparquet
//!   validate`.
//! * [`describe`] -- physical schema and `geo` metadata summaries.
//! * [`stats`] -- concurrency-aware per-column geometry bounds/type
//!   accumulation, available to writers that buffer rows from more than one
//!   thread.
//! * [`cancel`] -- a cooperative cancellation token threaded through readers.

mod arrow_bridge;
pub mod bbox;
pub mod cancel;
pub mod codec;
pub mod convert;
pub mod describe;
pub mod error;
pub mod extract;
pub mod feature;
pub mod geojson_stream;
pub mod geometry;
pub mod metadata;
pub mod property;
pub mod record;
pub mod schema;
pub mod stats;
pub mod validator;
pub mod wkb;
pub mod wkt;

pub use error::{Error, Result};
