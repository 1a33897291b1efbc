//! Error and Result types.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // --- bbox / CLI argument parsing (C2) ---
    #[error("invalid bbox: please provide 4 comma separated numbers, got {0}")]
    BadBboxCount(usize),
    #[error("invalid bbox: could not parse `{0}` as a float")]
    BadBboxFloat(String),

    // --- geo metadata (C3) ---
    #[error("file does not have \"geo\" metadata")]
    NoMetadata,
    #[error("file has more than one \"geo\" metadata entry")]
    DuplicateMetadata,
    #[error("could not parse \"geo\" metadata as JSON: {0}")]
    BadJson(#[from] serde_json::Error),
    #[error("\"geo\" metadata column `{0}` is missing from the Parquet schema")]
    UnknownColumn(String),
    #[error("\"geo\" metadata primary_column `{0}` is not present in columns")]
    MissingPrimaryColumn(String),
    #[error("covering column `{0}` is not a struct with four numeric fields")]
    BadCoveringColumn(String),

    // --- geometry codec (C1) ---
    #[error("unsupported geometry encoding `{0}`")]
    InvalidEncoding(String),
    #[error("could not decode geometry: {0}")]
    BadGeometry(String),

    // --- schema builder (C4) ---
    #[error("unsupported encoding `{0}` for geometry column")]
    UnsupportedEncoding(String),
    #[error("property `{0}` has mixed scalar types: already `{1}`, saw `{2}`")]
    MixedScalarTypes(String, &'static str, &'static str),
    #[error("property `{0}` has mixed element types in an array: already `{1}`, saw `{2}`")]
    MixedElementTypes(String, &'static str, &'static str),

    // --- feature stream (C5) ---
    #[error("malformed GeoJSON: {0}")]
    MalformedGeoJson(String),

    // --- converter (C7) ---
    #[error("schema not ready after {0} features (max {1}); provide more features or raise --max")]
    SchemaNotReady(usize, usize),
    #[error("could not determine the primary geometry column; pass --input-primary-column")]
    MissingGeometryColumn,

    // --- extract (C8) ---
    #[error("cannot use both --drop-cols and --keep-only-cols")]
    AmbiguousColumnSelection,
    #[error("row group is missing min/max statistics for bbox column `{0}`")]
    NoStatistics(String),
    #[error("bbox struct column `{0}` is missing expected field `{1}`")]
    BadBboxStruct(String, String),
    #[error("unknown column `{0}`")]
    UnknownProjectionColumn(String),

    // --- cancellation ---
    #[error("operation was cancelled")]
    Cancelled,

    // --- general / propagated ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
