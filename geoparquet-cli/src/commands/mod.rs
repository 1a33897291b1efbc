//! One module per subcommand (§6.2), each a thin translation from parsed
//! `clap` arguments to a `geoparquet-core` call plus output formatting --
//! mirroring how `geozero`'s own CLI `main.rs` keeps `transform`/`process`
//! as small free functions rather than a framework of command objects.

pub mod convert;
pub mod describe;
pub mod extract;
pub mod validate;
pub mod version;

use crate::error::{CliError, CliResult};
use parquet::basic::{BrotliLevel, Compression, GzipLevel, ZstdLevel};

/// Parse `--compression` (§6.2): `uncompressed|snappy|gzip|brotli|zstd`.
pub fn parse_compression(s: &str) -> CliResult<Compression> {
    match s.to_ascii_lowercase().as_str() {
        "uncompressed" => Ok(Compression::UNCOMPRESSED),
        "snappy" => Ok(Compression::SNAPPY),
        "gzip" => Ok(Compression::GZIP(GzipLevel::default())),
        "brotli" => Ok(Compression::BROTLI(BrotliLevel::default())),
        "zstd" => Ok(Compression::ZSTD(ZstdLevel::default())),
        other => Err(CliError::InvalidCompression(other.to_string())),
    }
}
