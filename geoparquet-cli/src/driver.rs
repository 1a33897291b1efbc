//! Datasource driving (§6.2): resolving a CLI `<input?>`/`<output?>`
//! argument into bytes, and format auto-detection by suffix.
//!
//! Translates a bare path/URL argument into something the processing
//! pipeline can consume. `flatgeobuf::{Reader, HttpReader}` wired up a
//! similar indirection over its own datasource; here the underlying format
//! is GeoParquet/GeoJSON and the remote collaborator is a plain HTTP Range
//! server, so the trait surface is narrowed to exactly what
//! `geoparquet-core`'s converters need: an owned byte buffer for Parquet's
//! random-access `ChunkReader`, or a streaming `Read` for GeoJSON.

use crate::error::{CliError, CliResult};
use bytes::Bytes;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

/// One of the two formats this toolkit moves data between (§6.2). `Parquet`
/// covers both `--from geoparquet` and `--from parquet`: a plain Parquet
/// file without `geo` metadata is handled by the normalization path
/// (§4.7.2), not a separate format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataFormat {
    GeoJson,
    Parquet,
}

/// Detect a format from a file suffix: `.json`/`.geojson` or
/// `.parquet`/`.pq`/`.gpq`/`.geoparquet` (§6.2).
pub fn detect_format(path_or_url: &str) -> Option<DataFormat> {
    let name = path_or_url.rsplit(['/', '\\']).next().unwrap_or(path_or_url);
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase())?;
    match ext.as_str() {
        "json" | "geojson" => Some(DataFormat::GeoJson),
        "parquet" | "pq" | "gpq" | "geoparquet" => Some(DataFormat::Parquet),
        _ => None,
    }
}

/// The CLI's `<input?>` argument, resolved: a file path, a URL, or stdin
/// (when no argument is given).
pub enum Source {
    Stdin,
    File(PathBuf),
    Url(String),
}

impl Source {
    pub fn from_arg(arg: Option<&str>) -> Source {
        match arg {
            None => Source::Stdin,
            Some(s) if s.starts_with("http://") || s.starts_with("https://") => {
                Source::Url(s.to_string())
            }
            Some(s) => Source::File(PathBuf::from(s)),
        }
    }

    /// The raw string used for suffix-based format sniffing; `None` for
    /// stdin, which has no name to sniff.
    pub fn suffix_source(&self) -> Option<&str> {
        match self {
            Source::Stdin => None,
            Source::File(p) => p.to_str(),
            Source::Url(u) => Some(u.as_str()),
        }
    }

    /// A streaming reader, for the GeoJSON side (no random access needed).
    pub fn open_read(&self) -> CliResult<Box<dyn Read>> {
        match self {
            Source::Stdin => Ok(Box::new(io::stdin())),
            Source::File(path) => Ok(Box::new(io::BufReader::new(File::open(path)?))),
            Source::Url(url) => {
                let resp = reqwest::blocking::get(url).map_err(|e| CliError::Http(e.to_string()))?;
                if !resp.status().is_success() {
                    return Err(CliError::Http(format!("GET {url} returned {}", resp.status())));
                }
                Ok(Box::new(resp))
            }
        }
    }

    /// The full content as an owned, randomly addressable byte buffer, for
    /// the Parquet side (`bytes::Bytes` implements `parquet`'s `ChunkReader`
    /// directly). File and stdin reads load the whole file; a URL is read
    /// through [`HttpRangeSource`]'s probe-then-range protocol.
    pub fn read_to_bytes(&self) -> CliResult<Bytes> {
        match self {
            Source::Stdin => {
                let mut buf = Vec::new();
                io::stdin().read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            }
            Source::File(path) => Ok(Bytes::from(std::fs::read(path)?)),
            Source::Url(url) => HttpRangeSource::open(url)?.read_all(),
        }
    }
}

/// The CLI's `<output?>` argument: a file path, or stdout when absent.
pub enum Sink {
    Stdout,
    File(PathBuf),
}

impl Sink {
    pub fn from_arg(arg: Option<&str>) -> Sink {
        match arg {
            None => Sink::Stdout,
            Some(s) => Sink::File(PathBuf::from(s)),
        }
    }

    pub fn suffix_source(&self) -> Option<&str> {
        match self {
            Sink::Stdout => None,
            Sink::File(p) => p.to_str(),
        }
    }

    pub fn create(&self) -> CliResult<Box<dyn Write + Send>> {
        match self {
            Sink::Stdout => Ok(Box::new(io::stdout())),
            Sink::File(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
        }
    }
}

/// Minimum size of a ranged read beyond the initial probe (§6.2).
const MIN_RANGE_READ: u64 = 1024;
/// Initial probe size used only to discover the resource's total length via
/// `Content-Range`.
const PROBE_SIZE: u64 = 512;

/// An HTTP(S) blob reader driven entirely by Range requests (§6.2): learns
/// the resource's total length from an initial 512-byte probe's
/// `Content-Range` response header, then issues subsequent reads of at
/// least 1024 bytes, validated against the probe's `ETag`/`Last-Modified`
/// via `If-Range` so a resource that changed mid-read is caught rather than
/// silently stitched together from two versions.
pub struct HttpRangeSource {
    client: reqwest::blocking::Client,
    url: String,
    len: u64,
    validator: Option<(reqwest::header::HeaderName, String)>,
}

impl HttpRangeSource {
    pub fn open(url: &str) -> CliResult<HttpRangeSource> {
        let client = reqwest::blocking::Client::new();
        let probe_end = PROBE_SIZE - 1;
        let resp = client
            .get(url)
            .header(reqwest::header::RANGE, format!("bytes=0-{probe_end}"))
            .send()
            .map_err(|e| CliError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(CliError::Http(format!(
                "probing {url} returned {}",
                resp.status()
            )));
        }
        let validator = resp
            .headers()
            .get(reqwest::header::ETAG)
            .map(|v| (reqwest::header::IF_RANGE, v.to_str().unwrap_or_default().to_string()))
            .or_else(|| {
                resp.headers().get(reqwest::header::LAST_MODIFIED).map(|v| {
                    (reqwest::header::IF_RANGE, v.to_str().unwrap_or_default().to_string())
                })
            });
        let len = content_range_total(&resp).ok_or_else(|| {
            CliError::Http(format!("{url} did not return Content-Range for a ranged probe"))
        })?;
        Ok(HttpRangeSource { client, url: url.to_string(), len, validator })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    fn read_range(&self, start: u64, length: u64) -> CliResult<Bytes> {
        let remaining = self.len.saturating_sub(start);
        let length = length.max(MIN_RANGE_READ).min(remaining);
        if length == 0 {
            return Ok(Bytes::new());
        }
        let end = start + length - 1;
        let mut req = self
            .client
            .get(&self.url)
            .header(reqwest::header::RANGE, format!("bytes={start}-{end}"));
        if let Some((name, value)) = &self.validator {
            req = req.header(name.clone(), value.clone());
        }
        let resp = req.send().map_err(|e| CliError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(CliError::Http(format!(
                "ranged GET {url} bytes={start}-{end} returned {status}",
                url = self.url,
                status = resp.status()
            )));
        }
        resp.bytes().map_err(|e| CliError::Http(e.to_string()))
    }

    /// Drain the whole resource by repeated range reads, each at least
    /// [`MIN_RANGE_READ`] bytes, assembled in order.
    pub fn read_all(&self) -> CliResult<Bytes> {
        const CHUNK: u64 = 1 << 20;
        let mut buf = Vec::with_capacity(self.len as usize);
        let mut pos = 0u64;
        while pos < self.len {
            let chunk = self.read_range(pos, CHUNK)?;
            if chunk.is_empty() {
                break;
            }
            pos += chunk.len() as u64;
            buf.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buf))
    }
}

fn content_range_total(resp: &reqwest::blocking::Response) -> Option<u64> {
    let value = resp.headers().get(reqwest::header::CONTENT_RANGE)?.to_str().ok()?;
    value.rsplit('/').next()?.parse().ok()
}

/// Parse `--from`/`--to`'s value: `auto`, `geojson`, `geoparquet`, or (for
/// `--from` only) `parquet` as a synonym for `geoparquet`.
pub fn parse_format_arg(s: &str) -> CliResult<Option<DataFormat>> {
    match s.to_ascii_lowercase().as_str() {
        "auto" => Ok(None),
        "geojson" | "json" => Ok(Some(DataFormat::GeoJson)),
        "geoparquet" | "parquet" | "pq" | "gpq" => Ok(Some(DataFormat::Parquet)),
        other => Err(CliError::UnknownExtension(other.to_string())),
    }
}

/// Resolve an explicit or `auto` format flag against a source/sink's suffix.
/// `label` names the flag in the error message (`"--from"`/`"--to"`).
pub fn resolve_auto(
    explicit: Option<DataFormat>,
    suffix_source: Option<&str>,
    label: &'static str,
) -> CliResult<DataFormat> {
    if let Some(fmt) = explicit {
        return Ok(fmt);
    }
    match suffix_source {
        Some(name) => detect_format(name)
            .ok_or_else(|| CliError::UnknownExtension(name.to_string())),
        None => Err(CliError::Usage(format!(
            "stdin/stdout in use; pass an explicit {label}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_geojson_by_suffix() {
        assert_eq!(detect_format("countries.geojson"), Some(DataFormat::GeoJson));
        assert_eq!(detect_format("countries.json"), Some(DataFormat::GeoJson));
    }

    #[test]
    fn detects_geoparquet_by_suffix() {
        for name in ["a.parquet", "a.pq", "a.gpq", "a.geoparquet"] {
            assert_eq!(detect_format(name), Some(DataFormat::Parquet));
        }
    }

    #[test]
    fn unknown_suffix_is_none() {
        assert_eq!(detect_format("a.txt"), None);
    }

    #[test]
    fn resolve_auto_requires_explicit_format_for_stdin() {
        let err = resolve_auto(None, None, "--from").unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn resolve_auto_prefers_explicit_over_suffix() {
        let fmt = resolve_auto(Some(DataFormat::GeoJson), Some("a.parquet"), "--from").unwrap();
        assert_eq!(fmt, DataFormat::GeoJson);
    }

    #[test]
    fn parse_format_arg_accepts_synonyms() {
        assert_eq!(parse_format_arg("auto").unwrap(), None);
        assert_eq!(parse_format_arg("GeoJSON").unwrap(), Some(DataFormat::GeoJson));
        assert_eq!(parse_format_arg("parquet").unwrap(), Some(DataFormat::Parquet));
        assert!(parse_format_arg("shapefile").is_err());
    }
}
