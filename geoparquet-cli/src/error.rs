//! CLI-level error type. Library errors ([`geoparquet_core::Error`]) are
//! wrapped verbatim; this enum adds only the failure modes that belong to
//! the command surface itself (argument parsing, I/O driving, HTTP range
//! reads) per §7's error table.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] geoparquet_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Http(String),

    #[error("`{0}` is not a recognized format; pass --from/--to explicitly")]
    UnknownExtension(String),

    #[error("unsupported compression `{0}`")]
    InvalidCompression(String),

    #[error("{0}")]
    Usage(String),
}

pub type CliResult<T> = std::result::Result<T, CliError>;

impl CliError {
    /// Every command error maps to exit code 1 (§6.3); `validate` additionally
    /// maps a failed (but error-free) report to 1 from `main`, not from here.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
