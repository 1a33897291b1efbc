mod commands;
mod driver;
mod error;

use clap::{Parser, Subcommand};
use commands::{convert, describe, extract, validate, version};
use driver::parse_format_arg;
use error::CliResult;
use std::process::ExitCode;

/// A toolkit for reading, writing, validating and extracting from
/// GeoParquet files.
#[derive(Parser)]
#[command(name = "geoparquet", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert between GeoJSON and GeoParquet
    Convert {
        /// Input file or URL; omit to read stdin
        input: Option<String>,
        /// Output file; omit to write stdout
        output: Option<String>,
        /// auto|geojson|geoparquet
        #[arg(long, default_value = "auto")]
        from: String,
        /// auto|geojson|geoparquet
        #[arg(long, default_value = "auto")]
        to: String,
        #[arg(long, default_value_t = 10)]
        min: usize,
        #[arg(long, default_value_t = 100)]
        max: usize,
        #[arg(long)]
        input_primary_column: Option<String>,
        #[arg(long, default_value = "zstd")]
        compression: String,
        #[arg(long)]
        row_group_length: Option<usize>,
    },
    /// Check a file against the GeoParquet metadata and geometry rules
    Validate {
        input: Option<String>,
        #[arg(long)]
        metadata_only: bool,
        /// text|json
        #[arg(long, default_value = "text")]
        format: String,
        #[arg(long)]
        unpretty: bool,
    },
    /// Summarize a file's physical schema and `geo` metadata
    Describe {
        input: Option<String>,
        /// text|json
        #[arg(long, default_value = "text")]
        format: String,
        #[arg(long)]
        metadata_only: bool,
        #[arg(long)]
        unpretty: bool,
    },
    /// Subset a GeoParquet file by columns and/or a bounding box
    Extract {
        input: Option<String>,
        output: Option<String>,
        #[arg(long)]
        bbox: Option<String>,
        #[arg(long)]
        drop_cols: Option<String>,
        #[arg(long)]
        keep_only_cols: Option<String>,
    },
    /// Print the toolkit's version
    Version,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match dispatch(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("geoparquet: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Returns `Ok(false)` only for a `validate` run whose report failed, so
/// `main` can map that to exit code 1 without treating it as an error to
/// print (§6.3).
fn dispatch(command: Command) -> CliResult<bool> {
    match command {
        Command::Convert {
            input,
            output,
            from,
            to,
            min,
            max,
            input_primary_column,
            compression,
            row_group_length,
        } => {
            convert::run(convert::ConvertArgs {
                input,
                output,
                from: parse_format_arg(&from)?,
                to: parse_format_arg(&to)?,
                min,
                max,
                input_primary_column,
                compression,
                row_group_length,
            })?;
            Ok(true)
        }
        Command::Validate { input, metadata_only, format, unpretty } => {
            let passed = validate::run(validate::ValidateArgs {
                input,
                metadata_only,
                format,
                unpretty,
            })?;
            Ok(passed)
        }
        Command::Describe { input, format, metadata_only, unpretty } => {
            describe::run(describe::DescribeArgs { input, format, metadata_only, unpretty })?;
            Ok(true)
        }
        Command::Extract { input, output, bbox, drop_cols, keep_only_cols } => {
            extract::run(extract::ExtractArgs { input, output, bbox, drop_cols, keep_only_cols })?;
            Ok(true)
        }
        Command::Version => {
            version::run();
            Ok(true)
        }
    }
}
