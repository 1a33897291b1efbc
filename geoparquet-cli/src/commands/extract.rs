//! `geoparquet extract` (§6.2): projection and bbox-predicate pushdown.

use crate::driver::{Sink, Source};
use crate::error::CliResult;
use geoparquet_core::bbox::parse_bbox;
use geoparquet_core::extract::{extract, ExtractOptions};

pub struct ExtractArgs {
    pub input: Option<String>,
    pub output: Option<String>,
    pub bbox: Option<String>,
    pub drop_cols: Option<String>,
    pub keep_only_cols: Option<String>,
}

pub fn run(args: ExtractArgs) -> CliResult<()> {
    let source = Source::from_arg(args.input.as_deref());
    let sink = Sink::from_arg(args.output.as_deref());

    let bbox = args.bbox.as_deref().map(parse_bbox).transpose()?;
    let drop_cols = args.drop_cols.as_deref().map(split_cols);
    let keep_only_cols = args.keep_only_cols.as_deref().map(split_cols);

    let bytes = source.read_to_bytes()?;
    let opts = ExtractOptions { bbox, drop_cols, keep_only_cols };
    let stats = extract(bytes, sink.create()?, opts)?;
    log::info!("wrote {} rows", stats.rows_written);
    Ok(())
}

fn split_cols(s: &str) -> Vec<String> {
    s.split(',').map(|c| c.trim().to_string()).collect()
}
