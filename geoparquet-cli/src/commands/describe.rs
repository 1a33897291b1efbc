//! `geoparquet describe` (§6.2): physical schema + `geo` metadata summary,
//! as indented text or JSON.

use crate::driver::Source;
use crate::error::CliResult;
use geoparquet_core::describe::{describe, Describe, DescribeOptions, FieldInfo};
use std::io::Write;

pub struct DescribeArgs {
    pub input: Option<String>,
    pub format: String,
    pub metadata_only: bool,
    pub unpretty: bool,
}

pub fn run(args: DescribeArgs) -> CliResult<()> {
    let source = Source::from_arg(args.input.as_deref());
    let bytes = source.read_to_bytes()?;
    let opts = DescribeOptions { metadata_only: args.metadata_only };
    let info = describe(bytes, opts)?;

    let mut stdout = std::io::stdout();
    if args.format == "json" {
        if args.unpretty {
            writeln!(stdout, "{}", serde_json::to_string(&info)?)?;
        } else {
            writeln!(stdout, "{}", serde_json::to_string_pretty(&info)?)?;
        }
    } else {
        print_text(&mut stdout, &info)?;
    }
    Ok(())
}

fn print_text(out: &mut impl Write, info: &Describe) -> CliResult<()> {
    writeln!(out, "rows: {}  row groups: {}", info.num_rows, info.num_row_groups)?;
    if let Some(schema) = &info.schema {
        writeln!(out, "schema:")?;
        print_field(out, schema, 1)?;
    }
    writeln!(out, "geo:")?;
    if !info.geo.issues.is_empty() {
        for issue in &info.geo.issues {
            writeln!(out, "  issue: {issue}")?;
        }
    }
    if let Some(meta) = &info.geo.metadata {
        let json = serde_json::to_string_pretty(meta)?;
        for line in json.lines() {
            writeln!(out, "  {line}")?;
        }
    }
    Ok(())
}

fn print_field(out: &mut impl Write, field: &FieldInfo, depth: usize) -> CliResult<()> {
    let indent = "  ".repeat(depth);
    let mut line = format!("{indent}{} ({})", field.name, field.type_);
    if field.optional {
        line.push_str(" optional");
    }
    if field.repeated {
        line.push_str(" repeated");
    }
    if let Some(annotation) = &field.annotation {
        line.push_str(&format!(" {annotation}"));
    }
    if let Some(compression) = &field.compression {
        line.push_str(&format!(" [{compression}]"));
    }
    writeln!(out, "{line}")?;
    if let Some(children) = &field.fields {
        for child in children {
            print_field(out, child, depth + 1)?;
        }
    }
    Ok(())
}
